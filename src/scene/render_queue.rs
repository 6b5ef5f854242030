//! Draw ordering for the geometry pass.

use bevy_ecs::entity::Entity;

use super::material::{MaterialId, ShaderId, ShaderMaterial};

/// Geometry-pass sort key: render layer, then shader, then material.
///
/// Ids come from [`MaterialRegistry`](super::material::MaterialRegistry) in
/// creation order, so ties between equal layers are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderKey {
    /// Lower layers draw first.
    pub layer: i32,
    /// Groups draws that share a pipeline.
    pub shader: ShaderId,
    /// Groups draws that share a material bind group.
    pub material: MaterialId,
}

impl RenderKey {
    /// Key of a material.
    #[must_use]
    pub fn of(material: &ShaderMaterial) -> Self {
        Self {
            layer: material.render_layer(),
            shader: material.shader().id,
            material: material.id(),
        }
    }
}

/// Stable sort by key; entities with equal keys keep their incoming order.
pub fn sort_render_queue(items: &mut [(RenderKey, Entity)]) {
    items.sort_by_key(|(key, _)| *key);
}

#[cfg(test)]
mod tests {
    use bevy_ecs::world::World;

    use super::*;
    use crate::scene::material::{GeometryShading, MaterialRegistry};

    #[test]
    fn layers_then_shaders_stay_grouped() {
        let mut world = World::new();
        let mut registry = MaterialRegistry::new();
        let textured = registry.register_shader(GeometryShading::Textured);
        let colored = registry.register_shader(GeometryShading::VertexColor);
        let m0 = registry.allocate_material_id();
        let m1 = registry.allocate_material_id();
        let m2 = registry.allocate_material_id();

        let key = |layer, shader, material| RenderKey {
            layer,
            shader,
            material,
        };
        let e: Vec<Entity> = (0..4).map(|_| world.spawn_empty().id()).collect();
        let mut queue = vec![
            (key(100, textured.id, m0), e[0]),
            (key(0, colored.id, m1), e[1]),
            (key(0, textured.id, m2), e[2]),
            (key(0, colored.id, m1), e[3]),
        ];
        sort_render_queue(&mut queue);

        let order: Vec<Entity> = queue.iter().map(|(_, e)| *e).collect();
        assert_eq!(order, [e[2], e[1], e[3], e[0]]);
        assert_eq!(queue.last().map(|(k, _)| k.layer), Some(100));
    }

    fn permutations(n: usize) -> Vec<Vec<usize>> {
        if n == 0 {
            return vec![Vec::new()];
        }
        let mut out = Vec::new();
        for rest in permutations(n - 1) {
            for at in 0..=rest.len() {
                let mut p = rest.clone();
                p.insert(at, n - 1);
                out.push(p);
            }
        }
        out
    }

    #[test]
    fn grouping_holds_for_every_insertion_order() {
        let mut world = World::new();
        let mut registry = MaterialRegistry::new();
        let textured = registry.register_shader(GeometryShading::Textured);
        let colored = registry.register_shader(GeometryShading::VertexColor);
        let m0 = registry.allocate_material_id();
        let m1 = registry.allocate_material_id();
        let m2 = registry.allocate_material_id();

        let e: Vec<Entity> = (0..4).map(|_| world.spawn_empty().id()).collect();
        let items = [
            (RenderKey { layer: 100, shader: textured.id, material: m0 }, e[0]),
            (RenderKey { layer: 0, shader: colored.id, material: m1 }, e[1]),
            (RenderKey { layer: 0, shader: textured.id, material: m2 }, e[2]),
            (RenderKey { layer: 0, shader: colored.id, material: m1 }, e[3]),
        ];

        let orders = permutations(items.len());
        assert_eq!(orders.len(), 24);
        for order in orders {
            let mut queue: Vec<_> = order.iter().map(|&i| items[i]).collect();
            sort_render_queue(&mut queue);

            assert_eq!(queue[3].1, e[0], "layer 100 not last for {order:?}");
            assert_eq!(queue[0].1, e[2], "textured group not first for {order:?}");
            // Equal keys keep their incoming relative order.
            let colored_in: Vec<Entity> = order
                .iter()
                .map(|&i| items[i].1)
                .filter(|&ent| ent == e[1] || ent == e[3])
                .collect();
            assert_eq!([queue[1].1, queue[2].1], colored_in[..], "{order:?}");
        }
    }
}
