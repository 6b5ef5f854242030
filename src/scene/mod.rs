//! Entity storage: a `bevy_ecs` world holding transforms, the camera,
//! renderables and behaviours, plus selection cycling over the movable
//! entities.

pub mod behaviour;
pub mod material;
pub mod render_queue;
pub mod renderable;
pub mod transform;

use bevy_ecs::bundle::Bundle;
use bevy_ecs::component::Component;
use bevy_ecs::entity::Entity;
use bevy_ecs::world::{Mut, World};
use glam::Vec3;

pub use behaviour::{FollowPath, PingPong, SimpleMove};
pub use material::{
    GeometryShading, MaterialDesc, MaterialId, MaterialRegistry, ShaderHandle,
    ShaderId, ShaderMaterial,
};
pub use render_queue::{sort_render_queue, RenderKey};
pub use renderable::RendererComponent;
pub use transform::Transform;

use crate::camera::Camera;

/// Name and creation-order id of an entity.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Display name.
    pub name: String,
    /// Monotonic creation index; orders entities deterministically.
    pub id: u64,
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// The scene world and the entity currently driven by keyboard input.
pub struct Scene {
    world: World,
    camera: Entity,
    next_id: u64,
    selected: Option<Entity>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene with a default camera entity.
    #[must_use]
    pub fn new() -> Self {
        let mut world = World::new();
        let camera = world
            .spawn((
                Tag {
                    name: "Camera".to_owned(),
                    id: 0,
                },
                Transform::default(),
                Camera::default(),
            ))
            .id();
        Self {
            world,
            camera,
            next_id: 1,
            selected: None,
        }
    }

    /// Spawn an entity with a [`Tag`] and an identity [`Transform`].
    pub fn create_entity(&mut self, name: &str) -> Entity {
        let id = self.next_id;
        self.next_id += 1;
        self.world
            .spawn((
                Tag {
                    name: name.to_owned(),
                    id,
                },
                Transform::default(),
            ))
            .id()
    }

    /// Add components to an existing entity. Returns `false` if it no
    /// longer exists.
    pub fn insert<B: Bundle>(&mut self, entity: Entity, bundle: B) -> bool {
        match self.world.get_entity_mut(entity) {
            Ok(mut e) => {
                let _ = e.insert(bundle);
                true
            }
            Err(_) => false,
        }
    }

    /// The underlying world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the underlying world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    // -- Camera --

    /// The camera entity.
    pub fn camera_entity(&self) -> Entity {
        self.camera
    }

    /// The active camera.
    pub fn camera(&self) -> Option<&Camera> {
        self.world.get::<Camera>(self.camera)
    }

    /// Mutable active camera.
    pub fn camera_mut(&mut self) -> Option<Mut<'_, Camera>> {
        self.world.get_mut::<Camera>(self.camera)
    }

    // -- Lookup --

    /// Tag of `entity`.
    pub fn tag(&self, entity: Entity) -> Option<&Tag> {
        self.world.get::<Tag>(entity)
    }

    /// Transform of `entity`.
    pub fn transform(&self, entity: Entity) -> Option<&Transform> {
        self.world.get::<Transform>(entity)
    }

    /// Mutable transform of `entity`.
    pub fn transform_mut(&mut self, entity: Entity) -> Option<Mut<'_, Transform>> {
        self.world.get_mut::<Transform>(entity)
    }

    /// First entity (in creation order) named `name`.
    pub fn find_by_name(&mut self, name: &str) -> Option<Entity> {
        let mut query = self.world.query::<(Entity, &Tag)>();
        query
            .iter(&self.world)
            .filter(|(_, tag)| tag.name == name)
            .min_by_key(|(_, tag)| tag.id)
            .map(|(e, _)| e)
    }

    // -- Per-frame update --

    /// Advance behaviours by `dt`, move the selected entity by
    /// `move_input`, then rebuild every world matrix.
    pub fn update_transforms(&mut self, dt: f32, move_input: Vec3) {
        let mut paths = self.world.query::<(&mut FollowPath, &mut Transform)>();
        for (mut path, mut transform) in paths.iter_mut(&mut self.world) {
            if let Some(position) = path.advance(dt) {
                transform.position = position;
            }
        }

        let mut ping_pongs = self.world.query::<(&mut PingPong, &mut Transform)>();
        for (mut pp, mut transform) in ping_pongs.iter_mut(&mut self.world) {
            transform.position = pp.advance(dt);
        }

        let mut movers = self.world.query::<(&SimpleMove, &mut Transform)>();
        for (mover, mut transform) in movers.iter_mut(&mut self.world) {
            let delta = mover.displacement(move_input, transform.rotation, dt);
            transform.position += delta;
        }

        let mut transforms = self.world.query::<&mut Transform>();
        for mut transform in transforms.iter_mut(&mut self.world) {
            transform.update_world_matrix();
        }
    }

    /// Renderable entities in geometry-pass order: (layer, shader id,
    /// material id), ties broken by creation order.
    pub fn render_queue(&mut self) -> Vec<Entity> {
        let mut query = self.world.query::<(Entity, &Tag, &RendererComponent)>();
        let mut by_creation: Vec<(u64, RenderKey, Entity)> = query
            .iter(&self.world)
            .map(|(e, tag, r)| (tag.id, r.render_key(), e))
            .collect();
        by_creation.sort_by_key(|(id, _, _)| *id);

        let mut items: Vec<(RenderKey, Entity)> =
            by_creation.into_iter().map(|(_, k, e)| (k, e)).collect();
        sort_render_queue(&mut items);
        items.into_iter().map(|(_, e)| e).collect()
    }

    // -- Selection --

    /// Entities with a [`SimpleMove`], in creation order.
    pub fn controllables(&mut self) -> Vec<Entity> {
        let mut query = self.world.query::<(Entity, &Tag, &SimpleMove)>();
        let mut items: Vec<(u64, Entity)> = query
            .iter(&self.world)
            .map(|(e, tag, _)| (tag.id, e))
            .collect();
        items.sort_by_key(|(id, _)| *id);
        items.into_iter().map(|(_, e)| e).collect()
    }

    /// The entity currently driven by input.
    pub fn selected(&self) -> Option<Entity> {
        self.selected
    }

    /// Select the first controllable if nothing is selected yet.
    pub fn select_first(&mut self) -> Option<Entity> {
        if self.selected.is_none() {
            let first = self.controllables().first().copied();
            self.select(first);
        }
        self.selected
    }

    /// Move the selection forward or backward through the controllables,
    /// wrapping at either end. Only the selected entity stays enabled.
    pub fn cycle_selection(&mut self, forward: bool) -> Option<Entity> {
        let controllables = self.controllables();
        if controllables.is_empty() {
            self.select(None);
            return None;
        }
        let n = controllables.len();
        let current = self
            .selected
            .and_then(|s| controllables.iter().position(|&e| e == s));
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % n,
            (Some(i), false) => (i + n - 1) % n,
        };
        self.select(Some(controllables[next]));
        if let Some(tag) = self.selected.and_then(|e| self.tag(e)) {
            log::info!("selected '{}'", tag.name);
        }
        self.selected
    }

    fn select(&mut self, entity: Option<Entity>) {
        if let Some(old) = self.selected {
            if let Some(mut mover) = self.world.get_mut::<SimpleMove>(old) {
                mover.enabled = false;
            }
        }
        self.selected = entity;
        if let Some(new) = entity {
            if let Some(mut mover) = self.world.get_mut::<SimpleMove>(new) {
                mover.enabled = true;
            }
        }
    }

    /// Flip relative movement on the selected entity. Returns the new
    /// state.
    pub fn toggle_relative(&mut self) -> Option<bool> {
        let selected = self.selected?;
        let mut mover = self.world.get_mut::<SimpleMove>(selected)?;
        mover.relative = !mover.relative;
        Some(mover.relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entities_get_increasing_ids() {
        let mut scene = Scene::new();
        let a = scene.create_entity("a");
        let b = scene.create_entity("b");
        assert!(scene.tag(a).unwrap().id < scene.tag(b).unwrap().id);
        assert_eq!(scene.find_by_name("b"), Some(b));
        assert_eq!(scene.find_by_name("missing"), None);
        assert!(scene.camera().is_some());
    }

    #[test]
    fn cycle_selection_wraps_and_moves_enabled_flag() {
        let mut scene = Scene::new();
        let a = scene.create_entity("a");
        let _plain = scene.create_entity("plain");
        let b = scene.create_entity("b");
        assert!(scene.insert(a, SimpleMove::default()));
        assert!(scene.insert(b, SimpleMove::default()));

        assert_eq!(scene.select_first(), Some(a));
        assert_eq!(scene.cycle_selection(true), Some(b));
        assert!(!scene.world().get::<SimpleMove>(a).unwrap().enabled);
        assert!(scene.world().get::<SimpleMove>(b).unwrap().enabled);
        assert_eq!(scene.cycle_selection(true), Some(a));
        assert_eq!(scene.cycle_selection(false), Some(b));

        assert_eq!(scene.toggle_relative(), Some(true));
        assert!(scene.world().get::<SimpleMove>(b).unwrap().relative);
    }

    #[test]
    fn update_transforms_runs_behaviours_then_matrices() {
        let mut scene = Scene::new();
        let e = scene.create_entity("mover");
        assert!(scene.insert(e, PingPong::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 1.0)));
        scene.update_transforms(0.5, Vec3::ZERO);

        let t = scene.transform(e).unwrap();
        assert_eq!(t.position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(t.world_matrix().w_axis.truncate(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn selected_entity_follows_input() {
        let mut scene = Scene::new();
        let e = scene.create_entity("player");
        assert!(scene.insert(
            e,
            SimpleMove {
                speed: 1.0,
                ..SimpleMove::default()
            }
        ));
        scene.update_transforms(1.0, Vec3::X);
        assert_eq!(scene.transform(e).unwrap().position, Vec3::ZERO);

        let _ = scene.select_first();
        scene.update_transforms(1.0, Vec3::X);
        assert_eq!(scene.transform(e).unwrap().position, Vec3::X);
    }
}
