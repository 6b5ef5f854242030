//! Procedural meshes and their GPU buffers.

use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

/// Interleaved vertex: position, normal, uv, colour (48 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Object-space normal.
    pub normal: [f32; 3],
    /// Texture coordinate.
    pub uv: [f32; 2],
    /// Vertex colour.
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x4,
    ];

    /// Vertex buffer layout matching `deferred::mesh::VertexInput`.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// CPU-side triangle list under construction. Triangles wind
/// counter-clockwise when seen from the side their normals face.
#[derive(Debug, Clone, Default)]
pub struct MeshBuilder {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Vertices added so far.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Triangle indices added so far.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Append a vertex and return its index.
    pub fn push_vertex(&mut self, vertex: Vertex) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        index
    }

    /// Append a triangle.
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// One quad facing `normal`, centred on `center`. `up` picks the
    /// in-plane orientation.
    pub fn add_quad(
        &mut self,
        center: Vec3,
        normal: Vec3,
        up: Vec3,
        half_size: Vec2,
        color: [f32; 4],
    ) -> &mut Self {
        let v = up * half_size.y;
        let u = up.cross(normal) * half_size.x;
        let corners = [
            (center - u - v, [0.0, 1.0]),
            (center + u - v, [1.0, 1.0]),
            (center + u + v, [1.0, 0.0]),
            (center - u + v, [0.0, 0.0]),
        ];
        let base = self.vertices.len() as u32;
        for (position, uv) in corners {
            let _ = self.push_vertex(Vertex {
                position: position.to_array(),
                normal: normal.to_array(),
                uv,
                color,
            });
        }
        self.push_triangle(base, base + 1, base + 2);
        self.push_triangle(base, base + 2, base + 3);
        self
    }

    /// Axis-aligned box centred on `center`.
    pub fn add_cube(
        &mut self,
        center: Vec3,
        half_extent: Vec3,
        color: [f32; 4],
    ) -> &mut Self {
        let faces = [
            (Vec3::X, Vec3::Y),
            (Vec3::NEG_X, Vec3::Y),
            (Vec3::Y, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::Z),
            (Vec3::Z, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y),
        ];
        for (normal, up) in faces {
            let offset = normal * half_extent;
            let tangent = up.cross(normal).abs();
            let half_size = Vec2::new(
                tangent.dot(half_extent),
                up.abs().dot(half_extent),
            );
            let _ = self.add_quad(center + offset, normal, up, half_size, color);
        }
        self
    }

    /// Horizontal plane (normal +Y) of the given full size.
    pub fn add_plane(
        &mut self,
        center: Vec3,
        size: Vec2,
        color: [f32; 4],
    ) -> &mut Self {
        self.add_quad(center, Vec3::Y, Vec3::NEG_Z, size * 0.5, color)
    }

    /// Subdivided icosahedron of the given radius.
    pub fn add_icosphere(
        &mut self,
        center: Vec3,
        radius: f32,
        subdivisions: u32,
        color: [f32; 4],
    ) -> &mut Self {
        let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
        let mut points: Vec<Vec3> = [
            (-1.0, t, 0.0),
            (1.0, t, 0.0),
            (-1.0, -t, 0.0),
            (1.0, -t, 0.0),
            (0.0, -1.0, t),
            (0.0, 1.0, t),
            (0.0, -1.0, -t),
            (0.0, 1.0, -t),
            (t, 0.0, -1.0),
            (t, 0.0, 1.0),
            (-t, 0.0, -1.0),
            (-t, 0.0, 1.0),
        ]
        .iter()
        .map(|&(x, y, z)| Vec3::new(x, y, z).normalize())
        .collect();
        let mut faces: Vec<[u32; 3]> = vec![
            [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
            [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
            [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
            [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
        ];

        for _ in 0..subdivisions {
            let mut midpoints: FxHashMap<(u32, u32), u32> = FxHashMap::default();
            let mut midpoint = |a: u32, b: u32, points: &mut Vec<Vec3>| {
                let key = (a.min(b), a.max(b));
                *midpoints.entry(key).or_insert_with(|| {
                    let p = ((points[a as usize] + points[b as usize]) * 0.5)
                        .normalize();
                    points.push(p);
                    (points.len() - 1) as u32
                })
            };
            let mut next = Vec::with_capacity(faces.len() * 4);
            for [a, b, c] in faces {
                let ab = midpoint(a, b, &mut points);
                let bc = midpoint(b, c, &mut points);
                let ca = midpoint(c, a, &mut points);
                next.extend_from_slice(&[
                    [a, ab, ca],
                    [b, bc, ab],
                    [c, ca, bc],
                    [ab, bc, ca],
                ]);
            }
            faces = next;
        }

        let base = self.vertices.len() as u32;
        for p in &points {
            let u = 0.5 + p.z.atan2(p.x) / std::f32::consts::TAU;
            let v = 0.5 - p.y.asin() / std::f32::consts::PI;
            let _ = self.push_vertex(Vertex {
                position: (center + *p * radius).to_array(),
                normal: p.to_array(),
                uv: [u, v],
                color,
            });
        }
        for [a, b, c] in faces {
            self.push_triangle(base + a, base + b, base + c);
        }
        self
    }

    /// Flip every triangle's winding and negate every normal, turning the
    /// mesh inside out (skyboxes, rooms).
    pub fn invert_faces(&mut self) -> &mut Self {
        for tri in self.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
        for v in &mut self.vertices {
            v.normal = (-Vec3::from_array(v.normal)).to_array();
        }
        self
    }

    /// Upload to GPU buffers.
    pub fn bake(&self, device: &wgpu::Device, label: &str) -> GpuMesh {
        let vertex_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertices")),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Indices")),
                contents: bytemuck::cast_slice(&self.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        GpuMesh {
            label: label.to_owned(),
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Vertex and index buffers of a baked mesh.
#[derive(Debug)]
pub struct GpuMesh {
    label: String,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of indices.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Bind the buffers and issue one indexed draw.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normals_point_along_vertex_normals(mesh: &MeshBuilder) -> bool {
        mesh.indices().chunks_exact(3).all(|tri| {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| Vec3::from_array(mesh.vertices()[i as usize].position));
            let geometric = (b - a).cross(c - a);
            let declared = Vec3::from_array(mesh.vertices()[tri[0] as usize].normal);
            geometric.dot(declared) > 0.0
        })
    }

    #[test]
    fn vertex_is_48_bytes() {
        assert_eq!(size_of::<Vertex>(), 48);
        assert_eq!(Vertex::layout().array_stride, 48);
    }

    #[test]
    fn cube_has_six_outward_faces() {
        let mut mesh = MeshBuilder::new();
        let _ = mesh.add_cube(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0), [1.0; 4]);
        assert_eq!(mesh.vertices().len(), 24);
        assert_eq!(mesh.indices().len(), 36);
        assert!(face_normals_point_along_vertex_normals(&mesh));
        for v in mesh.vertices() {
            let p = Vec3::from_array(v.position);
            assert!((p.abs() - Vec3::new(1.0, 2.0, 3.0)).abs().max_element() < 1e-5);
        }
    }

    #[test]
    fn icosphere_subdivision_counts() {
        let mut base = MeshBuilder::new();
        let _ = base.add_icosphere(Vec3::ZERO, 1.0, 0, [1.0; 4]);
        assert_eq!(base.vertices().len(), 12);
        assert_eq!(base.indices().len(), 60);

        let mut once = MeshBuilder::new();
        let _ = once.add_icosphere(Vec3::ZERO, 2.0, 1, [1.0; 4]);
        assert_eq!(once.vertices().len(), 42);
        assert_eq!(once.indices().len(), 240);
        assert!(face_normals_point_along_vertex_normals(&once));
        for v in once.vertices() {
            assert!((Vec3::from_array(v.position).length() - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn invert_faces_turns_the_mesh_inside_out() {
        let mut mesh = MeshBuilder::new();
        let _ = mesh.add_cube(Vec3::ZERO, Vec3::ONE, [1.0; 4]).invert_faces();
        assert!(mesh.indices().chunks_exact(3).all(|tri| {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| Vec3::from_array(mesh.vertices()[i as usize].position));
            let declared = Vec3::from_array(mesh.vertices()[tri[0] as usize].normal);
            // Inward normals point at the centre.
            (b - a).cross(c - a).dot(declared) > 0.0 && declared.dot(a) < 0.0
        }));
    }

    #[test]
    fn plane_faces_up() {
        let mut mesh = MeshBuilder::new();
        let _ = mesh.add_plane(Vec3::ZERO, Vec2::splat(10.0), [1.0; 4]);
        assert!(face_normals_point_along_vertex_normals(&mesh));
        assert!(mesh.vertices().iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
    }
}
