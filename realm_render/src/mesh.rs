//! CPU-side mesh buffers and the GPU vertex layouts they upload into.

use glam::{Vec2, Vec3};

/// Flat triangle-list geometry stored as parallel arrays.
///
/// `coordinates` and `normals` hold 3 floats per vertex, `texture_mapping`
/// holds 2. Every three consecutive vertices form one triangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffer {
    pub coordinates: Vec<f32>,
    pub normals: Vec<f32>,
    pub texture_mapping: Vec<f32>,
}

impl MeshBuffer {
    pub fn vertex_count(&self) -> usize {
        self.coordinates.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn clear(&mut self) {
        self.coordinates.clear();
        self.normals.clear();
        self.texture_mapping.clear();
    }

    /// Appends one vertex to all three arrays.
    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3, uv: Vec2) {
        self.coordinates.extend_from_slice(&position.to_array());
        self.normals.extend_from_slice(&normal.to_array());
        self.texture_mapping.extend_from_slice(&uv.to_array());
    }

    pub fn position(&self, vertex: usize) -> Vec3 {
        Vec3::from_slice(&self.coordinates[vertex * 3..vertex * 3 + 3])
    }

    pub fn normal(&self, vertex: usize) -> Vec3 {
        Vec3::from_slice(&self.normals[vertex * 3..vertex * 3 + 3])
    }

    pub fn uv(&self, vertex: usize) -> Vec2 {
        Vec2::from_slice(&self.texture_mapping[vertex * 2..vertex * 2 + 2])
    }

    /// Interleaves the parallel arrays for upload.
    pub fn to_vertices(&self) -> Vec<MeshVertex> {
        (0..self.vertex_count())
            .map(|i| MeshVertex {
                position: self.position(i).to_array(),
                normal: self.normal(i).to_array(),
                tex_coords: self.uv(i).to_array(),
            })
            .collect()
    }
}

/// Vertex for the terrain and road pipelines.
///
/// Layout: position (3 × f32) + normal (3 × f32) + tex_coords (2 × f32) = 32 bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    /// Game-space `(x, y, height)`.
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl MeshVertex {
    pub const SIZE: usize = 32;

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position: vec3<f32>
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // normal: vec3<f32>
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // tex_coords: vec2<f32>
                wgpu::VertexAttribute {
                    offset: 24,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Vertex for the fog-of-war pipeline.
///
/// Layout: position (3 × f32) + intensity (1 × f32) = 16 bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FogVertex {
    pub position: [f32; 3],
    /// 1.0 leaves the scene untouched, 0.0 blacks it out.
    pub intensity: f32,
}

impl FogVertex {
    pub const SIZE: usize = 16;

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}
