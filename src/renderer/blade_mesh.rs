//! Blade mesh
//!
//! The per-instance mesh every drawn blade shares. Draw arguments (index
//! count, first index, base vertex) come from here so the reset template in
//! the draw-args buffer always matches the bound mesh.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Vertex format of the blade card
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BladeVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl BladeVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BladeVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Shared blade geometry plus the indexing constants the indirect draw
/// arguments are templated from
pub struct BladeMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
}

impl BladeMesh {
    /// Two-triangle blade card, 1 unit tall, tapering from a 0.1-unit base.
    /// UV.y runs root to tip for bend weighting in the vertex shader.
    pub fn standard(device: &wgpu::Device) -> Self {
        let vertices = [
            BladeVertex {
                position: [-0.05, 0.0, 0.0],
                uv: [0.0, 0.0],
            },
            BladeVertex {
                position: [0.05, 0.0, 0.0],
                uv: [1.0, 0.0],
            },
            BladeVertex {
                position: [0.05, 1.0, 0.0],
                uv: [1.0, 1.0],
            },
            BladeVertex {
                position: [-0.05, 1.0, 0.0],
                uv: [0.0, 1.0],
            },
        ];
        let indices: [u32; 6] = [0, 1, 2, 0, 2, 3];

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("(Grass) Blade Mesh Vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("(Grass) Blade Mesh Indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            first_index: 0,
            base_vertex: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn test_blade_vertex_size() {
        assert_eq!(mem::size_of::<BladeVertex>(), 20);
    }

    #[test]
    fn test_vertex_layout_stride() {
        let layout = BladeVertex::layout();
        assert_eq!(layout.array_stride, 20);
        assert_eq!(layout.attributes.len(), 2);
    }
}
