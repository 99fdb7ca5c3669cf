//! Pipeline buffer set
//!
//! Single owner of every device buffer the grass pipeline touches. Sizing
//! lives here and nowhere else, so the four compute stages can never disagree
//! about capacities when the source geometry changes.

use bytemuck::{Pod, Zeroable};

use crate::constants::{
    BLADE_INSTANCE_SIZE, BLADE_SOURCE_SIZE, COUNTER_SLOTS, GRASS_TRIANGLE_SIZE, GRASS_VERTEX_SIZE,
    VERTEX_CULL_RESULT_SIZE,
};
use crate::error::{GrassError, GrassResult};
use crate::geometry::{GrassTriangle, GrassVertex};
use crate::renderer::blade_mesh::BladeMesh;
use crate::renderer::shared_buffer::SharedBuffer;
use crate::settings::GrassSettings;

/// Indexed indirect draw arguments, matching wgpu's DrawIndexedIndirect
/// layout exactly. `instance_count` is the only field the GPU mutates.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DrawIndirectArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

impl DrawIndirectArgs {
    /// Template for a blade mesh: everything taken from the mesh, instance
    /// count zeroed for the GPU to fill.
    pub fn for_mesh(mesh: &BladeMesh) -> Self {
        Self {
            index_count: mesh.index_count,
            instance_count: 0,
            first_index: mesh.first_index,
            base_vertex: mesh.base_vertex,
            first_instance: 0,
        }
    }
}

/// Indirect dispatch arguments. X is GPU-computed, Y/Z stay 1.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ComputeIndirectArgs {
    pub thread_groups_x: u32,
    pub thread_groups_y: u32,
    pub thread_groups_z: u32,
}

impl ComputeIndirectArgs {
    /// Per-frame baseline: zero groups until a stage appends work
    pub const RESET: Self = Self {
        thread_groups_x: 0,
        thread_groups_y: 1,
        thread_groups_z: 1,
    };
}

/// Named regions of the shared draw-argument buffer
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DrawArgsRegion {
    Draw,
    ShadowDraw,
}

/// Required element capacities for the current geometry and settings.
///
/// Pure so resize behavior is testable: buffers sized to vertex/triangle
/// counts reallocate only when those counts change, and an empty list still
/// gets a 1-element buffer so bind groups stay valid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BufferSizes {
    pub vertex_capacity: u32,
    pub triangle_capacity: u32,
    pub blade_capacity: u32,
}

impl BufferSizes {
    pub fn for_geometry(vertex_count: u32, triangle_count: u32, max_blades: u32) -> Self {
        Self {
            vertex_capacity: vertex_count.max(1),
            triangle_capacity: triangle_count.max(1),
            blade_capacity: max_blades.max(1),
        }
    }
}

/// Every device buffer of the grass pipeline
pub struct RenderBuffers {
    draw_args: SharedBuffer<DrawArgsRegion, DrawIndirectArgs>,
    generate_dispatch: Option<wgpu::Buffer>,
    interpolate_dispatch: Option<wgpu::Buffer>,
    counters: Option<wgpu::Buffer>,

    vertex_buffer: Option<wgpu::Buffer>,
    triangle_buffer: Option<wgpu::Buffer>,
    visibility_buffer: Option<wgpu::Buffer>,
    visible_triangles: Option<wgpu::Buffer>,
    blade_source: Option<wgpu::Buffer>,
    instances: Option<wgpu::Buffer>,

    sizes: BufferSizes,
    vertex_count: u32,
    triangle_count: u32,
    disposed: bool,
}

impl RenderBuffers {
    pub fn new(device: &wgpu::Device) -> Self {
        let mut draw_args = SharedBuffer::new("(Grass) Draw Args Buffer");
        draw_args.add_region(DrawArgsRegion::Draw, 1);
        draw_args.add_region(DrawArgsRegion::ShadowDraw, 1);
        // COPY_SRC so the debug readbacks can stage these out
        draw_args.allocate(
            device,
            wgpu::BufferUsages::INDIRECT
                | wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC,
        );

        let dispatch_usage = wgpu::BufferUsages::INDIRECT
            | wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST;
        let generate_dispatch = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("(Grass) Generate Blades Dispatch Args"),
            size: std::mem::size_of::<ComputeIndirectArgs>() as u64,
            usage: dispatch_usage,
            mapped_at_creation: false,
        });
        let interpolate_dispatch = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("(Grass) Interpolate Blades Dispatch Args"),
            size: std::mem::size_of::<ComputeIndirectArgs>() as u64,
            usage: dispatch_usage,
            mapped_at_creation: false,
        });
        let counters = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("(Grass) Counters Buffer"),
            size: COUNTER_SLOTS * std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        Self {
            draw_args,
            generate_dispatch: Some(generate_dispatch),
            interpolate_dispatch: Some(interpolate_dispatch),
            counters: Some(counters),
            vertex_buffer: None,
            triangle_buffer: None,
            visibility_buffer: None,
            visible_triangles: None,
            blade_source: None,
            instances: None,
            sizes: BufferSizes {
                vertex_capacity: 0,
                triangle_capacity: 0,
                blade_capacity: 0,
            },
            vertex_count: 0,
            triangle_count: 0,
            disposed: false,
        }
    }

    /// Match buffer capacities to the current geometry and settings, upload
    /// the source lists, and refresh the draw-argument reset template.
    ///
    /// Must only be called between frames, never while a frame's commands are
    /// being recorded against these buffers.
    pub fn validate(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        vertices: &[GrassVertex],
        triangles: &[GrassTriangle],
        settings: &GrassSettings,
        mesh: &BladeMesh,
    ) -> GrassResult<()> {
        if self.disposed {
            return Err(GrassError::Internal(
                "RenderBuffers::validate after dispose".to_string(),
            ));
        }

        let template = DrawIndirectArgs::for_mesh(mesh);
        self.draw_args
            .set_region_data(queue, DrawArgsRegion::Draw, &[template])?;
        self.draw_args
            .set_region_data(queue, DrawArgsRegion::ShadowDraw, &[template])?;

        self.vertex_count = vertices.len() as u32;
        self.triangle_count = triangles.len() as u32;
        let required = BufferSizes::for_geometry(
            self.vertex_count,
            self.triangle_count,
            settings.max_blades,
        );

        if self.vertex_buffer.is_none() || required.vertex_capacity != self.sizes.vertex_capacity {
            log::debug!(
                "[RenderBuffers] Resizing vertex buffers to {} elements",
                required.vertex_capacity
            );
            self.vertex_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("(Grass) Vertex Buffer"),
                size: required.vertex_capacity as u64 * GRASS_VERTEX_SIZE,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.visibility_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("(Grass) Is Visible Per Vertex Buffer"),
                size: required.vertex_capacity as u64 * VERTEX_CULL_RESULT_SIZE,
                usage: wgpu::BufferUsages::STORAGE,
                mapped_at_creation: false,
            }));
        }
        if !vertices.is_empty() {
            queue.write_buffer(self.vertex_buffer()?, 0, bytemuck::cast_slice(vertices));
        }

        if self.triangle_buffer.is_none()
            || required.triangle_capacity != self.sizes.triangle_capacity
        {
            log::debug!(
                "[RenderBuffers] Resizing triangle buffers to {} elements",
                required.triangle_capacity
            );
            self.triangle_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("(Grass) Triangle Buffer"),
                size: required.triangle_capacity as u64 * GRASS_TRIANGLE_SIZE,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.visible_triangles = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("(Grass) Visible Triangles Buffer"),
                size: required.triangle_capacity as u64 * std::mem::size_of::<u32>() as u64,
                usage: wgpu::BufferUsages::STORAGE,
                mapped_at_creation: false,
            }));
        }
        if !triangles.is_empty() {
            queue.write_buffer(self.triangle_buffer()?, 0, bytemuck::cast_slice(triangles));
        }

        if self.blade_source.is_none() || required.blade_capacity != self.sizes.blade_capacity {
            log::debug!(
                "[RenderBuffers] Resizing blade buffers to {} elements",
                required.blade_capacity
            );
            self.blade_source = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("(Grass) Blade Source Buffer"),
                size: required.blade_capacity as u64 * BLADE_SOURCE_SIZE,
                usage: wgpu::BufferUsages::STORAGE,
                mapped_at_creation: false,
            }));
            self.instances = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("(Grass) Blade Instance Buffer"),
                size: required.blade_capacity as u64 * BLADE_INSTANCE_SIZE,
                usage: wgpu::BufferUsages::STORAGE,
                mapped_at_creation: false,
            }));
        }

        self.sizes = required;
        Ok(())
    }

    /// Reset every GPU-written argument and counter to its baseline. Recorded
    /// writes land before the frame's dispatches at the next submit.
    pub fn reset_frame(&self, queue: &wgpu::Queue) -> GrassResult<()> {
        self.draw_args.reset_to_default(queue)?;
        queue.write_buffer(
            self.generate_dispatch()?,
            0,
            bytemuck::bytes_of(&ComputeIndirectArgs::RESET),
        );
        queue.write_buffer(
            self.interpolate_dispatch()?,
            0,
            bytemuck::bytes_of(&ComputeIndirectArgs::RESET),
        );
        queue.write_buffer(self.counters()?, 0, bytemuck::cast_slice(&[0u32; 3]));
        Ok(())
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn triangle_count(&self) -> u32 {
        self.triangle_count
    }

    pub fn blade_capacity(&self) -> u32 {
        self.sizes.blade_capacity
    }

    pub fn draw_args(&self) -> &SharedBuffer<DrawArgsRegion, DrawIndirectArgs> {
        &self.draw_args
    }

    pub fn generate_dispatch(&self) -> GrassResult<&wgpu::Buffer> {
        Self::handle(&self.generate_dispatch, "generate dispatch")
    }

    pub fn interpolate_dispatch(&self) -> GrassResult<&wgpu::Buffer> {
        Self::handle(&self.interpolate_dispatch, "interpolate dispatch")
    }

    pub fn counters(&self) -> GrassResult<&wgpu::Buffer> {
        Self::handle(&self.counters, "counters")
    }

    pub fn vertex_buffer(&self) -> GrassResult<&wgpu::Buffer> {
        Self::handle(&self.vertex_buffer, "vertex")
    }

    pub fn triangle_buffer(&self) -> GrassResult<&wgpu::Buffer> {
        Self::handle(&self.triangle_buffer, "triangle")
    }

    pub fn visibility_buffer(&self) -> GrassResult<&wgpu::Buffer> {
        Self::handle(&self.visibility_buffer, "visibility")
    }

    pub fn visible_triangles(&self) -> GrassResult<&wgpu::Buffer> {
        Self::handle(&self.visible_triangles, "visible triangles")
    }

    pub fn blade_source(&self) -> GrassResult<&wgpu::Buffer> {
        Self::handle(&self.blade_source, "blade source")
    }

    pub fn instances(&self) -> GrassResult<&wgpu::Buffer> {
        Self::handle(&self.instances, "instances")
    }

    /// Release every owned buffer. Safe to call more than once; all handles
    /// are invalid afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        log::debug!("[RenderBuffers] Disposing all buffers");
        self.draw_args.dispose();
        self.generate_dispatch = None;
        self.interpolate_dispatch = None;
        self.counters = None;
        self.vertex_buffer = None;
        self.triangle_buffer = None;
        self.visibility_buffer = None;
        self.visible_triangles = None;
        self.blade_source = None;
        self.instances = None;
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn handle<'a>(slot: &'a Option<wgpu::Buffer>, name: &str) -> GrassResult<&'a wgpu::Buffer> {
        slot.as_ref().ok_or_else(|| {
            GrassError::Internal(format!("{} buffer unavailable (not validated or disposed)", name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn test_arg_struct_sizes() {
        assert_eq!(
            mem::size_of::<DrawIndirectArgs>() as u64,
            crate::constants::DRAW_INDIRECT_ARGS_SIZE
        );
        assert_eq!(
            mem::size_of::<ComputeIndirectArgs>() as u64,
            crate::constants::COMPUTE_INDIRECT_ARGS_SIZE
        );
    }

    #[test]
    fn test_dispatch_reset_baseline() {
        let reset = ComputeIndirectArgs::RESET;
        assert_eq!(reset.thread_groups_x, 0);
        assert_eq!(reset.thread_groups_y, 1);
        assert_eq!(reset.thread_groups_z, 1);
    }

    #[test]
    fn test_buffer_sizes_track_counts() {
        // 0 -> 100 -> 50: capacity follows max(1, count) at each step
        let empty = BufferSizes::for_geometry(0, 0, 1_000_000);
        assert_eq!(empty.vertex_capacity, 1);
        assert_eq!(empty.triangle_capacity, 1);

        let grown = BufferSizes::for_geometry(100, 150, 1_000_000);
        assert_eq!(grown.vertex_capacity, 100);
        assert_ne!(grown, empty);

        let shrunk = BufferSizes::for_geometry(50, 70, 1_000_000);
        assert_eq!(shrunk.vertex_capacity, 50);
        assert_ne!(shrunk, grown);

        // Same counts mean no reallocation
        assert_eq!(shrunk, BufferSizes::for_geometry(50, 70, 1_000_000));
    }

    #[test]
    fn test_blade_capacity_follows_settings() {
        let a = BufferSizes::for_geometry(10, 10, 500);
        let b = BufferSizes::for_geometry(10, 10, 1000);
        assert_eq!(a.blade_capacity, 500);
        assert_eq!(b.blade_capacity, 1000);
        assert_eq!(BufferSizes::for_geometry(10, 10, 0).blade_capacity, 1);
    }
}
