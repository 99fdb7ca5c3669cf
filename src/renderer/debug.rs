//! Debug readbacks
//!
//! Test and diagnostics helpers. The render path never reads anything back;
//! these exist so tests and tools can inspect what the compute stages wrote.

use futures::channel::oneshot;

use crate::error::{buffer_mapping_error, GrassError, GrassResult};
use crate::renderer::render_buffers::{DrawArgsRegion, DrawIndirectArgs, RenderBuffers};

/// Copy a draw-args region to a staging buffer and block until it is mapped.
///
/// Stalls the GPU, only for tests and tooling.
pub fn read_draw_args(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffers: &RenderBuffers,
    region: DrawArgsRegion,
) -> GrassResult<DrawIndirectArgs> {
    let draw_args = buffers.draw_args();
    let source = draw_args
        .buffer()
        .ok_or_else(|| GrassError::Internal("draw args buffer unallocated".to_string()))?;
    let offset = draw_args.region_byte_offset(region)?;
    let size = std::mem::size_of::<DrawIndirectArgs>() as u64;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("(Grass) Draw Args Readback"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("(Grass) Draw Args Readback"),
    });
    encoder.copy_buffer_to_buffer(source, offset, &staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    pollster::block_on(receiver)
        .map_err(|_| buffer_mapping_error("readback channel closed"))?
        .map_err(|e| buffer_mapping_error(format!("map failed: {:?}", e)))?;

    let args = {
        let view = slice.get_mapped_range();
        *bytemuck::from_bytes::<DrawIndirectArgs>(&view)
    };
    staging.unmap();
    Ok(args)
}

/// Read the counters buffer: visible triangles, blade sources, instances
pub fn read_counters(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffers: &RenderBuffers,
) -> GrassResult<[u32; 3]> {
    let source = buffers.counters()?;
    let size = 3 * std::mem::size_of::<u32>() as u64;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("(Grass) Counters Readback"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("(Grass) Counters Readback"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    pollster::block_on(receiver)
        .map_err(|_| buffer_mapping_error("readback channel closed"))?
        .map_err(|e| buffer_mapping_error(format!("map failed: {:?}", e)))?;

    let counters = {
        let view = slice.get_mapped_range();
        let values: &[u32] = bytemuck::cast_slice(&view);
        [values[0], values[1], values[2]]
    };
    staging.unmap();
    Ok(counters)
}
