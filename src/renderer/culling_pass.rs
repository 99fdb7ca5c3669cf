//! Culling and blade-generation pass
//!
//! Records the four chained compute stages for one frame:
//!
//! 1. Vertex cull: clip-space visibility per source vertex
//! 2. Collect: compact triangles with at least one visible vertex
//! 3. Generate: per-triangle blade counts into blade-source entries
//! 4. Interpolate: blade-source entries into world-space blade instances
//!
//! Stages 3 and 4 are sized by the GPU through indirect dispatch, so a frame
//! never reads anything back to the CPU. With culling disabled only stages 3
//! and 4 run, and stage 3 walks the full triangle list.

use bytemuck::{Pod, Zeroable};
use std::sync::Arc;

use crate::camera::CullingCamera;
use crate::constants::{CULLING_THREADS_PER_GROUP, MAX_COMPUTE_THREAD_GROUPS, workgroup_count};
use crate::error::GrassResult;
use crate::renderer::render_buffers::RenderBuffers;
use crate::settings::GrassSettings;

/// Per-frame compute parameters, shared by all four stages
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct GrassParamsUniform {
    pub total_vertices: u32,
    pub total_triangles: u32,
    pub max_blades: u32,
    pub blades_per_density: u32,
    pub culling_enabled: u32,
    pub vertex_simulated_height: i32,
    pub time: f32,
    pub _pad: u32,
    pub sway: [f32; 4],
}

/// Blades a triangle produces from its average vertex density.
///
/// Mirrors the device-side computation exactly, truncating toward zero, so
/// CPU-side expectations in tests match what the GPU appends.
pub fn blade_count_for_density(avg_density: f32, blades_per_density: u32) -> u32 {
    (avg_density * blades_per_density as f32).floor().max(0.0) as u32
}

/// CPU-sized dispatches for one frame. Pure so scheduling is testable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FramePlan {
    /// Cull and collect run with CPU-computed sizes; generate and
    /// interpolate are chained through indirect dispatch.
    Culled {
        cull_groups: u32,
        collect_groups: u32,
    },
    /// Generate walks the full triangle list with a CPU-computed size;
    /// interpolate stays indirect.
    Unculled { generate_groups: u32 },
}

impl FramePlan {
    pub fn plan(culling_enabled: bool, vertex_count: u32, triangle_count: u32) -> Self {
        let clamp = |groups: u32| groups.min(MAX_COMPUTE_THREAD_GROUPS);
        if culling_enabled {
            Self::Culled {
                cull_groups: clamp(workgroup_count(vertex_count, CULLING_THREADS_PER_GROUP)),
                collect_groups: clamp(workgroup_count(triangle_count, CULLING_THREADS_PER_GROUP)),
            }
        } else {
            Self::Unculled {
                generate_groups: clamp(workgroup_count(triangle_count, CULLING_THREADS_PER_GROUP)),
            }
        }
    }
}

/// The four compiled compute programs and their bind group layouts
pub struct GrassComputePrograms {
    cull_pipeline: wgpu::ComputePipeline,
    cull_layout: wgpu::BindGroupLayout,
    collect_pipeline: wgpu::ComputePipeline,
    collect_layout: wgpu::BindGroupLayout,
    generate_pipeline: wgpu::ComputePipeline,
    generate_layout: wgpu::BindGroupLayout,
    interpolate_pipeline: wgpu::ComputePipeline,
    interpolate_layout: wgpu::BindGroupLayout,
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl GrassComputePrograms {
    pub fn new(device: &wgpu::Device) -> Self {
        let make = |label: &str,
                    source: &str,
                    entries: &[wgpu::BindGroupLayoutEntry]|
         -> (wgpu::ComputePipeline, wgpu::BindGroupLayout) {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries,
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: "main",
            });
            (pipeline, layout)
        };

        let (cull_pipeline, cull_layout) = make(
            "(Grass) Vertex Cull",
            include_str!("shaders/grass_cull.wgsl"),
            &[
                uniform_entry(0),
                uniform_entry(1),
                storage_entry(2, true),
                storage_entry(3, false),
            ],
        );
        let (collect_pipeline, collect_layout) = make(
            "(Grass) Collect Triangles",
            include_str!("shaders/collect_triangles.wgsl"),
            &[
                uniform_entry(0),
                storage_entry(1, true),
                storage_entry(2, true),
                storage_entry(3, false),
                storage_entry(4, false),
                storage_entry(5, false),
            ],
        );
        let (generate_pipeline, generate_layout) = make(
            "(Grass) Generate Blades",
            include_str!("shaders/generate_blades.wgsl"),
            &[
                uniform_entry(0),
                storage_entry(1, true),
                storage_entry(2, true),
                storage_entry(3, true),
                storage_entry(4, false),
                storage_entry(5, false),
                storage_entry(6, false),
                storage_entry(7, false),
            ],
        );
        let (interpolate_pipeline, interpolate_layout) = make(
            "(Grass) Interpolate Blades",
            include_str!("shaders/interpolate_blades.wgsl"),
            &[
                uniform_entry(0),
                storage_entry(1, true),
                storage_entry(2, true),
                storage_entry(3, true),
                storage_entry(4, false),
                storage_entry(5, false),
            ],
        );

        log::info!("[GrassComputePrograms] Compiled 4 compute stages");
        Self {
            cull_pipeline,
            cull_layout,
            collect_pipeline,
            collect_layout,
            generate_pipeline,
            generate_layout,
            interpolate_pipeline,
            interpolate_layout,
        }
    }
}

/// Records the compute half of a grass frame
pub struct CullingPass {
    programs: GrassComputePrograms,
    camera_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    device: Arc<wgpu::Device>,
}

impl CullingPass {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("(Grass) Camera Uniform"),
            size: std::mem::size_of::<crate::camera::CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("(Grass) Params Uniform"),
            size: std::mem::size_of::<GrassParamsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let programs = GrassComputePrograms::new(&device);
        Self {
            programs,
            camera_buffer,
            params_buffer,
            device,
        }
    }

    /// Record one frame of compute work. Uniform and reset writes go through
    /// the queue and land before the encoder's dispatches at submit.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        buffers: &RenderBuffers,
        camera: &CullingCamera,
        settings: &GrassSettings,
        time: f32,
    ) -> GrassResult<()> {
        let params = GrassParamsUniform {
            total_vertices: buffers.vertex_count(),
            total_triangles: buffers.triangle_count(),
            max_blades: buffers.blade_capacity(),
            blades_per_density: settings.blades_per_density,
            culling_enabled: settings.enable_culling as u32,
            vertex_simulated_height: settings.vertex_simulated_height,
            time,
            _pad: 0,
            sway: settings.sway,
        };
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera.uniform()));
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));
        buffers.reset_frame(queue)?;

        let plan = FramePlan::plan(
            settings.enable_culling,
            buffers.vertex_count(),
            buffers.triangle_count(),
        );
        log::debug!("[CullingPass] Frame plan: {:?}", plan);

        // Bind groups must outlive the compute pass that records them
        let cull_group = self.cull_bind_group(buffers)?;
        let collect_group = self.collect_bind_group(buffers)?;
        let generate_group = self.generate_bind_group(buffers)?;
        let interpolate_group = self.interpolate_bind_group(buffers)?;

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("(Grass) Culling Pass"),
            timestamp_writes: None,
        });

        match plan {
            FramePlan::Culled {
                cull_groups,
                collect_groups,
            } => {
                pass.set_pipeline(&self.programs.cull_pipeline);
                pass.set_bind_group(0, &cull_group, &[]);
                pass.dispatch_workgroups(cull_groups, 1, 1);

                pass.set_pipeline(&self.programs.collect_pipeline);
                pass.set_bind_group(0, &collect_group, &[]);
                pass.dispatch_workgroups(collect_groups, 1, 1);

                pass.set_pipeline(&self.programs.generate_pipeline);
                pass.set_bind_group(0, &generate_group, &[]);
                pass.dispatch_workgroups_indirect(buffers.generate_dispatch()?, 0);
            }
            FramePlan::Unculled { generate_groups } => {
                pass.set_pipeline(&self.programs.generate_pipeline);
                pass.set_bind_group(0, &generate_group, &[]);
                pass.dispatch_workgroups(generate_groups, 1, 1);
            }
        }

        pass.set_pipeline(&self.programs.interpolate_pipeline);
        pass.set_bind_group(0, &interpolate_group, &[]);
        pass.dispatch_workgroups_indirect(buffers.interpolate_dispatch()?, 0);

        Ok(())
    }

    fn cull_bind_group(&self, buffers: &RenderBuffers) -> GrassResult<wgpu::BindGroup> {
        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("(Grass) Vertex Cull Bindings"),
            layout: &self.programs.cull_layout,
            entries: &[
                bind(0, &self.camera_buffer),
                bind(1, &self.params_buffer),
                bind(2, buffers.vertex_buffer()?),
                bind(3, buffers.visibility_buffer()?),
            ],
        }))
    }

    fn collect_bind_group(&self, buffers: &RenderBuffers) -> GrassResult<wgpu::BindGroup> {
        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("(Grass) Collect Triangles Bindings"),
            layout: &self.programs.collect_layout,
            entries: &[
                bind(0, &self.params_buffer),
                bind(1, buffers.triangle_buffer()?),
                bind(2, buffers.visibility_buffer()?),
                bind(3, buffers.visible_triangles()?),
                bind(4, buffers.counters()?),
                bind(5, buffers.generate_dispatch()?),
            ],
        }))
    }

    fn generate_bind_group(&self, buffers: &RenderBuffers) -> GrassResult<wgpu::BindGroup> {
        let draw_args = buffers.draw_args().buffer().ok_or_else(|| {
            crate::error::GrassError::Internal("draw args buffer unallocated".to_string())
        })?;
        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("(Grass) Generate Blades Bindings"),
            layout: &self.programs.generate_layout,
            entries: &[
                bind(0, &self.params_buffer),
                bind(1, buffers.vertex_buffer()?),
                bind(2, buffers.triangle_buffer()?),
                bind(3, buffers.visible_triangles()?),
                bind(4, buffers.blade_source()?),
                bind(5, buffers.counters()?),
                bind(6, buffers.interpolate_dispatch()?),
                bind(7, draw_args),
            ],
        }))
    }

    fn interpolate_bind_group(&self, buffers: &RenderBuffers) -> GrassResult<wgpu::BindGroup> {
        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("(Grass) Interpolate Blades Bindings"),
            layout: &self.programs.interpolate_layout,
            entries: &[
                bind(0, &self.params_buffer),
                bind(1, buffers.vertex_buffer()?),
                bind(2, buffers.triangle_buffer()?),
                bind(3, buffers.blade_source()?),
                bind(4, buffers.counters()?),
                bind(5, buffers.instances()?),
            ],
        }))
    }
}

fn bind(binding: u32, buffer: &wgpu::Buffer) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: buffer.as_entire_binding(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn test_params_uniform_size() {
        // Uniform structs pad to 16-byte rows on the device side
        assert_eq!(mem::size_of::<GrassParamsUniform>(), 48);
    }

    #[test]
    fn test_blade_counts_for_standard_densities() {
        assert_eq!(blade_count_for_density(0.0, 15), 0);
        assert_eq!(blade_count_for_density(0.5, 15), 7);
        assert_eq!(blade_count_for_density(1.0, 15), 15);
    }

    #[test]
    fn test_blade_count_truncates() {
        // 0.9999 * 15 = 14.9985 stays 14 blades
        assert_eq!(blade_count_for_density(0.9999, 15), 14);
        assert_eq!(blade_count_for_density(-1.0, 15), 0);
    }

    #[test]
    fn test_frame_plan_culled() {
        let plan = FramePlan::plan(true, 129, 128);
        assert_eq!(
            plan,
            FramePlan::Culled {
                cull_groups: 2,
                collect_groups: 1,
            }
        );
    }

    #[test]
    fn test_frame_plan_unculled() {
        let plan = FramePlan::plan(false, 1000, 257);
        assert_eq!(plan, FramePlan::Unculled { generate_groups: 3 });
    }

    #[test]
    fn test_frame_plan_clamps_group_count() {
        let plan = FramePlan::plan(true, u32::MAX, 0);
        match plan {
            FramePlan::Culled { cull_groups, .. } => {
                assert_eq!(cull_groups, MAX_COMPUTE_THREAD_GROUPS);
            }
            _ => panic!("expected culled plan"),
        }
    }
}
