//! Indirect grass draw passes
//!
//! Forward, depth-prepass and shadow-caster variants of the same indirect
//! instanced draw. Each pass reads its instance count from the region of the
//! shared draw-args buffer the compute stages wrote, so no pass ever knows
//! how many blades survived culling.

use bytemuck::{Pod, Zeroable};
use cgmath::Matrix4;
use std::sync::Arc;

use crate::error::{GrassError, GrassResult};
use crate::renderer::blade_mesh::BladeVertex;
use crate::renderer::render_buffers::DrawArgsRegion;
use crate::renderer::shared_data::RenderSharedData;

/// Per-pass vertex uniform
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PassUniform {
    pub view_proj: [[f32; 4]; 4],
    pub object_to_world: [[f32; 4]; 4],
    pub sway: [f32; 4],
    pub time: f32,
    pub _pad: [f32; 3],
}

impl PassUniform {
    pub fn new(view_proj: Matrix4<f32>, scale: [f32; 3], sway: [f32; 4], time: f32) -> Self {
        let object_to_world =
            Matrix4::from_nonuniform_scale(scale[0], scale[1], scale[2]);
        Self {
            view_proj: view_proj.into(),
            object_to_world: object_to_world.into(),
            sway,
            time,
            _pad: [0.0; 3],
        }
    }
}

/// Which draw variant a pass pipeline is built for
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum DrawVariant {
    Forward,
    Depth,
    Shadow,
}

impl DrawVariant {
    fn label(self) -> &'static str {
        match self {
            Self::Forward => "(Grass) Forward Pass",
            Self::Depth => "(Grass) Depth PrePass",
            Self::Shadow => "(Grass) Shadow Caster Pass",
        }
    }

    fn vertex_entry(self) -> &'static str {
        match self {
            Self::Forward => "vs_main",
            Self::Depth => "vs_depth",
            Self::Shadow => "vs_shadow",
        }
    }

    fn args_region(self) -> DrawArgsRegion {
        match self {
            Self::Shadow => DrawArgsRegion::ShadowDraw,
            _ => DrawArgsRegion::Draw,
        }
    }
}

/// Shared machinery of the three draw passes
struct DrawPassCore {
    device: Arc<wgpu::Device>,
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    uniform: wgpu::Buffer,
    bind_group: Option<wgpu::BindGroup>,
    variant: DrawVariant,
}

impl DrawPassCore {
    fn new(
        device: Arc<wgpu::Device>,
        variant: DrawVariant,
        color_format: Option<wgpu::TextureFormat>,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(variant.label()),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/grass_draw.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(variant.label()),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(variant.label()),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let targets = color_format.map(|format| {
            [Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })]
        });
        let fragment = targets.as_ref().map(|targets| wgpu::FragmentState {
            module: &module,
            entry_point: "fs_main",
            targets,
        });

        // Shadow maps get a slope-scaled bias to keep blade self-shadowing
        // off the blades themselves
        let bias = if variant == DrawVariant::Shadow {
            wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            }
        } else {
            wgpu::DepthBiasState::default()
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(variant.label()),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: variant.vertex_entry(),
                buffers: &[BladeVertex::layout()],
            },
            fragment,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Blades are camera-thin cards, both faces must draw
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias,
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(variant.label()),
            size: std::mem::size_of::<PassUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            device,
            pipeline,
            layout,
            uniform,
            bind_group: None,
            variant,
        }
    }

    /// Rebind after buffer validation; instance buffer identity may have
    /// changed when geometry was resized.
    fn setup(&mut self, shared: &RenderSharedData) -> GrassResult<()> {
        let instances = shared.buffers().instances()?;
        self.bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.variant.label()),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: instances.as_entire_binding(),
                },
            ],
        }));
        Ok(())
    }

    fn prepare(
        &self,
        queue: &wgpu::Queue,
        view_proj: Matrix4<f32>,
        scale: [f32; 3],
        sway: [f32; 4],
        time: f32,
    ) {
        queue.write_buffer(
            &self.uniform,
            0,
            bytemuck::bytes_of(&PassUniform::new(view_proj, scale, sway, time)),
        );
    }

    fn draw<'a>(
        &'a self,
        pass: &mut wgpu::RenderPass<'a>,
        shared: &'a RenderSharedData,
    ) -> GrassResult<()> {
        if let Err(reason) = shared.ensure_renderable() {
            log::debug!("[{}] Skipped: {}", self.variant.label(), reason);
            return Ok(());
        }
        let bind_group = self
            .bind_group
            .as_ref()
            .ok_or_else(|| GrassError::Internal("draw pass used before setup".to_string()))?;
        let mesh = shared.mesh();
        let draw_args = shared.buffers().draw_args();
        let args_buffer = draw_args
            .buffer()
            .ok_or_else(|| GrassError::Internal("draw args buffer unallocated".to_string()))?;
        let offset = draw_args.region_byte_offset(self.variant.args_region())?;

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed_indirect(args_buffer, offset);
        Ok(())
    }
}

/// Lit forward pass
pub struct GrassForwardPass {
    core: DrawPassCore,
}

impl GrassForwardPass {
    pub fn new(
        device: Arc<wgpu::Device>,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            core: DrawPassCore::new(device, DrawVariant::Forward, Some(color_format), depth_format),
        }
    }

    pub fn setup(&mut self, shared: &RenderSharedData) -> GrassResult<()> {
        self.core.setup(shared)
    }

    pub fn prepare(
        &self,
        queue: &wgpu::Queue,
        view_proj: Matrix4<f32>,
        scale: [f32; 3],
        sway: [f32; 4],
        time: f32,
    ) {
        self.core.prepare(queue, view_proj, scale, sway, time);
    }

    pub fn draw<'a>(
        &'a self,
        pass: &mut wgpu::RenderPass<'a>,
        shared: &'a RenderSharedData,
    ) -> GrassResult<()> {
        self.core.draw(pass, shared)
    }
}

/// Depth-only prepass; no fragment stage
pub struct GrassDepthPrePass {
    core: DrawPassCore,
}

impl GrassDepthPrePass {
    pub fn new(device: Arc<wgpu::Device>, depth_format: wgpu::TextureFormat) -> Self {
        Self {
            core: DrawPassCore::new(device, DrawVariant::Depth, None, depth_format),
        }
    }

    pub fn setup(&mut self, shared: &RenderSharedData) -> GrassResult<()> {
        self.core.setup(shared)
    }

    pub fn prepare(
        &self,
        queue: &wgpu::Queue,
        view_proj: Matrix4<f32>,
        scale: [f32; 3],
        sway: [f32; 4],
        time: f32,
    ) {
        self.core.prepare(queue, view_proj, scale, sway, time);
    }

    pub fn draw<'a>(
        &'a self,
        pass: &mut wgpu::RenderPass<'a>,
        shared: &'a RenderSharedData,
    ) -> GrassResult<()> {
        self.core.draw(pass, shared)
    }
}

/// Shadow caster; draws into the light's depth map with its own view
/// projection and the `ShadowDraw` args region
pub struct GrassShadowCasterPass {
    core: DrawPassCore,
}

impl GrassShadowCasterPass {
    pub fn new(device: Arc<wgpu::Device>, shadow_format: wgpu::TextureFormat) -> Self {
        Self {
            core: DrawPassCore::new(device, DrawVariant::Shadow, None, shadow_format),
        }
    }

    pub fn setup(&mut self, shared: &RenderSharedData) -> GrassResult<()> {
        self.core.setup(shared)
    }

    pub fn prepare(
        &self,
        queue: &wgpu::Queue,
        light_view_proj: Matrix4<f32>,
        scale: [f32; 3],
        sway: [f32; 4],
        time: f32,
    ) {
        self.core.prepare(queue, light_view_proj, scale, sway, time);
    }

    pub fn draw<'a>(
        &'a self,
        pass: &mut wgpu::RenderPass<'a>,
        shared: &'a RenderSharedData,
    ) -> GrassResult<()> {
        self.core.draw(pass, shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::SquareMatrix;
    use std::mem;

    #[test]
    fn test_pass_uniform_size() {
        assert_eq!(mem::size_of::<PassUniform>(), 160);
    }

    #[test]
    fn test_scale_lands_on_diagonal() {
        let uniform =
            PassUniform::new(Matrix4::identity(), [2.0, 3.0, 4.0], [0.0; 4], 0.0);
        assert_eq!(uniform.object_to_world[0][0], 2.0);
        assert_eq!(uniform.object_to_world[1][1], 3.0);
        assert_eq!(uniform.object_to_world[2][2], 4.0);
        assert_eq!(uniform.object_to_world[3][3], 1.0);
    }

    #[test]
    fn test_shadow_uses_its_own_args_region() {
        assert_eq!(DrawVariant::Shadow.args_region(), DrawArgsRegion::ShadowDraw);
        assert_eq!(DrawVariant::Forward.args_region(), DrawArgsRegion::Draw);
        assert_eq!(DrawVariant::Depth.args_region(), DrawArgsRegion::Draw);
    }
}
