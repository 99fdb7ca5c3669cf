//! Headless indirect grass demo.
//!
//! Builds a randomly seeded terrain patch, runs the full compute chain and
//! an offscreen forward draw for a handful of frames, and prints the
//! GPU-written instance counts. No window required.

use cgmath::{Deg, Matrix4, Point3, Vector3};
use rand::Rng;
use std::sync::Arc;

use grass_engine::renderer::debug::{read_counters, read_draw_args};
use grass_engine::{
    CullingCamera, CullingPass, DrawArgsRegion, GrassForwardPass, GrassManager, GrassPatch,
    GrassSettings, GrassTriangle, GrassVertex, PatchProvider, RenderSharedData,
};

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const GRID: u32 = 33;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    pollster::block_on(run())
}

/// Flat terrain grid with gently varying height and random vertex density
fn terrain_patch() -> GrassPatch {
    let mut rng = rand::thread_rng();
    let mut vertices = Vec::with_capacity((GRID * GRID) as usize);
    for z in 0..GRID {
        for x in 0..GRID {
            let fx = x as f32 - GRID as f32 / 2.0;
            let fz = z as f32 - GRID as f32 / 2.0;
            let height = (fx * 0.3).sin() * (fz * 0.3).cos() * 0.5;
            vertices.push(GrassVertex::new(
                [fx, height, fz],
                [0.0, 1.0, 0.0],
                rng.gen_range(0.0..=1.0),
            ));
        }
    }

    let mut triangles = Vec::new();
    for z in 0..GRID - 1 {
        for x in 0..GRID - 1 {
            let i = z * GRID + x;
            triangles.push(GrassTriangle::new(i, i + GRID, i + 1));
            triangles.push(GrassTriangle::new(i + 1, i + GRID, i + GRID + 1));
        }
    }
    GrassPatch::new(vertices, triangles)
}

async fn run() -> anyhow::Result<()> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| anyhow::anyhow!("no GPU adapter available"))?;
    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Grass Demo Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .await?;
    let device = Arc::new(device);
    let queue = Arc::new(queue);
    println!("Adapter: {}", adapter.get_info().name);

    let mut manager = GrassManager::new();
    manager.add_provider(Box::new(PatchProvider::new(terrain_patch())));

    let settings = GrassSettings {
        max_blades: 200_000,
        ..Default::default()
    };
    let mut shared = RenderSharedData::new(&device, settings);
    shared.mark_compute_ready();
    shared.validate(&device, &queue, &manager)?;
    println!(
        "Terrain: {} vertices, {} triangles",
        shared.buffers().vertex_count(),
        shared.buffers().triangle_count()
    );

    let culling = CullingPass::new(device.clone());
    let mut forward = GrassForwardPass::new(device.clone(), COLOR_FORMAT, DEPTH_FORMAT);
    forward.setup(&shared)?;

    let extent = wgpu::Extent3d {
        width: 1024,
        height: 768,
        depth_or_array_layers: 1,
    };
    let color = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Demo Color Target"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Demo Depth Target"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
    let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

    let view = Matrix4::look_at_rh(
        Point3::new(0.0, 18.0, 30.0),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::unit_y(),
    );
    let projection = cgmath::perspective(Deg(60.0), 1024.0 / 768.0, 0.1, 500.0);
    let camera = CullingCamera::new(view, projection);

    for frame in 0..5u32 {
        let time = frame as f32 / 60.0;
        forward.prepare(
            &queue,
            camera.view_proj(),
            shared.settings().scale,
            shared.settings().sway,
            time,
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Grass Demo Frame"),
        });
        culling.record(
            &mut encoder,
            &queue,
            shared.buffers(),
            &camera,
            shared.settings(),
            time,
        )?;
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Grass Demo Forward"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.07,
                            b: 0.12,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            forward.draw(&mut rpass, &shared)?;
        }
        queue.submit(std::iter::once(encoder.finish()));
        device.poll(wgpu::Maintain::Wait);

        let args = read_draw_args(&device, &queue, shared.buffers(), DrawArgsRegion::Draw)?;
        println!("Frame {}: {} blade instances drawn", frame, args.instance_count);
    }

    let counters = read_counters(&device, &queue, shared.buffers())?;
    println!(
        "Counters: {} visible triangles, {} blade sources, {} instances",
        counters[0], counters[1], counters[2]
    );
    Ok(())
}
