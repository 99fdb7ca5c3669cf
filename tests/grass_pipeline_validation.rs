/// Grass Pipeline Validation Tests
///
/// Runs the full compute chain on a real adapter and reads the indirect
/// arguments back to verify what the GPU counted. Skips cleanly when no
/// adapter is available.

use cgmath::{Matrix4, SquareMatrix};
use std::sync::Arc;

use grass_engine::renderer::debug::{read_counters, read_draw_args};
use grass_engine::{
    CullingCamera, CullingPass, DrawArgsRegion, GrassManager, GrassPatch, GrassSettings,
    GrassTriangle, GrassVertex, PatchProvider, RenderSharedData,
};

/// Initialize GPU context for tests
fn init_gpu() -> Option<(Arc<wgpu::Device>, Arc<wgpu::Queue>)> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))?;

    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("Grass Test Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        },
        None,
    ))
    .ok()?;

    Some((Arc::new(device), Arc::new(queue)))
}

/// Quad of two triangles centered on the origin, inside an identity-camera
/// frustum, with a uniform density at every vertex
fn quad_patch(density: f32, z: f32) -> GrassPatch {
    let normal = [0.0, 1.0, 0.0];
    let vertices = vec![
        GrassVertex::new([-0.5, -0.5, z], normal, density),
        GrassVertex::new([0.5, -0.5, z], normal, density),
        GrassVertex::new([0.5, 0.5, z], normal, density),
        GrassVertex::new([-0.5, 0.5, z], normal, density),
    ];
    let triangles = vec![GrassTriangle::new(0, 1, 2), GrassTriangle::new(0, 2, 3)];
    GrassPatch::new(vertices, triangles)
}

fn build_scene(
    device: &Arc<wgpu::Device>,
    queue: &wgpu::Queue,
    patch: GrassPatch,
    settings: GrassSettings,
) -> (RenderSharedData, CullingPass, GrassManager) {
    let mut manager = GrassManager::new();
    manager.add_provider(Box::new(PatchProvider::new(patch)));

    let mut shared = RenderSharedData::new(device, settings);
    shared.mark_compute_ready();
    shared
        .validate(device, queue, &manager)
        .expect("validate failed");

    let pass = CullingPass::new(device.clone());
    (shared, pass, manager)
}

fn run_frame(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pass: &CullingPass,
    shared: &RenderSharedData,
    camera: &CullingCamera,
) {
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Grass Test Frame"),
    });
    pass.record(&mut encoder, queue, shared.buffers(), camera, shared.settings(), 0.0)
        .expect("record failed");
    queue.submit(std::iter::once(encoder.finish()));
    device.poll(wgpu::Maintain::Wait);
}

fn test_settings() -> GrassSettings {
    GrassSettings {
        // The identity camera has a unit clip volume, lifting by the default
        // simulated height would push every test vertex outside of it
        vertex_simulated_height: 0,
        ..Default::default()
    }
}

#[test]
fn test_full_density_quad_produces_exact_blade_count() {
    let Some((device, queue)) = init_gpu() else {
        println!("Skipping GPU test - no GPU available");
        return;
    };

    let (shared, pass, _manager) = build_scene(&device, &queue, quad_patch(1.0, 0.5), test_settings());
    let camera = CullingCamera::new(Matrix4::identity(), Matrix4::identity());
    run_frame(&device, &queue, &pass, &shared, &camera);

    // Two triangles at density 1.0 and 15 blades per density
    let args = read_draw_args(&device, &queue, shared.buffers(), DrawArgsRegion::Draw)
        .expect("readback failed");
    assert_eq!(args.instance_count, 30);
    assert_eq!(args.index_count, 6);
    assert_eq!(args.first_instance, 0);

    let shadow = read_draw_args(&device, &queue, shared.buffers(), DrawArgsRegion::ShadowDraw)
        .expect("readback failed");
    assert_eq!(shadow.instance_count, 30);

    let counters = read_counters(&device, &queue, shared.buffers()).expect("readback failed");
    assert_eq!(counters, [2, 30, 30]);
}

#[test]
fn test_half_density_truncates_per_triangle() {
    let Some((device, queue)) = init_gpu() else {
        println!("Skipping GPU test - no GPU available");
        return;
    };

    let (shared, pass, _manager) = build_scene(&device, &queue, quad_patch(0.5, 0.5), test_settings());
    let camera = CullingCamera::new(Matrix4::identity(), Matrix4::identity());
    run_frame(&device, &queue, &pass, &shared, &camera);

    // floor(0.5 * 15) = 7 blades per triangle
    let args = read_draw_args(&device, &queue, shared.buffers(), DrawArgsRegion::Draw)
        .expect("readback failed");
    assert_eq!(args.instance_count, 14);
}

#[test]
fn test_second_frame_does_not_accumulate() {
    let Some((device, queue)) = init_gpu() else {
        println!("Skipping GPU test - no GPU available");
        return;
    };

    let (shared, pass, _manager) = build_scene(&device, &queue, quad_patch(1.0, 0.5), test_settings());
    let camera = CullingCamera::new(Matrix4::identity(), Matrix4::identity());
    run_frame(&device, &queue, &pass, &shared, &camera);
    run_frame(&device, &queue, &pass, &shared, &camera);

    let args = read_draw_args(&device, &queue, shared.buffers(), DrawArgsRegion::Draw)
        .expect("readback failed");
    assert_eq!(args.instance_count, 30);
    let counters = read_counters(&device, &queue, shared.buffers()).expect("readback failed");
    assert_eq!(counters, [2, 30, 30]);
}

#[test]
fn test_out_of_frustum_geometry_is_culled() {
    let Some((device, queue)) = init_gpu() else {
        println!("Skipping GPU test - no GPU available");
        return;
    };

    // Behind the identity camera's clip volume
    let (shared, pass, _manager) =
        build_scene(&device, &queue, quad_patch(1.0, -5.0), test_settings());
    let camera = CullingCamera::new(Matrix4::identity(), Matrix4::identity());
    run_frame(&device, &queue, &pass, &shared, &camera);

    let args = read_draw_args(&device, &queue, shared.buffers(), DrawArgsRegion::Draw)
        .expect("readback failed");
    assert_eq!(args.instance_count, 0);
    let counters = read_counters(&device, &queue, shared.buffers()).expect("readback failed");
    assert_eq!(counters, [0, 0, 0]);
}

#[test]
fn test_culling_disabled_generates_for_all_triangles() {
    let Some((device, queue)) = init_gpu() else {
        println!("Skipping GPU test - no GPU available");
        return;
    };

    let mut settings = test_settings();
    settings.enable_culling = false;

    // Same out-of-frustum quad, but without culling every triangle produces
    let (shared, pass, _manager) = build_scene(&device, &queue, quad_patch(1.0, -5.0), settings);
    let camera = CullingCamera::new(Matrix4::identity(), Matrix4::identity());
    run_frame(&device, &queue, &pass, &shared, &camera);

    let args = read_draw_args(&device, &queue, shared.buffers(), DrawArgsRegion::Draw)
        .expect("readback failed");
    assert_eq!(args.instance_count, 30);
}

#[test]
fn test_not_renderable_until_programs_and_geometry() {
    let Some((device, queue)) = init_gpu() else {
        println!("Skipping GPU test - no GPU available");
        return;
    };

    let mut manager = GrassManager::new();
    manager.add_provider(Box::new(PatchProvider::new(quad_patch(1.0, 0.5))));

    // Programs not marked ready: validation succeeds but rendering declines
    let mut shared = RenderSharedData::new(&device, test_settings());
    shared
        .validate(&device, &queue, &manager)
        .expect("validate failed");
    assert!(!shared.can_render());
    assert!(matches!(
        shared.ensure_renderable(),
        Err(grass_engine::GrassError::NotRenderable(_))
    ));

    shared.mark_compute_ready();
    shared
        .validate(&device, &queue, &manager)
        .expect("validate failed");
    assert!(shared.ensure_renderable().is_ok());

    // Geometry gone: renderable again flips off
    let empty = GrassManager::new();
    shared
        .validate(&device, &queue, &empty)
        .expect("validate failed");
    assert!(matches!(
        shared.ensure_renderable(),
        Err(grass_engine::GrassError::NotRenderable(_))
    ));
}

#[test]
fn test_blade_capacity_clamps_instance_count() {
    let Some((device, queue)) = init_gpu() else {
        println!("Skipping GPU test - no GPU available");
        return;
    };

    let mut settings = test_settings();
    settings.max_blades = 10;

    let (shared, pass, _manager) = build_scene(&device, &queue, quad_patch(1.0, 0.5), settings);
    let camera = CullingCamera::new(Matrix4::identity(), Matrix4::identity());
    run_frame(&device, &queue, &pass, &shared, &camera);

    // 30 blades owed, 10 slots: appends past capacity are dropped and the
    // instance count stays equal to the stored entries
    let args = read_draw_args(&device, &queue, shared.buffers(), DrawArgsRegion::Draw)
        .expect("readback failed");
    assert_eq!(args.instance_count, 10);
    let shadow = read_draw_args(&device, &queue, shared.buffers(), DrawArgsRegion::ShadowDraw)
        .expect("readback failed");
    assert_eq!(shadow.instance_count, 10);
}
