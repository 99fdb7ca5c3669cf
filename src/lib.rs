//! GPU-driven indirect grass rendering.
//!
//! A dense field of grass blades is generated and drawn entirely on the GPU:
//! four chained compute stages cull source-mesh vertices against the camera,
//! collect visible triangles, expand them into per-blade work items by
//! density, and interpolate final blade instances, all without the CPU ever
//! reading back a count. The draw stages then issue indirect instanced draws
//! sized by the GPU-written argument buffer.

pub mod camera;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod renderer;
pub mod settings;

pub use camera::{CameraUniform, CullingCamera};
pub use error::{GrassError, GrassResult};
pub use geometry::{GrassManager, GrassPatch, GrassProvider, GrassTriangle, GrassVertex, PatchProvider};
pub use renderer::blade_mesh::{BladeMesh, BladeVertex};
pub use renderer::culling_pass::{CullingPass, FramePlan, GrassComputePrograms};
pub use renderer::draw_passes::{GrassDepthPrePass, GrassForwardPass, GrassShadowCasterPass};
pub use renderer::render_buffers::{
    BufferSizes, ComputeIndirectArgs, DrawArgsRegion, DrawIndirectArgs, RenderBuffers,
};
pub use renderer::shared_buffer::{RegionTable, SharedBuffer};
pub use renderer::shared_data::RenderSharedData;
pub use settings::{GrassPassEvent, GrassSettings};
