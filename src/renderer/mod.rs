//! GPU-driven grass renderer
//!
//! The pipeline is split the way the buffers flow: `shared_buffer` carries
//! the region-allocated indirect-argument buffer, `render_buffers` owns every
//! device buffer, `culling_pass` records the four compute stages, and
//! `draw_passes` issue the indirect instanced draws.

pub mod blade_mesh;
pub mod culling_pass;
pub mod debug;
pub mod draw_passes;
pub mod render_buffers;
pub mod shared_buffer;
pub mod shared_data;

pub use blade_mesh::BladeMesh;
pub use culling_pass::CullingPass;
pub use draw_passes::{GrassDepthPrePass, GrassForwardPass, GrassShadowCasterPass};
pub use render_buffers::RenderBuffers;
pub use shared_buffer::SharedBuffer;
pub use shared_data::RenderSharedData;
