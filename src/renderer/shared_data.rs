//! Shared render state
//!
//! One struct owns everything the compute and draw passes share: settings,
//! the buffer set, the blade mesh and the renderable flag. Passes read it,
//! only [`validate`](RenderSharedData::validate) mutates it.

use crate::error::{GrassError, GrassResult};
use crate::geometry::GrassManager;
use crate::renderer::blade_mesh::BladeMesh;
use crate::renderer::render_buffers::RenderBuffers;
use crate::settings::GrassSettings;

/// Whether a frame is worth recording at all.
///
/// Without culling the compute programs are still needed (generate and
/// interpolate always run), so program readiness gates rendering regardless
/// of the culling toggle.
pub fn renderable(has_render_content: bool, compute_programs_ready: bool) -> bool {
    has_render_content && compute_programs_ready
}

/// State shared by the culling pass and the draw passes
pub struct RenderSharedData {
    settings: GrassSettings,
    buffers: RenderBuffers,
    mesh: BladeMesh,
    compute_ready: bool,
    can_render: bool,
}

impl RenderSharedData {
    pub fn new(device: &wgpu::Device, mut settings: GrassSettings) -> Self {
        settings.sanitize();
        Self {
            settings,
            buffers: RenderBuffers::new(device),
            mesh: BladeMesh::standard(device),
            compute_ready: false,
            can_render: false,
        }
    }

    /// Record that the compute programs compiled. Until then every draw
    /// declines, because the instance buffer would never be written.
    pub fn mark_compute_ready(&mut self) {
        self.compute_ready = true;
    }

    /// Re-collect geometry from the manager, resize and upload buffers, and
    /// recompute the renderable flag. Call whenever providers or settings
    /// changed, between frames.
    pub fn validate(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        manager: &GrassManager,
    ) -> GrassResult<()> {
        self.settings.sanitize();
        let (vertices, triangles) = manager.collect_geometry()?;
        self.buffers.validate(
            device,
            queue,
            &vertices,
            &triangles,
            &self.settings,
            &self.mesh,
        )?;

        let has_content = !vertices.is_empty() && !triangles.is_empty();
        self.can_render = renderable(has_content, self.compute_ready);
        log::debug!(
            "[RenderSharedData] Validated: {} vertices, {} triangles, can_render={}",
            vertices.len(),
            triangles.len(),
            self.can_render
        );
        Ok(())
    }

    pub fn can_render(&self) -> bool {
        self.can_render
    }

    /// Error-typed form of the renderable flag for callers that want the
    /// reason rather than a bool
    pub fn ensure_renderable(&self) -> GrassResult<()> {
        if self.can_render {
            return Ok(());
        }
        let reason = if !self.compute_ready {
            "compute programs not ready"
        } else {
            "no source geometry"
        };
        Err(GrassError::NotRenderable(reason.to_string()))
    }

    pub fn settings(&self) -> &GrassSettings {
        &self.settings
    }

    /// Mutable settings access; the caller must validate afterwards
    pub fn settings_mut(&mut self) -> &mut GrassSettings {
        &mut self.settings
    }

    pub fn buffers(&self) -> &RenderBuffers {
        &self.buffers
    }

    pub fn mesh(&self) -> &BladeMesh {
        &self.mesh
    }

    pub fn dispose(&mut self) {
        self.buffers.dispose();
        self.can_render = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderable_truth_table() {
        assert!(renderable(true, true));
        assert!(!renderable(true, false));
        assert!(!renderable(false, true));
        assert!(!renderable(false, false));
    }
}
