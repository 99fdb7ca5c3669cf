//! Grass geometry providers

use super::{GrassPatch, GrassTriangle, GrassVertex};

/// A source of grass geometry.
///
/// Appended triangle indices are local to the vertices appended by the same
/// call; the manager rebases them into the concatenated lists.
pub trait GrassProvider {
    /// Whether this provider currently has any geometry to contribute
    fn has_data(&self) -> bool;

    /// Append this provider's vertices and (locally indexed) triangles
    fn append_geometry(&self, vertices: &mut Vec<GrassVertex>, triangles: &mut Vec<GrassTriangle>);
}

/// Provider wrapping a pre-built patch of geometry
pub struct PatchProvider {
    patch: GrassPatch,
}

impl PatchProvider {
    pub fn new(patch: GrassPatch) -> Self {
        Self { patch }
    }

    pub fn patch(&self) -> &GrassPatch {
        &self.patch
    }

    /// Replace the patch contents. The manager must be re-validated afterwards
    /// for the change to reach the GPU.
    pub fn set_patch(&mut self, patch: GrassPatch) {
        self.patch = patch;
    }
}

impl GrassProvider for PatchProvider {
    fn has_data(&self) -> bool {
        !self.patch.is_empty()
    }

    fn append_geometry(&self, vertices: &mut Vec<GrassVertex>, triangles: &mut Vec<GrassTriangle>) {
        vertices.extend_from_slice(&self.patch.vertices);
        triangles.extend_from_slice(&self.patch.triangles);
    }
}
