//! Grass provider management
//!
//! Owns the list of geometry providers outright; there is no ambient
//! registry. Whoever owns the manager decides which providers feed the
//! pipeline and when the shared render data gets revalidated.

use super::{GrassProvider, GrassTriangle, GrassVertex};
use crate::error::{GrassError, GrassResult};

/// Handle returned by [`GrassManager::add_provider`], used for removal
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProviderId(u64);

/// Owns the grass geometry providers and concatenates their output
pub struct GrassManager {
    providers: Vec<(ProviderId, Box<dyn GrassProvider>)>,
    next_id: u64,
}

impl GrassManager {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn add_provider(&mut self, provider: Box<dyn GrassProvider>) -> ProviderId {
        let id = ProviderId(self.next_id);
        self.next_id += 1;
        self.providers.push((id, provider));
        log::debug!("[GrassManager] Registered provider {:?}", id);
        id
    }

    pub fn remove_provider(&mut self, id: ProviderId) -> bool {
        let before = self.providers.len();
        self.providers.retain(|(pid, _)| *pid != id);
        let removed = self.providers.len() != before;
        if removed {
            log::debug!("[GrassManager] Unregistered provider {:?}", id);
        }
        removed
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// True if at least one provider has geometry to contribute
    pub fn has_render_content(&self) -> bool {
        self.providers.iter().any(|(_, p)| p.has_data())
    }

    /// Concatenate all provider geometry into one vertex/triangle list.
    ///
    /// Each provider's triangle indices are rebased by the vertex count
    /// already collected, so the result indexes into the combined list.
    /// Out-of-range indices from a misbehaving provider are rejected.
    pub fn collect_geometry(&self) -> GrassResult<(Vec<GrassVertex>, Vec<GrassTriangle>)> {
        let mut vertices = Vec::new();
        let mut triangles = Vec::new();

        for (id, provider) in &self.providers {
            if !provider.has_data() {
                continue;
            }
            let vertex_base = vertices.len() as u32;
            let triangle_base = triangles.len();
            provider.append_geometry(&mut vertices, &mut triangles);

            let vertex_limit = (vertices.len() as u32) - vertex_base;
            for tri in &mut triangles[triangle_base..] {
                if tri.a >= vertex_limit || tri.b >= vertex_limit || tri.c >= vertex_limit {
                    return Err(GrassError::InvalidGeometry(format!(
                        "provider {:?} emitted triangle ({}, {}, {}) outside its {} vertices",
                        id, tri.a, tri.b, tri.c, vertex_limit
                    )));
                }
                tri.a += vertex_base;
                tri.b += vertex_base;
                tri.c += vertex_base;
            }
        }

        log::debug!(
            "[GrassManager] Collected {} vertices / {} triangles from {} providers",
            vertices.len(),
            triangles.len(),
            self.providers.len()
        );
        Ok((vertices, triangles))
    }
}

impl Default for GrassManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{GrassPatch, PatchProvider};

    fn flat_patch(vertex_count: usize, density: f32) -> GrassPatch {
        let vertices = (0..vertex_count)
            .map(|i| GrassVertex::new([i as f32, 0.0, 0.0], [0.0, 1.0, 0.0], density))
            .collect();
        let triangles = (0..vertex_count.saturating_sub(2))
            .map(|i| GrassTriangle::new(i as u32, i as u32 + 1, i as u32 + 2))
            .collect();
        GrassPatch::new(vertices, triangles)
    }

    #[test]
    fn test_collect_rebases_triangle_indices() {
        let mut mgr = GrassManager::new();
        mgr.add_provider(Box::new(PatchProvider::new(flat_patch(3, 1.0))));
        mgr.add_provider(Box::new(PatchProvider::new(flat_patch(4, 0.5))));

        let (vertices, triangles) = mgr.collect_geometry().expect("collect failed");
        assert_eq!(vertices.len(), 7);
        assert_eq!(triangles.len(), 3);
        // Second provider's triangles index past the first provider's vertices
        assert_eq!(triangles[1], GrassTriangle::new(3, 4, 5));
        assert_eq!(triangles[2], GrassTriangle::new(4, 5, 6));
        for tri in &triangles {
            for idx in tri.indices() {
                assert!(idx < vertices.len() as u32);
            }
        }
    }

    #[test]
    fn test_remove_provider() {
        let mut mgr = GrassManager::new();
        let id = mgr.add_provider(Box::new(PatchProvider::new(flat_patch(3, 1.0))));
        assert!(mgr.has_render_content());
        assert!(mgr.remove_provider(id));
        assert!(!mgr.remove_provider(id));
        assert!(!mgr.has_render_content());
        let (vertices, triangles) = mgr.collect_geometry().expect("collect failed");
        assert!(vertices.is_empty());
        assert!(triangles.is_empty());
    }

    #[test]
    fn test_empty_providers_are_skipped() {
        let mut mgr = GrassManager::new();
        mgr.add_provider(Box::new(PatchProvider::new(GrassPatch::default())));
        assert!(!mgr.has_render_content());
        let (vertices, _) = mgr.collect_geometry().expect("collect failed");
        assert!(vertices.is_empty());
    }
}
