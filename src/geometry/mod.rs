//! Source geometry for the grass pipeline
//!
//! The pipeline consumes exactly two lists: density-tagged vertices and
//! triangles indexing into them. Providers supply patches of that geometry
//! and the manager concatenates them into the per-validation upload.

pub mod manager;
pub mod provider;

pub use manager::GrassManager;
pub use provider::{GrassProvider, PatchProvider};

use bytemuck::{Pod, Zeroable};

use crate::error::{GrassError, GrassResult};

/// One source-mesh vertex. `density` drives how many blades the triangles
/// touching this vertex produce.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GrassVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub density: f32,
}

impl GrassVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], density: f32) -> Self {
        Self {
            position,
            normal,
            density,
        }
    }
}

/// One source triangle: three indices into the current vertex list
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GrassTriangle {
    pub a: u32,
    pub b: u32,
    pub c: u32,
}

impl GrassTriangle {
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Self { a, b, c }
    }

    pub fn indices(&self) -> [u32; 3] {
        [self.a, self.b, self.c]
    }
}

/// A self-contained chunk of source geometry with patch-local triangle indices
#[derive(Clone, Debug, Default)]
pub struct GrassPatch {
    pub vertices: Vec<GrassVertex>,
    pub triangles: Vec<GrassTriangle>,
}

impl GrassPatch {
    pub fn new(vertices: Vec<GrassVertex>, triangles: Vec<GrassTriangle>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    /// Check that every triangle index refers to a vertex of this patch
    pub fn validate(&self) -> GrassResult<()> {
        let limit = self.vertices.len() as u32;
        for (i, tri) in self.triangles.iter().enumerate() {
            for idx in tri.indices() {
                if idx >= limit {
                    return Err(GrassError::InvalidGeometry(format!(
                        "triangle {} references vertex {} but patch has {} vertices",
                        i, idx, limit
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.triangles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn test_geometry_sizes() {
        assert_eq!(mem::size_of::<GrassVertex>() as u64, crate::constants::GRASS_VERTEX_SIZE);
        assert_eq!(
            mem::size_of::<GrassTriangle>() as u64,
            crate::constants::GRASS_TRIANGLE_SIZE
        );
    }

    #[test]
    fn test_patch_validation() {
        let patch = GrassPatch::new(
            vec![
                GrassVertex::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], 1.0),
                GrassVertex::new([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], 1.0),
                GrassVertex::new([0.0, 0.0, 1.0], [0.0, 1.0, 0.0], 1.0),
            ],
            vec![GrassTriangle::new(0, 1, 2)],
        );
        assert!(patch.validate().is_ok());

        let broken = GrassPatch::new(patch.vertices.clone(), vec![GrassTriangle::new(0, 1, 3)]);
        assert!(matches!(broken.validate(), Err(GrassError::InvalidGeometry(_))));
    }
}
