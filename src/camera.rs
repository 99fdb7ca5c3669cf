//! Culling camera data
//!
//! The vertex-cull stage tests source vertices in clip space against the
//! combined projection × view matrix, so that is the only camera state the
//! pipeline uploads.

use bytemuck::{Pod, Zeroable};
use cgmath::{Matrix4, SquareMatrix};

/// Camera state for one recorded frame
#[derive(Copy, Clone, Debug)]
pub struct CullingCamera {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
}

impl CullingCamera {
    pub fn new(view: Matrix4<f32>, projection: Matrix4<f32>) -> Self {
        Self { view, projection }
    }

    /// Combined projection × view matrix (the frustum transform the cull
    /// stage tests against)
    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection * self.view
    }

    pub fn uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_proj().into(),
        }
    }
}

impl Default for CullingCamera {
    fn default() -> Self {
        Self {
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
        }
    }
}

/// GPU camera uniform
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Point3, Vector3};
    use std::mem;

    #[test]
    fn test_camera_uniform_size() {
        assert_eq!(mem::size_of::<CameraUniform>(), 64);
    }

    #[test]
    fn test_view_proj_composition() {
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 5.0, 10.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_y(),
        );
        let projection = cgmath::perspective(Deg(60.0), 16.0 / 9.0, 0.1, 500.0);
        let camera = CullingCamera::new(view, projection);

        let expected: [[f32; 4]; 4] = (projection * view).into();
        assert_eq!(camera.uniform().view_proj, expected);
    }
}
