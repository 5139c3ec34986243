use k9_core::Rect;

use crate::quad::screen_projection;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Screen-space camera: one world unit is one window pixel, origin top-left.
pub struct Camera2D {
    pub screen: Rect,
}

impl Camera2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            screen: Rect::new(0, 0, width as i32, height as i32),
        }
    }

    pub fn build_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: screen_projection(self.screen).to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    #[test]
    fn uniform_holds_screen_projection() {
        let camera = Camera2D::new(800, 600);
        let uniform = camera.build_uniform();
        let matrix = Mat4::from_cols_array_2d(&uniform.view_proj);
        let center = matrix.project_point3(Vec3::new(400.0, 300.0, 0.0));
        assert!(center.x.abs() < 1e-5 && center.y.abs() < 1e-5);
    }
}
