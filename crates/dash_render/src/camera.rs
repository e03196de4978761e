use glam::Mat4;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Fixed screen-space camera: world units are logical window pixels with the
/// origin at the top-left and y pointing down. The logical size stays constant
/// when the physical surface is scaled (HiDPI), so gameplay never rescales.
pub struct ScreenCamera {
    pub logical_size: (f32, f32),
}

impl ScreenCamera {
    pub fn new(logical_width: u32, logical_height: u32) -> Self {
        Self {
            logical_size: (logical_width as f32, logical_height as f32),
        }
    }

    pub fn build_uniform(&self) -> CameraUniform {
        let (w, h) = self.logical_size;
        // bottom = h, top = 0 flips y so row 0 of the tile map is at the top.
        let proj = Mat4::orthographic_rh(0.0, w, h, 0.0, -1.0, 1.0);
        CameraUniform {
            view_proj: proj.to_cols_array_2d(),
        }
    }
}
