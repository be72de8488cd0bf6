use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Per-pass camera data bound at group 0.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ViewUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub near: f32,
    pub far: f32,
    pub _pad: [f32; 2],
}

impl ViewUniforms {
    pub fn new(view: Mat4, projection: Mat4, position: Vec3, near: f32, far: f32) -> Self {
        Self {
            view_proj: (projection * view).to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            camera_position: position.extend(1.0).to_array(),
            near,
            far,
            _pad: [0.0; 2],
        }
    }
}

/// Per-draw data bound at group 2 with a dynamic offset.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub world: [[f32; 4]; 4],
    pub palette_index: u32,
    /// Ring offset of this draw's bone matrices, zero when unskinned.
    pub bone_offset: u32,
    pub bone_count: u32,
    pub _pad: u32,
}

impl ObjectUniforms {
    pub fn new(world: Mat4, palette_index: u32) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            palette_index,
            bone_offset: 0,
            bone_count: 0,
            _pad: 0,
        }
    }

    pub fn with_bones(mut self, offset: u32, count: u32) -> Self {
        self.bone_offset = offset;
        self.bone_count = count;
        self
    }
}
