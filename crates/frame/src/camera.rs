use glam::{Mat4, Vec3};
use strata_common::{ClipDepth, TargetId};

/// Matrices and depth bounds the scheduler consumes for one view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
}

impl CameraView {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Distance in front of the camera along its view direction.
    #[inline]
    pub fn depth_of(&self, point: Vec3) -> f32 {
        -self.view.transform_point3(point).z
    }
}

/// One light-space slice, computed outside the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCascade {
    pub view: Mat4,
    pub projection: Mat4,
    pub near: f32,
    pub far: f32,
    /// Depth target the cascade renders into.
    pub target: TargetId,
}

impl ShadowCascade {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    #[inline]
    pub fn depth_of(&self, point: Vec3) -> f32 {
        -self.view.transform_point3(point).z
    }

    /// Orthographic slice looking along `light_dir` that encloses a sphere.
    pub fn orthographic_fit(
        light_dir: Vec3,
        center: Vec3,
        radius: f32,
        clip_depth: ClipDepth,
        target: TargetId,
    ) -> Self {
        let dir = light_dir.normalize_or(Vec3::NEG_Y);
        let up = if dir.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
        let eye = center - dir * radius * 2.0;
        let view = Mat4::look_at_rh(eye, center, up);
        let (near, far) = (0.0, radius * 4.0);
        let projection = match clip_depth {
            ClipDepth::NegativeOneToOne => {
                Mat4::orthographic_rh_gl(-radius, radius, -radius, radius, near, far)
            }
            ClipDepth::ZeroToOne => {
                Mat4::orthographic_rh(-radius, radius, -radius, radius, near, far)
            }
        };
        Self {
            view,
            projection,
            near,
            far,
            target,
        }
    }
}

/// Fly camera with position, yaw, pitch and projection parameters.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub clip_depth: ClipDepth,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 10.0, 15.0),
            yaw: -90.0_f32.to_radians(),
            pitch: -30.0_f32.to_radians(),
            fov: 60.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            clip_depth: ClipDepth::default(),
        }
    }
}

impl Camera {
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    /// Place the camera at `position` facing `target`.
    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        let d = (target - position).normalize_or(Vec3::NEG_Z);
        self.pitch = d.y.clamp(-1.0, 1.0).asin();
        self.yaw = d.z.atan2(d.x);
    }

    /// Circle `center` at `radius` and `height`; `t` is the angle in radians.
    pub fn orbit(&mut self, center: Vec3, radius: f32, height: f32, t: f32) {
        let position = center + Vec3::new(t.cos() * radius, height, t.sin() * radius);
        self.look_at(position, center);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.clip_depth {
            ClipDepth::NegativeOneToOne => {
                Mat4::perspective_rh_gl(self.fov, self.aspect, self.near, self.far)
            }
            ClipDepth::ZeroToOne => Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn to_view(&self) -> CameraView {
        CameraView {
            view: self.view_matrix(),
            projection: self.projection_matrix(),
            position: self.position,
            near: self.near,
            far: self.far,
        }
    }
}
