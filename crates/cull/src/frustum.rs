use glam::{Mat4, Vec3, Vec4};
use strata_common::ClipDepth;

pub const PLANE_COUNT: usize = 6;
/// Floats in the packed plane buffer: `(nx, ny, nz, d)` per plane.
pub const PLANE_FLOATS: usize = PLANE_COUNT * 4;
/// Normal length below which a plane is considered degenerate.
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// Plane order in the packed buffer and in `Frustum::planes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    Left = 0,
    Right = 1,
    Bottom = 2,
    Top = 3,
    Near = 4,
    Far = 5,
}

impl PlaneSide {
    pub const ALL: [PlaneSide; PLANE_COUNT] = [
        PlaneSide::Left,
        PlaneSide::Right,
        PlaneSide::Bottom,
        PlaneSide::Top,
        PlaneSide::Near,
        PlaneSide::Far,
    ];
}

/// Half-space `dot(normal, p) + distance >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    /// Satisfied by every point; stands in for a degenerate plane.
    pub const ALWAYS_INSIDE: Plane = Plane {
        normal: Vec3::ZERO,
        distance: 1.0,
    };

    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Six inward-facing planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Plane; PLANE_COUNT],
}

impl Frustum {
    /// Unpack planes written by [`extract_planes`].
    pub fn from_packed(packed: &[f32; PLANE_FLOATS]) -> Self {
        let mut planes = [Plane::ALWAYS_INSIDE; PLANE_COUNT];
        for (i, plane) in planes.iter_mut().enumerate() {
            let p = &packed[i * 4..i * 4 + 4];
            *plane = Plane {
                normal: Vec3::new(p[0], p[1], p[2]),
                distance: p[3],
            };
        }
        Self { planes }
    }

    /// Extract directly, discarding the degenerate mask.
    pub fn from_view_projection(view_proj: &Mat4, clip_depth: ClipDepth) -> Self {
        let mut packed = [0.0; PLANE_FLOATS];
        extract_planes(view_proj, clip_depth, &mut packed);
        Self::from_packed(&packed)
    }

    pub fn planes(&self) -> &[Plane; PLANE_COUNT] {
        &self.planes
    }

    pub fn plane(&self, side: PlaneSide) -> &Plane {
        &self.planes[side as usize]
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| p.signed_distance(point) >= 0.0)
    }
}

/// Write the six planes of `view_proj` into `out` and return a bitmask of
/// planes that were degenerate (bit `i` set for `PlaneSide::ALL[i]`).
///
/// `view_proj` is column-major, so row `i` is `(x_axis[i], y_axis[i], z_axis[i], w_axis[i])`.
pub fn extract_planes(view_proj: &Mat4, clip_depth: ClipDepth, out: &mut [f32; PLANE_FLOATS]) -> u8 {
    let r0 = view_proj.row(0);
    let r1 = view_proj.row(1);
    let r2 = view_proj.row(2);
    let r3 = view_proj.row(3);

    let near = match clip_depth {
        ClipDepth::NegativeOneToOne => r3 + r2,
        ClipDepth::ZeroToOne => r2,
    };
    let raw: [Vec4; PLANE_COUNT] = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, near, r3 - r2];

    let mut degenerate = 0u8;
    for (i, plane) in raw.iter().enumerate() {
        let len = plane.truncate().length();
        let normalized = if len.is_finite() && len > DEGENERATE_EPSILON {
            *plane / len
        } else {
            degenerate |= 1 << i;
            let p = Plane::ALWAYS_INSIDE;
            Vec4::new(p.normal.x, p.normal.y, p.normal.z, p.distance)
        };
        out[i * 4..i * 4 + 4].copy_from_slice(&normalized.to_array());
    }
    degenerate
}

/// Owns the packed plane buffer so extraction never touches the heap.
#[derive(Debug, Clone)]
pub struct FrustumExtractor {
    clip_depth: ClipDepth,
    packed: [f32; PLANE_FLOATS],
    degenerate: u8,
}

impl FrustumExtractor {
    pub fn new(clip_depth: ClipDepth) -> Self {
        Self {
            clip_depth,
            packed: [0.0; PLANE_FLOATS],
            degenerate: 0,
        }
    }

    /// Extract planes for `view_proj`. Degenerate planes are replaced by
    /// [`Plane::ALWAYS_INSIDE`] and reported through [`Self::degenerate_mask`].
    pub fn extract(&mut self, view_proj: &Mat4) -> Frustum {
        self.degenerate = extract_planes(view_proj, self.clip_depth, &mut self.packed);
        if self.degenerate != 0 {
            tracing::trace!(mask = self.degenerate, "degenerate frustum planes");
        }
        Frustum::from_packed(&self.packed)
    }

    pub fn packed(&self) -> &[f32; PLANE_FLOATS] {
        &self.packed
    }

    pub fn degenerate_mask(&self) -> u8 {
        self.degenerate
    }

    pub fn degenerate_count(&self) -> u32 {
        self.degenerate.count_ones()
    }

    pub fn clip_depth(&self) -> ClipDepth {
        self.clip_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_looking_down_z(far: f32) -> Mat4 {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::Z, Vec3::Y);
        let proj = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, far);
        proj * view
    }

    #[test]
    fn identity_gives_unit_cube() {
        let f = Frustum::from_view_projection(&Mat4::IDENTITY, ClipDepth::NegativeOneToOne);
        let left = f.plane(PlaneSide::Left);
        assert_eq!(left.normal, Vec3::X);
        assert!((left.distance - 1.0).abs() < 1e-6);
        let far = f.plane(PlaneSide::Far);
        assert_eq!(far.normal, -Vec3::Z);
        assert!(f.contains_point(Vec3::ZERO));
        assert!(!f.contains_point(Vec3::new(1.5, 0.0, 0.0)));
    }

    #[test]
    fn planes_are_normalized_and_inward() {
        let vp = camera_looking_down_z(200.0);
        let f = Frustum::from_view_projection(&vp, ClipDepth::NegativeOneToOne);
        for p in f.planes() {
            assert!((p.normal.length() - 1.0).abs() < 1e-4);
        }
        // A point straight ahead is inside every plane.
        assert!(f.contains_point(Vec3::new(0.0, 0.0, 50.0)));
        assert!(!f.contains_point(Vec3::new(0.0, 0.0, -5.0)));
        assert!(!f.contains_point(Vec3::new(0.0, 0.0, 250.0)));
    }

    #[test]
    fn far_plane_sits_at_far_distance() {
        let vp = camera_looking_down_z(200.0);
        let f = Frustum::from_view_projection(&vp, ClipDepth::NegativeOneToOne);
        let far = f.plane(PlaneSide::Far);
        assert!(far.signed_distance(Vec3::new(0.0, 0.0, 199.0)) > 0.0);
        assert!(far.signed_distance(Vec3::new(0.0, 0.0, 201.0)) < 0.0);
    }

    #[test]
    fn zero_to_one_near_plane_uses_row2() {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::Z, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 1.0, 100.0);
        let f = Frustum::from_view_projection(&(proj * view), ClipDepth::ZeroToOne);
        let near = f.plane(PlaneSide::Near);
        assert!(near.signed_distance(Vec3::new(0.0, 0.0, 0.5)) < 0.0);
        assert!(near.signed_distance(Vec3::new(0.0, 0.0, 1.5)) > 0.0);
    }

    #[test]
    fn singular_matrix_degrades_to_non_culling() {
        let mut extractor = FrustumExtractor::new(ClipDepth::NegativeOneToOne);
        let f = extractor.extract(&Mat4::ZERO);
        assert_eq!(extractor.degenerate_mask(), 0b11_1111);
        assert_eq!(extractor.degenerate_count(), 6);
        for p in f.planes() {
            assert_eq!(*p, Plane::ALWAYS_INSIDE);
        }
        assert!(f.contains_point(Vec3::splat(1.0e9)));
    }

    #[test]
    fn nan_matrix_never_produces_nan_planes() {
        let mut extractor = FrustumExtractor::new(ClipDepth::NegativeOneToOne);
        let f = extractor.extract(&Mat4::from_cols_array(&[f32::NAN; 16]));
        assert_eq!(extractor.degenerate_count(), 6);
        assert!(f.planes().iter().all(|p| !p.distance.is_nan()));
    }

    #[test]
    fn packed_buffer_round_trips_through_frustum() {
        let mut extractor = FrustumExtractor::new(ClipDepth::NegativeOneToOne);
        let f = extractor.extract(&camera_looking_down_z(50.0));
        assert_eq!(Frustum::from_packed(extractor.packed()), f);
        assert_eq!(extractor.degenerate_mask(), 0);
    }
}
