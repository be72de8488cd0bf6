//! Culling: frustum planes from a view-projection matrix, and the AABB test
//! that turns a candidate list into a visible index list.
//!
//! # Invariants
//! - Plane normals point inward and are unit length, or the plane is the
//!   never-culling placeholder.
//! - The visibility test is conservative: anything touching the frustum is kept.
//! - Neither stage allocates after construction.

mod frustum;
mod visibility;

pub use frustum::{
    DEGENERATE_EPSILON, Frustum, FrustumExtractor, PLANE_COUNT, PLANE_FLOATS, Plane, PlaneSide,
    extract_planes,
};
pub use visibility::{FilterStats, VisibilityFilter, aabb_visible};

pub fn crate_info() -> &'static str {
    "strata-cull v0.1.0"
}
