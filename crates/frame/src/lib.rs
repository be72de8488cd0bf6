//! Frame orchestration: runs cull, key, sort, uniform allocation and
//! submission for every pass of a frame, in a fixed order.
//!
//! # Invariants
//! - Passes run shadow cascades, opaque, transparent, then post-process.
//! - A frame always completes. Overflow, unknown ids, degenerate cameras and
//!   missing targets are counted in [`FrameStats`] and logged, never returned.
//! - With the static cache on, submitted order equals a full rebuild.

mod cache;
mod camera;
mod pipeline;
mod post;
mod scene;
mod stats;
mod throttle;

pub use cache::{CacheKey, StaticCommandCache, StaticTally};
pub use camera::{Camera, CameraView, ShadowCascade};
pub use pipeline::{FramePipeline, FrameTargets};
pub use post::{FullscreenPass, PostChain, PostResources, PostStage};
pub use scene::{ProceduralSpec, SceneSource, StaticScene, transform_aabb, unit_cube};
pub use stats::{FrameStats, FrameTimer};

pub fn crate_info() -> &'static str {
    "strata-frame v0.1.0"
}
