//! Shared types for the strata frame scheduler.
//!
//! # Invariants
//! - Handles are plain indices. Nothing in the scheduler owns a GPU resource.
//! - Steady-state problems are `SchedError` values that get logged and
//!   counted; only construction paths return them to the caller.

mod config;
mod error;
mod types;

pub use config::{ClipDepth, SchedulerConfig, UnknownIdPolicy};
pub use error::{SchedError, try_with_capacity};
pub use types::{
    Aabb, BindGroupHandle, BoneRange, BufferHandle, Candidate, GeometryId, Layer, MaterialId,
    PassKind, PipelineId, TargetId, TransformRef,
};

pub fn crate_info() -> &'static str {
    "strata-common v0.1.0"
}
