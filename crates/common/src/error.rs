use crate::types::{GeometryId, MaterialId, PipelineId};

/// Everything that can go wrong inside the scheduler.
///
/// Only `InvalidConfig`, `Allocation` and the parse/IO variants ever reach a
/// caller, and only from constructors. The rest are recovered where they are
/// detected and surface through logs and frame stats.
#[derive(Debug, thiserror::Error)]
pub enum SchedError {
    #[error("capacity exceeded for {what}: capacity {capacity}, requested {requested}")]
    CapacityExceeded {
        what: &'static str,
        capacity: usize,
        requested: usize,
    },

    #[error("degenerate frustum plane {plane}")]
    DegenerateFrustum { plane: usize },

    #[error("unknown pipeline {0:?}")]
    UnknownPipeline(PipelineId),

    #[error("unknown material {0:?}")]
    UnknownMaterial(MaterialId),

    #[error("unknown geometry {0:?}")]
    UnknownGeometry(GeometryId),

    #[error("uniform ring exhausted: requested {requested} bytes, {available} available")]
    RingBufferExhausted { requested: usize, available: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to reserve {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchedError {
    /// True for the kinds that are handled in place during a frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SchedError::CapacityExceeded { .. }
                | SchedError::DegenerateFrustum { .. }
                | SchedError::UnknownPipeline(_)
                | SchedError::UnknownMaterial(_)
                | SchedError::UnknownGeometry(_)
                | SchedError::RingBufferExhausted { .. }
        )
    }
}

/// Allocate an empty vector with room for exactly `capacity` elements,
/// reporting failure instead of aborting.
pub fn try_with_capacity<T>(capacity: usize, what: &'static str) -> Result<Vec<T>, SchedError> {
    let mut v = Vec::new();
    v.try_reserve_exact(capacity)
        .map_err(|_| SchedError::Allocation {
            what,
            bytes: capacity.saturating_mul(std::mem::size_of::<T>()),
        })?;
    Ok(v)
}
