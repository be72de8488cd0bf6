//! Submission: the seam between sorted draw commands and a GPU backend.
//!
//! # Invariants
//! - After each command the cache equals what that command needed bound.
//! - Pipeline binds equal the number of runs of equal pipeline id.
//! - The scheduler never creates backend resources; it only names them.
//!
//! Two backends implement [`RenderBackend`]: [`RecordingBackend`] here, and
//! the wgpu backend in `strata-render-wgpu`. Both are used through generics,
//! so the per-draw calls are statically dispatched.

mod backend;
mod bindings;
mod recorder;
mod state_cache;

pub use backend::{
    BackendError, ColorAttachment, DepthAttachment, LoadOp, PassDescriptor, RenderBackend,
};
pub use bindings::{BindingTable, GeometryBinding};
pub use recorder::{BackendCall, RecordingBackend};
pub use state_cache::{
    BindingState, MATERIAL_SLOT, OBJECT_SLOT, StateCache, SubmitCounters, SubmitReport, VIEW_SLOT,
};

pub fn crate_info() -> &'static str {
    "strata-submit v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("submit"));
    }
}
