//! Dynamic uniforms: a CPU staging ring split into one region per frame in
//! flight, handing out aligned offsets for per-draw and per-pass data.
//!
//! # Invariants
//! - Offsets within a frame are aligned, strictly increasing and disjoint.
//! - A region is rewritten only after `frames_in_flight - 1` other frames.
//! - `allocate` never touches the heap.

mod payload;
mod ring;

pub use payload::{ObjectUniforms, ViewUniforms};
pub use ring::{DynamicUniformAllocator, UniformRegion, UniformSink, align_up};

pub fn crate_info() -> &'static str {
    "strata-uniforms v0.1.0"
}
