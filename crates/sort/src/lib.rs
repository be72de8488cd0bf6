//! Draw ordering: render-key encoding, the fixed-capacity command pool and
//! the radix sorter that orders it.
//!
//! # Invariants
//! - Sorting is stable: equal keys keep insertion order.
//! - The sorter only moves commands; no field is rewritten.
//! - The pool never grows past the capacity it was built with.

mod key;
mod pool;
mod radix;

pub use key::{DepthRange, KeyEncoder, KeyInput, RenderKey, quantize_depth};
pub use pool::{CommandPool, DrawCommand};
pub use radix::{BUCKETS, DIGIT_BITS, PASSES, RadixSorter, SortKey};

pub fn crate_info() -> &'static str {
    "strata-sort v0.1.0"
}
