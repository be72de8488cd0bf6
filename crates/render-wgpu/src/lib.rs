//! wgpu implementation of the scheduler's render backend.
//!
//! [`WgpuBackend`] maps the opaque handles the scheduler emits onto wgpu
//! pipelines, bind groups, buffers and texture views. [`GpuDemo`] wires a
//! complete offscreen frame on top of it.
//!
//! # Invariants
//! - The backend never reorders or filters calls; it replays what the
//!   scheduler issued.
//! - Uniform writes for a frame are queued before that frame's submit.
//! - Calls naming an unregistered handle are ignored, not fatal.

mod backend;
mod demo;
mod headless;
mod mesh;
mod shaders;

pub use backend::WgpuBackend;
pub use demo::{
    DEMO_MATERIALS, GpuDemo, LIT_PIPELINE, SHADOW_MAP, SHADOW_PIPELINE, TRANSPARENT_PIPELINE,
    UNLIT_PIPELINE, demo_scene, lit_fraction, padded_bytes_per_row,
};
pub use headless::{GpuError, HeadlessContext};
pub use mesh::{Vertex, cube, cube_triangles};

pub fn crate_info() -> &'static str {
    "strata-render-wgpu v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render-wgpu"));
    }
}
