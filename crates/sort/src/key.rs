use strata_common::{Layer, MaterialId, PassKind, PipelineId};

const LAYER_SHIFT: u32 = 62;
const PASS_SHIFT: u32 = 60;
const TRANSPARENT_SHIFT: u32 = 59;

// Opaque layout: pipeline, material, then depth in the low 32 bits.
const OPAQUE_PIPELINE_SHIFT: u32 = 48;
const OPAQUE_MATERIAL_SHIFT: u32 = 32;
const OPAQUE_DEPTH_SHIFT: u32 = 0;

// Transparent layout: depth directly under the flag, state below it.
const TRANSPARENT_DEPTH_SHIFT: u32 = 27;
const TRANSPARENT_PIPELINE_SHIFT: u32 = 16;
const TRANSPARENT_MATERIAL_SHIFT: u32 = 0;

const PIPELINE_MASK: u64 = (1 << 11) - 1;
const MATERIAL_MASK: u64 = (1 << 16) - 1;
const DEPTH_MASK: u64 = (1 << 32) - 1;

/// Packed 64-bit draw order. Ascending integer order is draw order.
///
/// ```text
/// opaque:      | layer:2 | pass:2 | 0 | pipeline:11 | material:16 | depth:32   |
/// transparent: | layer:2 | pass:2 | 1 | inv depth:32 | pipeline:11 | material:16 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RenderKey(pub u64);

impl RenderKey {
    pub fn layer(self) -> u8 {
        (self.0 >> LAYER_SHIFT) as u8 & 0b11
    }

    pub fn pass(self) -> u8 {
        (self.0 >> PASS_SHIFT) as u8 & 0b11
    }

    pub fn is_transparent(self) -> bool {
        (self.0 >> TRANSPARENT_SHIFT) & 1 == 1
    }

    pub fn pipeline(self) -> PipelineId {
        let shift = if self.is_transparent() {
            TRANSPARENT_PIPELINE_SHIFT
        } else {
            OPAQUE_PIPELINE_SHIFT
        };
        PipelineId(((self.0 >> shift) & PIPELINE_MASK) as u16)
    }

    pub fn material(self) -> MaterialId {
        let shift = if self.is_transparent() {
            TRANSPARENT_MATERIAL_SHIFT
        } else {
            OPAQUE_MATERIAL_SHIFT
        };
        MaterialId(((self.0 >> shift) & MATERIAL_MASK) as u16)
    }

    /// Quantized depth field as stored (already inverted for transparent keys).
    pub fn depth_bits(self) -> u32 {
        let shift = if self.is_transparent() {
            TRANSPARENT_DEPTH_SHIFT
        } else {
            OPAQUE_DEPTH_SHIFT
        };
        ((self.0 >> shift) & DEPTH_MASK) as u32
    }
}

/// View-space depth bounds used to normalize depth before quantization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthRange {
    pub near: f32,
    pub far: f32,
}

impl DepthRange {
    pub fn new(near: f32, far: f32) -> Self {
        Self { near, far }
    }
}

/// Per-command inputs to the encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyInput {
    pub layer: Layer,
    pub pass: PassKind,
    pub transparent: bool,
    pub pipeline: PipelineId,
    pub material: MaterialId,
    /// View-space distance along the view direction.
    pub depth: f32,
}

/// Map `depth` into `[0, 1]` over `[near, far]`, optionally invert, and
/// scale to the full `u32` range (truncating).
pub fn quantize_depth(depth: f32, range: DepthRange, invert: bool) -> u32 {
    let span = range.far as f64 - range.near as f64;
    let mut t = if span > 0.0 {
        (depth as f64 - range.near as f64) / span
    } else {
        0.0
    };
    if !t.is_finite() {
        t = 0.0;
    }
    t = t.clamp(0.0, 1.0);
    if invert {
        t = 1.0 - t;
    }
    (t * u32::MAX as f64) as u32
}

/// Encodes keys for one pass and one depth range.
#[derive(Debug, Clone, Copy)]
pub struct KeyEncoder {
    range: DepthRange,
}

impl KeyEncoder {
    pub fn new(range: DepthRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> DepthRange {
        self.range
    }

    /// Pipeline ids above [`PipelineId::MAX`] are masked; callers reject them first.
    #[inline]
    pub fn encode(&self, input: &KeyInput) -> RenderKey {
        debug_assert!(input.pipeline.fits_key(), "pipeline id out of key range");

        let head = (input.layer.bits() << LAYER_SHIFT) | (input.pass.bits() << PASS_SHIFT);
        let pipeline = input.pipeline.0 as u64 & PIPELINE_MASK;
        let material = input.material.0 as u64 & MATERIAL_MASK;
        let depth = quantize_depth(input.depth, self.range, input.transparent) as u64;

        let body = if input.transparent {
            (1 << TRANSPARENT_SHIFT)
                | (depth << TRANSPARENT_DEPTH_SHIFT)
                | (pipeline << TRANSPARENT_PIPELINE_SHIFT)
                | (material << TRANSPARENT_MATERIAL_SHIFT)
        } else {
            (pipeline << OPAQUE_PIPELINE_SHIFT)
                | (material << OPAQUE_MATERIAL_SHIFT)
                | (depth << OPAQUE_DEPTH_SHIFT)
        };
        RenderKey(head | body)
    }
}
