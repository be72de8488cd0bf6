use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SchedError;

/// Clip-space depth convention of the projection matrices handed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipDepth {
    /// OpenGL style, `-w <= z <= w`. Near plane is `row3 + row2`.
    #[default]
    NegativeOneToOne,
    /// wgpu / D3D style, `0 <= z <= w`. Near plane is `row2`.
    ZeroToOne,
}

/// What to do with a draw that references an id the binding table lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownIdPolicy {
    /// Programmer error: panic with the offending id.
    Panic,
    /// Drop the draw, warn, keep rendering.
    Skip,
}

impl Default for UnknownIdPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            UnknownIdPolicy::Panic
        } else {
            UnknownIdPolicy::Skip
        }
    }
}

/// Capacities and policies fixed at scheduler construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Size of the visibility output array.
    pub max_candidates: usize,
    /// Command pool capacity, per list (shadow, opaque, transparent).
    pub max_draws_per_pass: usize,
    /// Ring regions; the CPU never writes a region fewer than this many frames old.
    pub frames_in_flight: usize,
    /// Dynamic uniform offset granularity in bytes.
    pub uniform_alignment: usize,
    /// Bytes in one ring region.
    pub uniform_bytes_per_frame: usize,
    /// Replay sorted static commands while scene and camera are unchanged.
    pub static_cache: bool,
    pub unknown_id_policy: UnknownIdPolicy,
    pub clip_depth: ClipDepth,
    /// Cascades beyond this count are dropped with a warning.
    pub shadow_cascades_max: usize,
    /// Frames between repeats of the same recovered-condition warning.
    pub warn_interval_frames: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_candidates: 4096,
            max_draws_per_pass: 4096,
            frames_in_flight: 3,
            uniform_alignment: 256,
            uniform_bytes_per_frame: 1 << 20,
            static_cache: false,
            unknown_id_policy: UnknownIdPolicy::default(),
            clip_depth: ClipDepth::default(),
            shadow_cascades_max: 4,
            warn_interval_frames: 256,
        }
    }
}

impl SchedulerConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, SchedError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self, SchedError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` file, or YAML for any other extension.
    pub fn load(path: &Path) -> Result<Self, SchedError> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    pub fn validate(&self) -> Result<(), SchedError> {
        let invalid = |msg: String| Err(SchedError::InvalidConfig(msg));

        if self.frames_in_flight < 2 {
            return invalid(format!(
                "frames_in_flight must be at least 2, got {}",
                self.frames_in_flight
            ));
        }
        if !self.uniform_alignment.is_power_of_two() || self.uniform_alignment < 16 {
            return invalid(format!(
                "uniform_alignment must be a power of two >= 16, got {}",
                self.uniform_alignment
            ));
        }
        if self.max_candidates == 0 || self.max_draws_per_pass == 0 {
            return invalid("capacities must be non-zero".into());
        }
        if self.max_draws_per_pass > u32::MAX as usize || self.max_candidates > u32::MAX as usize
        {
            return invalid("capacities must fit in u32".into());
        }
        if self.uniform_bytes_per_frame < self.uniform_alignment {
            return invalid(format!(
                "uniform_bytes_per_frame ({}) smaller than one aligned slot ({})",
                self.uniform_bytes_per_frame, self.uniform_alignment
            ));
        }
        let ring = (self.uniform_bytes_per_frame as u64) * (self.frames_in_flight as u64);
        if ring > u32::MAX as u64 {
            return invalid(format!("uniform ring of {ring} bytes exceeds u32 offsets"));
        }
        if self.warn_interval_frames == 0 {
            return invalid("warn_interval_frames must be non-zero".into());
        }
        Ok(())
    }

    /// Per-frame ring region rounded down to the alignment.
    pub fn uniform_region_size(&self) -> usize {
        self.uniform_bytes_per_frame & !(self.uniform_alignment - 1)
    }
}
