use bytemuck::Pod;
use strata_common::{SchedError, SchedulerConfig, try_with_capacity};

/// Receives the bulk upload of one frame's uniform region.
pub trait UniformSink {
    fn write_uniforms(&mut self, offset: u64, bytes: &[u8]);
}

/// Slice of the ring handed to one allocation. `offset` is absolute within
/// the ring, which is what dynamic offsets are measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformRegion {
    pub offset: u32,
    pub size: u32,
}

impl UniformRegion {
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }
}

/// Round `value` up to a power-of-two `alignment`.
#[inline]
pub fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

#[derive(Debug)]
pub struct DynamicUniformAllocator {
    staging: Vec<u8>,
    region_size: usize,
    frames_in_flight: usize,
    alignment: usize,
    slot: usize,
    cursor: usize,
    exhausted: usize,
    frame: u64,
}

impl DynamicUniformAllocator {
    /// `region_size` is rounded down to `alignment`.
    pub fn new(
        frames_in_flight: usize,
        region_size: usize,
        alignment: usize,
    ) -> Result<Self, SchedError> {
        if frames_in_flight < 2 {
            return Err(SchedError::InvalidConfig(format!(
                "uniform ring needs at least 2 frames in flight, got {frames_in_flight}"
            )));
        }
        if !alignment.is_power_of_two() {
            return Err(SchedError::InvalidConfig(format!(
                "uniform alignment {alignment} is not a power of two"
            )));
        }
        let region_size = region_size & !(alignment - 1);
        if region_size == 0 {
            return Err(SchedError::InvalidConfig(
                "uniform region smaller than one aligned slot".into(),
            ));
        }
        let total = region_size
            .checked_mul(frames_in_flight)
            .filter(|t| *t <= u32::MAX as usize)
            .ok_or_else(|| SchedError::InvalidConfig("uniform ring exceeds u32 offsets".into()))?;

        let mut staging = try_with_capacity(total, "uniform staging")?;
        staging.resize(total, 0);

        Ok(Self {
            staging,
            region_size,
            frames_in_flight,
            alignment,
            slot: 0,
            cursor: 0,
            exhausted: 0,
            frame: 0,
        })
    }

    pub fn from_config(config: &SchedulerConfig) -> Result<Self, SchedError> {
        Self::new(
            config.frames_in_flight,
            config.uniform_region_size(),
            config.uniform_alignment,
        )
    }

    /// Rotate to the next region and reset the cursor.
    pub fn begin_frame(&mut self) {
        self.slot = (self.slot + 1) % self.frames_in_flight;
        self.cursor = 0;
        self.exhausted = 0;
        self.frame += 1;
    }

    /// Reserve `size` bytes. Returns `None` and counts the miss when the
    /// region is full; nothing already handed out is disturbed.
    pub fn allocate(&mut self, size: usize) -> Option<UniformRegion> {
        let reserved = align_up(size.max(1), self.alignment);
        if reserved > self.region_size - self.cursor {
            self.exhausted += 1;
            tracing::trace!(
                requested = reserved,
                remaining = self.region_size - self.cursor,
                slot = self.slot,
                "uniform region exhausted"
            );
            return None;
        }
        let offset = self.region_base() + self.cursor;
        self.cursor += reserved;
        Some(UniformRegion {
            offset: offset as u32,
            size: size as u32,
        })
    }

    /// Copy `bytes` into staging at `region`. Excess bytes are ignored.
    pub fn write(&mut self, region: UniformRegion, bytes: &[u8]) {
        debug_assert!(bytes.len() <= region.size as usize);
        let len = bytes.len().min(region.size as usize);
        let start = region.offset as usize;
        self.staging[start..start + len].copy_from_slice(&bytes[..len]);
    }

    pub fn push<T: Pod>(&mut self, value: &T) -> Option<UniformRegion> {
        self.push_bytes(bytemuck::bytes_of(value))
    }

    pub fn push_slice<T: Pod>(&mut self, values: &[T]) -> Option<UniformRegion> {
        self.push_bytes(bytemuck::cast_slice(values))
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> Option<UniformRegion> {
        let region = self.allocate(bytes.len())?;
        self.write(region, bytes);
        Some(region)
    }

    /// Upload everything written this frame in a single call. Returns the byte count.
    pub fn flush<S: UniformSink + ?Sized>(&self, sink: &mut S) -> usize {
        if self.cursor == 0 {
            return 0;
        }
        let base = self.region_base();
        sink.write_uniforms(base as u64, &self.staging[base..base + self.cursor]);
        self.cursor
    }

    pub fn region_base(&self) -> usize {
        self.slot * self.region_size
    }

    pub fn used(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.region_size - self.cursor
    }

    pub fn region_size(&self) -> usize {
        self.region_size
    }

    /// Size of the whole ring; the backend buffer must be at least this big.
    pub fn ring_size(&self) -> usize {
        self.staging.len()
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn frame_slot(&self) -> usize {
        self.slot
    }

    /// Failed allocations since `begin_frame`.
    pub fn exhausted(&self) -> usize {
        self.exhausted
    }

    /// Staged bytes for `region`, for inspection.
    pub fn staged(&self, region: UniformRegion) -> &[u8] {
        let start = region.offset as usize;
        &self.staging[start..start + region.size as usize]
    }
}
