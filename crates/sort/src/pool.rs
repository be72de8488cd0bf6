use strata_common::{
    BoneRange, Candidate, GeometryId, MaterialId, PipelineId, SchedError, TransformRef,
    try_with_capacity,
};

use crate::key::RenderKey;

/// One visible drawable for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrawCommand {
    pub key: RenderKey,
    pub pipeline: PipelineId,
    pub material: MaterialId,
    pub geometry: GeometryId,
    pub transform: TransformRef,
    pub bones: Option<BoneRange>,
    pub transparent: bool,
    pub is_static: bool,
    /// Index of the originating candidate; the final tie-breaker.
    pub source: u32,
    /// Dynamic offset of this draw's object uniforms, set after sorting.
    pub object_offset: u32,
}

impl DrawCommand {
    pub fn from_candidate(source: u32, candidate: &Candidate, key: RenderKey) -> Self {
        Self {
            key,
            pipeline: candidate.pipeline,
            material: candidate.material,
            geometry: candidate.geometry,
            transform: candidate.transform,
            bones: candidate.bones,
            transparent: candidate.transparent,
            is_static: candidate.is_static,
            source,
            object_offset: 0,
        }
    }
}

/// Fixed-capacity command storage, cleared and refilled every frame.
#[derive(Debug)]
pub struct CommandPool {
    name: &'static str,
    commands: Vec<DrawCommand>,
    capacity: usize,
    dropped: usize,
}

impl CommandPool {
    pub fn with_capacity(name: &'static str, capacity: usize) -> Result<Self, SchedError> {
        Ok(Self {
            name,
            commands: try_with_capacity(capacity, name)?,
            capacity,
            dropped: 0,
        })
    }

    /// Append a command. A full pool rejects it and counts the drop, so the
    /// survivors are always the first `capacity` pushes.
    pub fn push(&mut self, command: DrawCommand) -> Result<(), SchedError> {
        if self.commands.len() >= self.capacity {
            self.dropped += 1;
            return Err(SchedError::CapacityExceeded {
                what: self.name,
                capacity: self.capacity,
                requested: self.commands.len() + self.dropped,
            });
        }
        self.commands.push(command);
        Ok(())
    }

    /// Append as many of `commands` as fit; returns how many were taken.
    pub fn extend_from_slice(&mut self, commands: &[DrawCommand]) -> usize {
        let room = self.capacity - self.commands.len();
        let taken = commands.len().min(room);
        self.commands.extend_from_slice(&commands[..taken]);
        self.dropped += commands.len() - taken;
        taken
    }

    /// Keep only commands for which `f` returns true, in order.
    pub fn retain_mut<F>(&mut self, f: F)
    where
        F: FnMut(&mut DrawCommand) -> bool,
    {
        self.commands.retain_mut(f);
    }

    /// Drop every command but keep the overflow count.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Logical clear; the backing storage stays.
    pub fn reset(&mut self) {
        self.commands.clear();
        self.dropped = 0;
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pushes rejected since the last reset.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn as_slice(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn as_mut_slice(&mut self) -> &mut [DrawCommand] {
        &mut self.commands
    }
}
