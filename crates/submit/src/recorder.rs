use strata_common::{BindGroupHandle, BufferHandle, PassKind, PipelineId, TargetId};
use strata_uniforms::UniformSink;

use crate::backend::{BackendError, PassDescriptor, RenderBackend};

/// One primitive call as seen by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCall {
    BeginPass {
        label: &'static str,
        kind: PassKind,
    },
    EndPass,
    BindPipeline(PipelineId),
    BindGroup {
        slot: u32,
        group: BindGroupHandle,
        offset: Option<u32>,
    },
    BindVertexBuffer {
        slot: u32,
        buffer: BufferHandle,
    },
    BindIndexBuffer(BufferHandle),
    Draw {
        vertices: u32,
        instances: u32,
    },
    DrawIndexed {
        indices: u32,
        instances: u32,
    },
    WriteUniforms {
        offset: u64,
        len: usize,
    },
    FinishFrame,
}

impl BackendCall {
    pub fn is_draw(&self) -> bool {
        matches!(self, BackendCall::Draw { .. } | BackendCall::DrawIndexed { .. })
    }
}

/// Headless backend that records every call. Used by tests, the CLI and
/// anywhere a frame needs to be inspected instead of rendered.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    missing_targets: Vec<TargetId>,
    uniforms: Vec<u8>,
    open_pass: Option<&'static str>,
    frames: u64,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `begin_pass` fail for any pass touching `target`.
    pub fn mark_target_missing(&mut self, target: TargetId) {
        if !self.missing_targets.contains(&target) {
            self.missing_targets.push(target);
        }
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Forget recorded calls; the uniform mirror is kept.
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn pipeline_binds(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::BindPipeline(_)))
    }

    pub fn draw_calls(&self) -> usize {
        self.count(BackendCall::is_draw)
    }

    pub fn count<F: Fn(&BackendCall) -> bool>(&self, f: F) -> usize {
        self.calls.iter().filter(|c| f(*c)).count()
    }

    /// Calls between the begin and end of the first pass labelled `label`.
    pub fn pass_calls(&self, label: &str) -> &[BackendCall] {
        let start = self
            .calls
            .iter()
            .position(|c| matches!(c, BackendCall::BeginPass { label: l, .. } if *l == label));
        let Some(start) = start else {
            return &[];
        };
        let len = self.calls[start..]
            .iter()
            .position(|c| *c == BackendCall::EndPass)
            .unwrap_or(self.calls.len() - start);
        &self.calls[start + 1..start + len]
    }

    /// Labels of every pass begun, in order.
    pub fn pass_labels(&self) -> Vec<&'static str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::BeginPass { label, .. } => Some(*label),
                _ => None,
            })
            .collect()
    }

    /// Bytes most recently uploaded at `offset`.
    pub fn uniform_bytes(&self, offset: u32, len: usize) -> &[u8] {
        let start = offset as usize;
        &self.uniforms[start..start + len]
    }
}

impl UniformSink for RecordingBackend {
    fn write_uniforms(&mut self, offset: u64, bytes: &[u8]) {
        let start = offset as usize;
        let end = start + bytes.len();
        if self.uniforms.len() < end {
            self.uniforms.resize(end, 0);
        }
        self.uniforms[start..end].copy_from_slice(bytes);
        self.calls.push(BackendCall::WriteUniforms {
            offset,
            len: bytes.len(),
        });
    }
}

impl RenderBackend for RecordingBackend {
    fn begin_pass(&mut self, pass: &PassDescriptor) -> Result<(), BackendError> {
        if self.open_pass.is_some() {
            return Err(BackendError::PassAlreadyOpen(pass.label));
        }
        if let Some(missing) = pass.targets().find(|t| self.missing_targets.contains(t)) {
            return Err(BackendError::MissingTarget(missing));
        }
        self.open_pass = Some(pass.label);
        self.calls.push(BackendCall::BeginPass {
            label: pass.label,
            kind: pass.kind,
        });
        Ok(())
    }

    fn end_pass(&mut self) {
        self.open_pass = None;
        self.calls.push(BackendCall::EndPass);
    }

    fn bind_pipeline(&mut self, pipeline: PipelineId) {
        self.calls.push(BackendCall::BindPipeline(pipeline));
    }

    fn bind_group(&mut self, slot: u32, group: BindGroupHandle, dynamic_offset: Option<u32>) {
        self.calls.push(BackendCall::BindGroup {
            slot,
            group,
            offset: dynamic_offset,
        });
    }

    fn bind_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle) {
        self.calls.push(BackendCall::BindVertexBuffer { slot, buffer });
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle) {
        self.calls.push(BackendCall::BindIndexBuffer(buffer));
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.calls.push(BackendCall::Draw {
            vertices: vertex_count,
            instances: instance_count,
        });
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        self.calls.push(BackendCall::DrawIndexed {
            indices: index_count,
            instances: instance_count,
        });
    }

    fn finish_frame(&mut self) -> Result<(), BackendError> {
        if let Some(label) = self.open_pass.take() {
            tracing::warn!(pass = label, "frame finished with a pass still open");
            self.calls.push(BackendCall::EndPass);
        }
        self.frames += 1;
        self.calls.push(BackendCall::FinishFrame);
        Ok(())
    }
}
