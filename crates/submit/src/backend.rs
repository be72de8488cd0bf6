use strata_common::{BindGroupHandle, BufferHandle, PassKind, PipelineId, TargetId};
use strata_uniforms::UniformSink;

/// Failures a backend reports while opening or finishing passes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("render target {0:?} is not allocated")]
    MissingTarget(TargetId),

    #[error("pass '{0}' begun while another pass is open")]
    PassAlreadyOpen(&'static str),

    /// The device rejected the frame's work.
    #[error("device error: {0}")]
    Device(String),
}

/// How an attachment starts the pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp<T> {
    Load,
    Clear(T),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachment {
    pub target: TargetId,
    pub load: LoadOp<[f32; 4]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthAttachment {
    pub target: TargetId,
    pub load: LoadOp<f32>,
}

/// Everything a backend needs to open a pass. Up to two colour targets
/// covers accumulation plus revealage for the transparent pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassDescriptor {
    pub label: &'static str,
    pub kind: PassKind,
    pub color: [Option<ColorAttachment>; 2],
    pub depth: Option<DepthAttachment>,
}

impl PassDescriptor {
    pub fn depth_only(label: &'static str, kind: PassKind, depth: DepthAttachment) -> Self {
        Self {
            label,
            kind,
            color: [None, None],
            depth: Some(depth),
        }
    }

    pub fn color(label: &'static str, kind: PassKind, color: ColorAttachment) -> Self {
        Self {
            label,
            kind,
            color: [Some(color), None],
            depth: None,
        }
    }

    pub fn with_depth(mut self, depth: DepthAttachment) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Every target the pass touches.
    pub fn targets(&self) -> impl Iterator<Item = TargetId> + '_ {
        self.color
            .iter()
            .flatten()
            .map(|c| c.target)
            .chain(self.depth.iter().map(|d| d.target))
    }
}

/// Primitive operations the scheduler drives. Handles are opaque tokens the
/// application registered with the backend beforehand.
pub trait RenderBackend: UniformSink {
    fn begin_pass(&mut self, pass: &PassDescriptor) -> Result<(), BackendError>;

    fn end_pass(&mut self);

    fn bind_pipeline(&mut self, pipeline: PipelineId);

    fn bind_group(&mut self, slot: u32, group: BindGroupHandle, dynamic_offset: Option<u32>);

    fn bind_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle);

    fn bind_index_buffer(&mut self, buffer: BufferHandle);

    fn draw(&mut self, vertex_count: u32, instance_count: u32);

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32);

    /// Submit the frame's recorded work.
    fn finish_frame(&mut self) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_lists_color_then_depth() {
        let pass = PassDescriptor {
            label: "accum",
            kind: PassKind::Transparent,
            color: [
                Some(ColorAttachment {
                    target: TargetId(3),
                    load: LoadOp::Clear([0.0; 4]),
                }),
                Some(ColorAttachment {
                    target: TargetId(4),
                    load: LoadOp::Clear([1.0; 4]),
                }),
            ],
            depth: Some(DepthAttachment {
                target: TargetId(1),
                load: LoadOp::Load,
            }),
        };
        let targets: Vec<TargetId> = pass.targets().collect();
        assert_eq!(targets, [TargetId(3), TargetId(4), TargetId(1)]);
    }

    #[test]
    fn depth_only_has_no_color() {
        let pass = PassDescriptor::depth_only(
            "shadow",
            PassKind::Shadow,
            DepthAttachment {
                target: TargetId(9),
                load: LoadOp::Clear(1.0),
            },
        );
        assert!(pass.color.iter().all(Option::is_none));
        assert_eq!(pass.targets().count(), 1);
    }
}
