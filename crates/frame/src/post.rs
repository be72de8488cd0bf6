use strata_common::{BindGroupHandle, PipelineId, TargetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStage {
    /// Resolve transparent accumulation over the opaque image.
    Composite,
    BloomExtract,
    BloomDownsample,
    BloomUpsample,
    ToneMap,
    Resolve,
}

/// One fullscreen triangle draw into `target`, reading `input` at group 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullscreenPass {
    pub label: &'static str,
    pub stage: PostStage,
    pub pipeline: PipelineId,
    pub input: BindGroupHandle,
    pub target: TargetId,
}

/// Pipeline and input/output wiring for [`PostChain::standard`].
#[derive(Debug, Clone, Copy)]
pub struct PostResources {
    pub composite: (PipelineId, BindGroupHandle),
    pub bloom_extract: (PipelineId, BindGroupHandle),
    pub bloom_down: PipelineId,
    pub bloom_up: PipelineId,
    pub tone_map: (PipelineId, BindGroupHandle),
    pub resolve: (PipelineId, BindGroupHandle),
    pub scene_color: TargetId,
    pub ldr: TargetId,
    pub output: TargetId,
}

/// Fixed-order list of fullscreen passes run after the transparent pass.
#[derive(Debug, Clone, Default)]
pub struct PostChain {
    passes: Vec<FullscreenPass>,
}

const DOWN_LABELS: [&str; 6] = [
    "bloom_down_0",
    "bloom_down_1",
    "bloom_down_2",
    "bloom_down_3",
    "bloom_down_4",
    "bloom_down_5",
];
const UP_LABELS: [&str; 6] = [
    "bloom_up_0",
    "bloom_up_1",
    "bloom_up_2",
    "bloom_up_3",
    "bloom_up_4",
    "bloom_up_5",
];

impl PostChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pass: FullscreenPass) -> &mut Self {
        self.passes.push(pass);
        self
    }

    /// Composite, bloom extract, `mips` downsamples, `mips` upsamples,
    /// tone map, resolve.
    ///
    /// `bloom` holds one `(target, bind group reading it)` per mip level,
    /// largest first; `mips` is capped by its length and by six.
    pub fn standard(res: &PostResources, bloom: &[(TargetId, BindGroupHandle)], mips: usize) -> Self {
        let mips = mips.min(bloom.len().saturating_sub(1)).min(DOWN_LABELS.len());
        let mut chain = Self::new();

        chain.push(FullscreenPass {
            label: "composite",
            stage: PostStage::Composite,
            pipeline: res.composite.0,
            input: res.composite.1,
            target: res.scene_color,
        });

        if let Some(&(mip0, _)) = bloom.first() {
            chain.push(FullscreenPass {
                label: "bloom_extract",
                stage: PostStage::BloomExtract,
                pipeline: res.bloom_extract.0,
                input: res.bloom_extract.1,
                target: mip0,
            });
            for i in 0..mips {
                chain.push(FullscreenPass {
                    label: DOWN_LABELS[i],
                    stage: PostStage::BloomDownsample,
                    pipeline: res.bloom_down,
                    input: bloom[i].1,
                    target: bloom[i + 1].0,
                });
            }
            for i in (0..mips).rev() {
                chain.push(FullscreenPass {
                    label: UP_LABELS[i],
                    stage: PostStage::BloomUpsample,
                    pipeline: res.bloom_up,
                    input: bloom[i + 1].1,
                    target: bloom[i].0,
                });
            }
        }

        chain.push(FullscreenPass {
            label: "tone_map",
            stage: PostStage::ToneMap,
            pipeline: res.tone_map.0,
            input: res.tone_map.1,
            target: res.ldr,
        });
        chain.push(FullscreenPass {
            label: "resolve",
            stage: PostStage::Resolve,
            pipeline: res.resolve.0,
            input: res.resolve.1,
            target: res.output,
        });
        chain
    }

    pub fn passes(&self) -> &[FullscreenPass] {
        &self.passes
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}
