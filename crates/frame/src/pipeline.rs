use std::time::Instant;

use glam::Mat4;
use strata_common::{
    Candidate, PassKind, PipelineId, SchedError, SchedulerConfig, TargetId, UnknownIdPolicy,
};
use strata_cull::{Frustum, FrustumExtractor, VisibilityFilter};
use strata_sort::{CommandPool, DepthRange, DrawCommand, KeyEncoder, KeyInput, RadixSorter};
use strata_submit::{
    BackendError, BindingTable, ColorAttachment, DepthAttachment, LoadOp, PassDescriptor,
    RenderBackend, StateCache, SubmitCounters,
};
use strata_uniforms::{DynamicUniformAllocator, ObjectUniforms, ViewUniforms};

use crate::cache::{CacheKey, StaticCommandCache, StaticTally};
use crate::camera::{CameraView, ShadowCascade};
use crate::post::{PostChain, PostStage};
use crate::scene::SceneSource;
use crate::stats::{FrameStats, FrameTimer};
use crate::throttle::{Recovered, WarnGate};

const OPAQUE_LIST: usize = 0;
const TRANSPARENT_LIST: usize = 1;
const SHADOW_LABELS: [&str; 8] = [
    "shadow_0", "shadow_1", "shadow_2", "shadow_3", "shadow_4", "shadow_5", "shadow_6", "shadow_7",
];
const CLEAR_COLOR: [f32; 4] = [0.02, 0.02, 0.03, 1.0];
const TIMER_HISTORY: usize = 120;

/// Render targets the fixed passes write. Post-process targets live on the
/// [`PostChain`]; cascade targets on each [`ShadowCascade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTargets {
    pub main_color: TargetId,
    pub main_depth: TargetId,
    /// Weighted-blended accumulation colour.
    pub accum: TargetId,
    pub revealage: TargetId,
}

impl Default for FrameTargets {
    fn default() -> Self {
        Self {
            main_color: TargetId(0),
            main_depth: TargetId(1),
            accum: TargetId(2),
            revealage: TargetId(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum List {
    Shadow,
    Opaque,
    Transparent,
}

/// Which pools a visibility pass fills.
#[derive(Debug, Clone, Copy)]
enum Fill {
    /// Every caster drawn with one depth-only pipeline.
    Shadow(PipelineId),
    /// Opaque and transparent, each with its own pipeline.
    Main,
}

#[derive(Debug, Default)]
struct Collected {
    overflow: usize,
    first_overflow: Option<SchedError>,
    unknown: u32,
    first_unknown: Option<SchedError>,
    static_visible: usize,
    static_unknown: u32,
}

#[derive(Debug, Default)]
struct UniformLoss {
    exhausted: usize,
    missing_transform: usize,
}

/// Owns every per-frame buffer and runs the fixed pass sequence:
/// shadow cascades, opaque, transparent, post-process.
///
/// All capacities are fixed by [`SchedulerConfig`] at construction; a
/// steady-state frame does not allocate. Problems found while rendering are
/// recovered, counted in [`FrameStats`] and logged at a throttled rate.
pub struct FramePipeline<B: RenderBackend> {
    backend: B,
    config: SchedulerConfig,
    bindings: BindingTable,
    targets: FrameTargets,
    post: PostChain,
    shadow_pipeline: Option<PipelineId>,

    extractor: FrustumExtractor,
    filter: VisibilityFilter,
    sorter: RadixSorter<DrawCommand>,
    shadow: CommandPool,
    opaque: CommandPool,
    transparent: CommandPool,
    uniforms: DynamicUniformAllocator,
    state: StateCache,
    main_cache: StaticCommandCache,
    cascade_caches: Vec<StaticCommandCache>,

    warnings: WarnGate,
    timer: FrameTimer,
    frame_index: u64,
    stats: FrameStats,
}

impl<B: RenderBackend> FramePipeline<B> {
    /// Allocate every pool, the sort buffer and the uniform ring. This is
    /// the only fallible step; afterwards frames always complete.
    pub fn new(
        backend: B,
        bindings: BindingTable,
        targets: FrameTargets,
        config: SchedulerConfig,
    ) -> Result<Self, SchedError> {
        config.validate()?;
        let draws = config.max_draws_per_pass;
        let cache_capacity = if config.static_cache { draws } else { 0 };
        let cascade_caches = (0..config.shadow_cascades_max)
            .map(|_| StaticCommandCache::with_capacity(1, cache_capacity))
            .collect::<Result<Vec<_>, _>>()?;
        let uniforms = DynamicUniformAllocator::from_config(&config)?;

        tracing::info!(
            max_candidates = config.max_candidates,
            max_draws = draws,
            ring_bytes = uniforms.ring_size(),
            static_cache = config.static_cache,
            clip_depth = ?config.clip_depth,
            "frame pipeline created"
        );

        Ok(Self {
            extractor: FrustumExtractor::new(config.clip_depth),
            filter: VisibilityFilter::with_capacity(config.max_candidates)?,
            sorter: RadixSorter::with_capacity(draws)?,
            shadow: CommandPool::with_capacity("shadow commands", draws)?,
            opaque: CommandPool::with_capacity("opaque commands", draws)?,
            transparent: CommandPool::with_capacity("transparent commands", draws)?,
            uniforms,
            state: StateCache::new(config.unknown_id_policy),
            main_cache: StaticCommandCache::with_capacity(2, cache_capacity)?,
            cascade_caches,
            warnings: WarnGate::new(config.warn_interval_frames),
            timer: FrameTimer::new(TIMER_HISTORY),
            frame_index: 0,
            stats: FrameStats::default(),
            backend,
            config,
            bindings,
            targets,
            post: PostChain::new(),
            shadow_pipeline: None,
        })
    }

    pub fn with_post_chain(mut self, post: PostChain) -> Self {
        self.post = post;
        self
    }

    /// Depth-only pipeline for shadow passes. Without one, shadows are skipped.
    pub fn with_shadow_pipeline(mut self, pipeline: PipelineId) -> Self {
        self.shadow_pipeline = Some(pipeline);
        self
    }

    /// Run one frame. Always completes; see [`FrameStats`] for what was
    /// dropped or degraded along the way.
    pub fn render_frame<S: SceneSource + ?Sized>(
        &mut self,
        scene: &mut S,
        camera: &CameraView,
        cascades: &[ShadowCascade],
    ) -> &FrameStats {
        let _span = tracing::info_span!("render_frame", frame = self.frame_index).entered();
        let frame_start = Instant::now();
        self.stats = FrameStats {
            frame_index: self.frame_index,
            ..FrameStats::default()
        };

        scene.update_transforms();
        let scene: &S = scene;

        self.shadow_phase(scene, cascades);
        self.main_phase(scene, camera, cascades.len());
        self.post_phase();

        self.stats.uniform_bytes = self.uniforms.flush(&mut self.backend);
        if let Err(err) = self.backend.finish_frame() {
            if self.warnings.allow(Recovered::FinishFailed, self.frame_index) {
                tracing::warn!(%err, "backend failed to finish frame");
            }
        }
        self.uniforms.begin_frame();

        self.stats.frame_time = frame_start.elapsed();
        self.timer.record(self.stats.frame_time);
        tracing::debug!(
            draws = self.stats.draw_calls,
            state_changes = self.stats.state_changes,
            visible = self.stats.visible,
            culled = self.stats.culled,
            frame_time = ?self.stats.frame_time,
            "frame complete"
        );
        self.frame_index += 1;
        &self.stats
    }

    fn shadow_phase<S: SceneSource + ?Sized>(&mut self, scene: &S, cascades: &[ShadowCascade]) {
        let Some(pipeline) = self.shadow_pipeline else {
            self.stats.shadows_skipped = true;
            tracing::debug!("no shadow pipeline; shadow passes skipped");
            return;
        };
        if cascades.is_empty() {
            self.stats.shadows_skipped = true;
            tracing::debug!("no shadow cascades; shadow passes skipped");
            return;
        }

        let limit = self.config.shadow_cascades_max;
        if cascades.len() > limit
            && self.warnings.allow(Recovered::CascadesTruncated, self.frame_index)
        {
            tracing::warn!(
                requested = cascades.len(),
                limit,
                "too many shadow cascades; extra cascades dropped"
            );
        }

        for (index, cascade) in cascades.iter().take(limit).enumerate() {
            self.shadow_cascade(scene, index, cascade, pipeline, cascades.len());
        }
    }

    fn shadow_cascade<S: SceneSource + ?Sized>(
        &mut self,
        scene: &S,
        index: usize,
        cascade: &ShadowCascade,
        pipeline: PipelineId,
        cascade_count: usize,
    ) {
        let label = SHADOW_LABELS.get(index).copied().unwrap_or("shadow");
        let view_proj = cascade.view_projection();
        let frustum = self.extract_frustum(&view_proj, label);
        let key = CacheKey::new(scene.revision(), &view_proj, cascade_count);

        self.shadow.reset();
        let mut hit = self.config.static_cache
            && self.cascade_caches.get(index).is_some_and(|c| c.matches(&key));
        if !hit {
            if let Some(cache) = self.cascade_caches.get_mut(index).filter(|c| c.is_valid()) {
                tracing::debug!(view = label, "static command cache invalidated");
                cache.invalidate();
            }
        }

        let range = DepthRange::new(cascade.near, cascade.far);
        let fill = Fill::Shadow(pipeline);
        let mut split = 0;
        let mut collected = None;
        if hit {
            self.shadow.extend_from_slice(self.cascade_caches[index].list(0));
            split = self.shadow.len();
            let replayed = self.collect(scene.candidates(), &frustum, &cascade.view, range, fill, false);
            if replayed.overflow == 0 {
                self.stats.replayed_commands += split;
                collected = Some(replayed);
            } else {
                // Truncation must keep the lowest candidate indices, which a
                // replay placed ahead of the dynamic draws cannot honour.
                tracing::debug!(view = label, "static replay overflows; rebuilding");
                self.shadow.reset();
                hit = false;
                split = 0;
            }
        }
        let collected = match collected {
            Some(collected) => collected,
            None => self.collect(scene.candidates(), &frustum, &cascade.view, range, fill, true),
        };
        self.report_collected(&collected, label);
        self.sort_list(List::Shadow, split);

        if self.config.static_cache && !hit && collected.overflow == 0 {
            if let Some(cache) = self.cascade_caches.get_mut(index) {
                cache.store(0, self.shadow.as_slice());
                cache.commit(key, StaticTally::default());
            }
        }

        let position = cascade.view.inverse().w_axis.truncate();
        let view = ViewUniforms::new(
            cascade.view,
            cascade.projection,
            position,
            cascade.near,
            cascade.far,
        );
        let desc = PassDescriptor::depth_only(
            label,
            PassKind::Shadow,
            DepthAttachment {
                target: cascade.target,
                load: LoadOp::Clear(1.0),
            },
        );
        match self.run_pass(&desc, &view, List::Shadow, scene.transforms(), scene.bones()) {
            Ok(counters) => self.stats.shadow_draws += counters.draw_calls,
            Err(err) => self.warn_pass_failed(label, &err),
        }
    }

    fn main_phase<S: SceneSource + ?Sized>(&mut self, scene: &S, camera: &CameraView, cascades: usize) {
        let view_proj = camera.view_projection();
        let frustum = self.extract_frustum(&view_proj, "main");
        let candidates = scene.candidates();
        let key = CacheKey::new(scene.revision(), &view_proj, cascades);

        self.opaque.reset();
        self.transparent.reset();
        let mut hit = self.config.static_cache && self.main_cache.matches(&key);
        if !hit && self.main_cache.is_valid() {
            tracing::debug!(view = "main", "static command cache invalidated");
            self.main_cache.invalidate();
        }

        let range = DepthRange::new(camera.near, camera.far);
        let mut splits = (0, 0);
        let mut collected = None;
        if hit {
            self.opaque
                .extend_from_slice(self.main_cache.list(OPAQUE_LIST));
            self.transparent
                .extend_from_slice(self.main_cache.list(TRANSPARENT_LIST));
            splits = (self.opaque.len(), self.transparent.len());
            let replayed = self.collect(candidates, &frustum, &camera.view, range, Fill::Main, false);
            if replayed.overflow == 0 {
                self.stats.static_cache_hit = true;
                self.stats.replayed_commands += splits.0 + splits.1;
                collected = Some(replayed);
            } else {
                tracing::debug!(view = "main", "static replay overflows; rebuilding");
                self.opaque.reset();
                self.transparent.reset();
                hit = false;
                splits = (0, 0);
            }
        }
        let collected = match collected {
            Some(collected) => collected,
            None => self.collect(candidates, &frustum, &camera.view, range, Fill::Main, true),
        };

        let filtered = self.filter.stats();
        self.stats.candidates = candidates.len();
        self.stats.visible = filtered.visible;
        self.stats.culled = filtered.culled;
        if hit {
            let tally = self.main_cache.tally();
            self.stats.visible += tally.visible;
            self.stats.culled += tally.culled;
            self.stats.unknown_ids += tally.unknown;
        }
        self.report_collected(&collected, "main");

        self.sort_list(List::Opaque, splits.0);
        self.sort_list(List::Transparent, splits.1);

        if self.config.static_cache && !hit && collected.overflow == 0 {
            let static_visible = collected.static_visible + collected.static_unknown as usize;
            let static_total = candidates.iter().filter(|c| c.is_static).count();
            self.main_cache.store(OPAQUE_LIST, self.opaque.as_slice());
            self.main_cache
                .store(TRANSPARENT_LIST, self.transparent.as_slice());
            self.main_cache.commit(
                key,
                StaticTally {
                    visible: static_visible,
                    culled: static_total - static_visible,
                    unknown: collected.static_unknown,
                },
            );
        }

        let view = ViewUniforms::new(
            camera.view,
            camera.projection,
            camera.position,
            camera.near,
            camera.far,
        );
        let t = self.targets;

        let opaque = PassDescriptor::color(
            "opaque",
            PassKind::Opaque,
            ColorAttachment {
                target: t.main_color,
                load: LoadOp::Clear(CLEAR_COLOR),
            },
        )
        .with_depth(DepthAttachment {
            target: t.main_depth,
            load: LoadOp::Clear(1.0),
        });
        if let Err(err) = self.run_pass(&opaque, &view, List::Opaque, scene.transforms(), scene.bones()) {
            self.warn_pass_failed("opaque", &err);
        }

        // Accumulation reads the opaque depth but never writes it.
        let transparent = PassDescriptor {
            label: "transparent",
            kind: PassKind::Transparent,
            color: [
                Some(ColorAttachment {
                    target: t.accum,
                    load: LoadOp::Clear([0.0; 4]),
                }),
                Some(ColorAttachment {
                    target: t.revealage,
                    load: LoadOp::Clear([1.0; 4]),
                }),
            ],
            depth: Some(DepthAttachment {
                target: t.main_depth,
                load: LoadOp::Load,
            }),
        };
        if let Err(err) = self.run_pass(
            &transparent,
            &view,
            List::Transparent,
            scene.transforms(),
            scene.bones(),
        ) {
            self.stats.transparent_degraded = true;
            if self.warnings.allow(Recovered::PassFailed, self.frame_index) {
                tracing::warn!(%err, dropped = self.transparent.len(), "transparent pass unavailable; rendering opaque only");
            }
        }
    }

    fn post_phase(&mut self) {
        for pass in self.post.passes() {
            if pass.stage == PostStage::Composite && self.stats.transparent_degraded {
                tracing::debug!("composite skipped");
                continue;
            }
            let load = match pass.stage {
                PostStage::Composite | PostStage::BloomUpsample => LoadOp::Load,
                _ => LoadOp::Clear([0.0, 0.0, 0.0, 1.0]),
            };
            let desc = PassDescriptor::color(
                pass.label,
                PassKind::Overlay,
                ColorAttachment {
                    target: pass.target,
                    load,
                },
            );
            if let Err(err) = self.backend.begin_pass(&desc) {
                if self.warnings.allow(Recovered::PassFailed, self.frame_index) {
                    tracing::warn!(pass = pass.label, %err, "post pass skipped");
                }
                continue;
            }
            self.backend.bind_pipeline(pass.pipeline);
            self.backend.bind_group(0, pass.input, None);
            self.backend.draw(3, 1);
            self.backend.end_pass();
            self.stats.absorb(&SubmitCounters {
                draw_calls: 1,
                triangles: 1,
                pipeline_binds: 1,
                bind_group_binds: 1,
                ..SubmitCounters::default()
            });
        }
    }

    fn extract_frustum(&mut self, view_proj: &Mat4, view: &'static str) -> Frustum {
        let frustum = self.extractor.extract(view_proj);
        let degenerate = self.extractor.degenerate_count();
        if degenerate > 0 {
            self.stats.degenerate_planes += degenerate;
            if self.warnings.allow(Recovered::DegenerateFrustum, self.frame_index) {
                let err = SchedError::DegenerateFrustum {
                    plane: self.extractor.degenerate_mask().trailing_zeros() as usize,
                };
                tracing::warn!(
                    view,
                    planes = degenerate,
                    mask = self.extractor.degenerate_mask(),
                    %err,
                    "degenerate frustum; planes treated as non-culling"
                );
            }
        }
        frustum
    }

    /// Cull, key and pool the candidates for one view. With `include_static`
    /// false only dynamic candidates are tested; cached static commands are
    /// already in the pools.
    fn collect(
        &mut self,
        candidates: &[Candidate],
        frustum: &Frustum,
        view: &Mat4,
        range: DepthRange,
        fill: Fill,
        include_static: bool,
    ) -> Collected {
        let encoder = KeyEncoder::new(range);
        let policy = self.config.unknown_id_policy;
        let mut out = Collected::default();

        let visible = match fill {
            Fill::Shadow(_) => self.filter.filter_where(frustum, candidates, |c| {
                c.casts_shadow && (include_static || !c.is_static)
            }),
            Fill::Main => self
                .filter
                .filter_where(frustum, candidates, |c| include_static || !c.is_static),
        };

        for &index in visible {
            let candidate = &candidates[index as usize];
            let (pass, pipeline, transparent) = match fill {
                Fill::Shadow(pipeline) => (PassKind::Shadow, pipeline, false),
                Fill::Main => {
                    if !candidate.pipeline.fits_key() {
                        let err = SchedError::UnknownPipeline(candidate.pipeline);
                        if policy == UnknownIdPolicy::Panic {
                            panic!("candidate {index} references {err}");
                        }
                        out.unknown += 1;
                        if candidate.is_static {
                            out.static_unknown += 1;
                        }
                        out.first_unknown.get_or_insert(err);
                        continue;
                    }
                    let pass = if candidate.transparent {
                        PassKind::Transparent
                    } else {
                        PassKind::Opaque
                    };
                    (pass, candidate.pipeline, candidate.transparent)
                }
            };

            let key = encoder.encode(&KeyInput {
                layer: candidate.layer,
                pass,
                transparent,
                pipeline,
                material: candidate.material,
                depth: -view.transform_point3(candidate.bounds.center()).z,
            });
            let mut command = DrawCommand::from_candidate(index, candidate, key);
            command.pipeline = pipeline;
            command.transparent = transparent;

            let pool = match fill {
                Fill::Shadow(_) => &mut self.shadow,
                Fill::Main if transparent => &mut self.transparent,
                Fill::Main => &mut self.opaque,
            };
            match pool.push(command) {
                Ok(()) if candidate.is_static => out.static_visible += 1,
                Ok(()) => {}
                Err(err) => {
                    out.overflow += 1;
                    out.first_overflow.get_or_insert(err);
                }
            }
        }

        let filtered = self.filter.stats();
        if filtered.dropped > 0 {
            out.overflow += filtered.dropped;
            out.first_overflow
                .get_or_insert(SchedError::CapacityExceeded {
                    what: "visibility output",
                    capacity: self.filter.capacity(),
                    requested: filtered.visible,
                });
        }
        out
    }

    fn report_collected(&mut self, collected: &Collected, view: &'static str) {
        self.stats.commands_dropped += collected.overflow;
        self.stats.unknown_ids += collected.unknown;

        if let Some(err) = &collected.first_overflow {
            if self.warnings.allow(Recovered::CommandOverflow, self.frame_index) {
                tracing::warn!(view, dropped = collected.overflow, %err, "draws truncated to capacity");
            }
        }
        if let Some(err) = &collected.first_unknown {
            if self.warnings.allow(Recovered::UnknownId, self.frame_index) {
                tracing::warn!(view, skipped = collected.unknown, %err, "draws skipped for unknown ids");
            }
        }
    }

    /// Sort a pool. A non-zero `split` means `[..split]` is an already
    /// sorted replay and only the tail needs sorting before the merge.
    fn sort_list(&mut self, list: List, split: usize) {
        let pool = match list {
            List::Shadow => &mut self.shadow,
            List::Opaque => &mut self.opaque,
            List::Transparent => &mut self.transparent,
        };
        let start = Instant::now();
        if let Err(err) = sort_commands(&mut self.sorter, pool.as_mut_slice(), split) {
            if err.is_recoverable() {
                tracing::warn!(list = pool.name(), %err, "sort failed; submitting unsorted");
            } else {
                tracing::error!(list = pool.name(), %err, "sort failed; submitting unsorted");
            }
        }
        self.stats.sort_time += start.elapsed();
    }

    fn run_pass(
        &mut self,
        desc: &PassDescriptor,
        view: &ViewUniforms,
        list: List,
        transforms: &[Mat4],
        bones: &[Mat4],
    ) -> Result<SubmitCounters, BackendError> {
        self.backend.begin_pass(desc)?;
        self.state.reset();

        let pool = match list {
            List::Shadow => &mut self.shadow,
            List::Opaque => &mut self.opaque,
            List::Transparent => &mut self.transparent,
        };

        let mut loss = UniformLoss::default();
        let view_offset = if pool.is_empty() {
            0
        } else {
            match self.uniforms.push(view) {
                Some(region) => {
                    assign_object_uniforms(pool, &mut self.uniforms, transforms, bones, &mut loss);
                    region.offset
                }
                None => {
                    loss.exhausted += pool.len();
                    pool.clear();
                    0
                }
            }
        };

        let submit_start = Instant::now();
        let report = self
            .state
            .submit(&mut self.backend, &self.bindings, view_offset, pool.as_slice());
        self.backend.end_pass();
        self.stats.submit_time += submit_start.elapsed();
        self.stats.absorb(&report.counters);
        self.stats.uniform_exhausted += loss.exhausted;
        self.stats.missing_transforms += loss.missing_transform;

        if loss.exhausted > 0 && self.warnings.allow(Recovered::UniformExhausted, self.frame_index)
        {
            let err = SchedError::RingBufferExhausted {
                requested: loss.exhausted * self.uniforms.alignment(),
                available: self.uniforms.remaining(),
            };
            tracing::warn!(pass = desc.label, dropped = loss.exhausted, %err, "uniform region full; draws dropped");
        }
        if loss.missing_transform > 0
            && self.warnings.allow(Recovered::MissingTransform, self.frame_index)
        {
            tracing::warn!(
                pass = desc.label,
                dropped = loss.missing_transform,
                "draws reference missing transforms or bones"
            );
        }
        if let Some(err) = &report.first_unknown {
            if self.warnings.allow(Recovered::UnknownId, self.frame_index) {
                tracing::warn!(pass = desc.label, skipped = report.counters.skipped, %err, "draws skipped for unknown ids");
            }
        }
        Ok(report.counters)
    }

    fn warn_pass_failed(&mut self, pass: &'static str, err: &BackendError) {
        if self.warnings.allow(Recovered::PassFailed, self.frame_index) {
            tracing::warn!(pass, %err, "pass skipped");
        }
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Last frame's sorted opaque list as submitted.
    pub fn opaque_commands(&self) -> &[DrawCommand] {
        self.opaque.as_slice()
    }

    pub fn transparent_commands(&self) -> &[DrawCommand] {
        self.transparent.as_slice()
    }

    /// Last cascade's shadow list.
    pub fn shadow_commands(&self) -> &[DrawCommand] {
        self.shadow.as_slice()
    }

    pub fn uniforms(&self) -> &DynamicUniformAllocator {
        &self.uniforms
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut BindingTable {
        &mut self.bindings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

fn sort_commands(
    sorter: &mut RadixSorter<DrawCommand>,
    commands: &mut [DrawCommand],
    split: usize,
) -> Result<(), SchedError> {
    if split == 0 {
        return sorter.sort(commands);
    }
    sorter.sort(&mut commands[split..])?;
    sorter.merge(commands, split)
}

/// Write object (and bone) uniforms for each command in submission order,
/// recording the dynamic offset. Commands that cannot be served are
/// removed; the survivors keep their order.
fn assign_object_uniforms(
    pool: &mut CommandPool,
    uniforms: &mut DynamicUniformAllocator,
    transforms: &[Mat4],
    bones: &[Mat4],
    loss: &mut UniformLoss,
) {
    pool.retain_mut(|command| {
        let Some(world) = transforms.get(command.transform.0 as usize) else {
            loss.missing_transform += 1;
            return false;
        };
        let mut object = ObjectUniforms::new(*world, command.material.0 as u32);

        if let Some(range) = command.bones {
            let start = range.offset as usize;
            let Some(palette) = bones.get(start..start + range.count as usize) else {
                loss.missing_transform += 1;
                return false;
            };
            let Some(region) = uniforms.push_slice(palette) else {
                loss.exhausted += 1;
                return false;
            };
            object = object.with_bones(region.offset, range.count);
        }

        match uniforms.push(&object) {
            Some(region) => {
                command.object_offset = region.offset;
                true
            }
            None => {
                loss.exhausted += 1;
                false
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::post::PostResources;
    use crate::scene::{ProceduralSpec, StaticScene, unit_cube};
    use glam::Vec3;
    use strata_common::{
        BindGroupHandle, BufferHandle, ClipDepth, GeometryId, MaterialId, TransformRef,
    };
    use strata_submit::{BackendCall, GeometryBinding, OBJECT_SLOT, RecordingBackend};

    const SHADOW: PipelineId = PipelineId(4);

    fn bindings() -> BindingTable {
        let mut t = BindingTable::new(BindGroupHandle(900), BindGroupHandle(901));
        for p in 0..=4 {
            t.register_pipeline(PipelineId(p));
        }
        for p in 10..=15 {
            t.register_pipeline(PipelineId(p));
        }
        for m in 0..32 {
            t.register_material(MaterialId(m), BindGroupHandle(100 + m as u32));
        }
        t.register_geometry(
            GeometryId(0),
            GeometryBinding {
                vertex_buffer: BufferHandle(1),
                index_buffer: Some(BufferHandle(2)),
                element_count: 36,
            },
        );
        t.register_geometry(
            GeometryId(1),
            GeometryBinding {
                vertex_buffer: BufferHandle(3),
                index_buffer: None,
                element_count: 36,
            },
        );
        t
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            unknown_id_policy: UnknownIdPolicy::Skip,
            ..SchedulerConfig::default()
        }
    }

    fn pipeline(config: SchedulerConfig) -> FramePipeline<RecordingBackend> {
        FramePipeline::new(
            RecordingBackend::new(),
            bindings(),
            FrameTargets::default(),
            config,
        )
        .unwrap()
        .with_shadow_pipeline(SHADOW)
    }

    fn overview_camera() -> CameraView {
        let mut cam = Camera {
            clip_depth: ClipDepth::NegativeOneToOne,
            ..Camera::default()
        };
        cam.look_at(Vec3::new(0.0, 40.0, 60.0), Vec3::ZERO);
        cam.to_view()
    }

    fn row_camera() -> CameraView {
        let mut cam = Camera::default();
        cam.look_at(Vec3::new(0.0, 2.0, 15.0), Vec3::ZERO);
        cam.to_view()
    }

    /// `n` static opaque unit cubes along +x, all in view of `row_camera`.
    fn row_scene(n: usize) -> StaticScene {
        let mut scene = StaticScene::new();
        for i in 0..n {
            let candidate = Candidate {
                pipeline: PipelineId((i % 2) as u16),
                material: MaterialId(i as u16),
                casts_shadow: true,
                is_static: true,
                ..Candidate::default()
            };
            scene.push(
                candidate,
                Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)),
                unit_cube(),
            );
        }
        scene
    }

    fn grid_scene() -> StaticScene {
        StaticScene::procedural(&ProceduralSpec {
            objects: 300,
            ..ProceduralSpec::default()
        })
    }

    fn order(commands: &[DrawCommand]) -> Vec<(u64, u32)> {
        commands.iter().map(|c| (c.key.0, c.source)).collect()
    }

    fn cascade() -> ShadowCascade {
        ShadowCascade::orthographic_fit(
            Vec3::new(-0.3, -1.0, -0.2),
            Vec3::ZERO,
            40.0,
            ClipDepth::NegativeOneToOne,
            TargetId(40),
        )
    }

    #[test]
    fn frame_draws_visible_objects_in_key_order() {
        let mut p = pipeline(config());
        let mut scene = grid_scene();
        let stats = p.render_frame(&mut scene, &overview_camera(), &[]).clone();

        assert_eq!(stats.candidates, 300);
        assert_eq!(stats.visible + stats.culled, 300);
        assert!(stats.visible > 0);
        let drawn = p.opaque_commands().len() + p.transparent_commands().len();
        assert_eq!(stats.draw_calls as usize, drawn);
        assert!(p.opaque_commands().windows(2).all(|w| w[0].key <= w[1].key));
        assert!(p.transparent_commands().windows(2).all(|w| w[0].key <= w[1].key));
        assert!(p.transparent_commands().iter().all(|c| c.transparent));
        let opaque_pipeline_binds = p
            .backend()
            .pass_calls("opaque")
            .iter()
            .filter(|c| matches!(c, BackendCall::BindPipeline(_)))
            .count();
        assert!(opaque_pipeline_binds <= 4);
        assert_eq!(p.backend().frames(), 1);
    }

    #[test]
    fn rerendering_unchanged_scene_is_idempotent() {
        let mut p = pipeline(config());
        let mut scene = grid_scene();
        let camera = overview_camera();

        let first = p.render_frame(&mut scene, &camera, &[cascade()]).clone();
        let opaque = order(p.opaque_commands());
        let transparent = order(p.transparent_commands());

        let second = p.render_frame(&mut scene, &camera, &[cascade()]).clone();
        assert_eq!(order(p.opaque_commands()), opaque);
        assert_eq!(order(p.transparent_commands()), transparent);
        assert_eq!(first.state_changes, second.state_changes);
        assert_eq!(first.draw_calls, second.draw_calls);
        assert_eq!(first.shadow_draws, second.shadow_draws);
    }

    #[test]
    fn pool_overflow_keeps_first_commands_and_finishes() {
        let mut p = pipeline(SchedulerConfig {
            max_draws_per_pass: 2,
            ..config()
        });
        let mut scene = row_scene(3);
        let stats = p.render_frame(&mut scene, &row_camera(), &[]).clone();

        assert_eq!(p.opaque_commands().len(), 2);
        assert_eq!(stats.commands_dropped, 1);
        assert_eq!(stats.draw_calls, 2);
        let mut sources: Vec<u32> = p.opaque_commands().iter().map(|c| c.source).collect();
        sources.sort();
        assert_eq!(sources, [0, 1]);
        assert_eq!(p.backend().calls().last(), Some(&BackendCall::FinishFrame));
    }

    #[test]
    fn uniform_exhaustion_drops_trailing_draws() {
        // One view slot plus three object slots.
        let mut p = pipeline(SchedulerConfig {
            uniform_bytes_per_frame: 4 * 256,
            ..config()
        });
        let mut scene = row_scene(10);
        let stats = p.render_frame(&mut scene, &row_camera(), &[]).clone();

        assert_eq!(stats.draw_calls, 3);
        assert_eq!(stats.uniform_exhausted, 7);
        assert_eq!(p.opaque_commands().len(), 3);
        assert_eq!(stats.uniform_bytes, 4 * 256);
    }

    #[test]
    fn object_offsets_are_distinct_and_aligned() {
        let mut p = pipeline(config());
        let mut scene = row_scene(6);
        p.render_frame(&mut scene, &row_camera(), &[]);

        let offsets: Vec<u32> = p
            .backend()
            .calls()
            .iter()
            .filter_map(|c| match c {
                BackendCall::BindGroup {
                    slot: OBJECT_SLOT,
                    offset: Some(o),
                    ..
                } => Some(*o),
                _ => None,
            })
            .collect();
        assert_eq!(offsets.len(), 6);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        assert!(offsets.iter().all(|o| o % 256 == 0));

        // Uploaded payload carries the draw's world matrix.
        let first = p.opaque_commands()[0];
        let bytes = p.backend().uniform_bytes(first.object_offset, 80);
        let object: ObjectUniforms = bytemuck::pod_read_unaligned(bytes);
        let world = scene.transforms()[first.transform.0 as usize];
        assert_eq!(object.world, world.to_cols_array_2d());
    }

    #[test]
    fn unknown_ids_are_skipped_and_counted() {
        let mut p = pipeline(config());
        let mut scene = row_scene(3);
        if let Some(c) = scene.candidate_mut(1) {
            c.material = MaterialId(999);
        }
        if let Some(c) = scene.candidate_mut(2) {
            c.pipeline = PipelineId(3000);
        }
        let stats = p.render_frame(&mut scene, &row_camera(), &[]).clone();

        assert_eq!(stats.unknown_ids, 2);
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(p.backend().frames(), 1);
    }

    #[test]
    #[should_panic(expected = "unknown pipeline")]
    fn unknown_pipeline_panics_under_strict_policy() {
        let mut p = pipeline(SchedulerConfig {
            unknown_id_policy: UnknownIdPolicy::Panic,
            ..config()
        });
        let mut scene = row_scene(1);
        if let Some(c) = scene.candidate_mut(0) {
            c.pipeline = PipelineId(3000);
        }
        p.render_frame(&mut scene, &row_camera(), &[]);
    }

    #[test]
    fn missing_transparent_targets_degrade_to_opaque_only() {
        let targets = FrameTargets::default();
        let mut p = pipeline(config()).with_post_chain(standard_post(&targets));
        p.backend_mut().mark_target_missing(targets.accum);
        let mut scene = grid_scene();
        let stats = p.render_frame(&mut scene, &overview_camera(), &[]).clone();

        assert!(stats.transparent_degraded);
        let labels = p.backend().pass_labels();
        assert!(labels.contains(&"opaque"));
        assert!(!labels.contains(&"transparent"));
        assert!(!labels.contains(&"composite"));
        assert!(labels.contains(&"tone_map"));
        assert!(!p.backend().pass_calls("opaque").is_empty());
        assert_eq!(p.backend().frames(), 1);
    }

    #[test]
    fn shadows_skipped_without_cascades() {
        let mut p = pipeline(config());
        let mut scene = row_scene(4);
        let stats = p.render_frame(&mut scene, &row_camera(), &[]).clone();
        assert!(stats.shadows_skipped);
        assert_eq!(stats.shadow_draws, 0);
        assert!(!p.backend().pass_labels().iter().any(|l| l.starts_with("shadow")));
    }

    #[test]
    fn shadows_skipped_without_depth_pipeline() {
        let mut p = FramePipeline::new(
            RecordingBackend::new(),
            bindings(),
            FrameTargets::default(),
            config(),
        )
        .unwrap();
        let mut scene = row_scene(4);
        let stats = p.render_frame(&mut scene, &row_camera(), &[cascade()]).clone();
        assert!(stats.shadows_skipped);
    }

    #[test]
    fn shadow_pass_draws_casters_with_depth_pipeline() {
        let mut p = pipeline(config());
        let mut scene = row_scene(4);
        if let Some(c) = scene.candidate_mut(3) {
            c.casts_shadow = false;
        }
        let stats = p.render_frame(&mut scene, &row_camera(), &[cascade()]).clone();

        assert!(!stats.shadows_skipped);
        assert_eq!(stats.shadow_draws, 3);
        let labels = p.backend().pass_labels();
        assert_eq!(labels[..3], ["shadow_0", "opaque", "transparent"]);
        let shadow = p.backend().pass_calls("shadow_0");
        let binds: Vec<&BackendCall> = shadow
            .iter()
            .filter(|c| matches!(c, BackendCall::BindPipeline(_)))
            .collect();
        assert_eq!(binds, [&BackendCall::BindPipeline(SHADOW)]);
        assert!(p.shadow_commands().iter().all(|c| c.pipeline == SHADOW));
    }

    #[test]
    fn extra_cascades_are_dropped() {
        let mut p = pipeline(SchedulerConfig {
            shadow_cascades_max: 2,
            ..config()
        });
        let mut scene = row_scene(2);
        p.render_frame(&mut scene, &row_camera(), &[cascade(); 3]);
        let labels = p.backend().pass_labels();
        assert_eq!(labels.iter().filter(|l| l.starts_with("shadow")).count(), 2);
    }

    fn standard_post(targets: &FrameTargets) -> PostChain {
        let res = PostResources {
            composite: (PipelineId(10), BindGroupHandle(10)),
            bloom_extract: (PipelineId(11), BindGroupHandle(11)),
            bloom_down: PipelineId(12),
            bloom_up: PipelineId(13),
            tone_map: (PipelineId(14), BindGroupHandle(14)),
            resolve: (PipelineId(15), BindGroupHandle(15)),
            scene_color: targets.main_color,
            ldr: TargetId(30),
            output: TargetId(31),
        };
        let bloom = [
            (TargetId(20), BindGroupHandle(20)),
            (TargetId(21), BindGroupHandle(21)),
        ];
        PostChain::standard(&res, &bloom, 1)
    }

    #[test]
    fn passes_run_in_fixed_order() {
        let targets = FrameTargets::default();
        let mut p = pipeline(config()).with_post_chain(standard_post(&targets));
        let mut scene = row_scene(2);
        let stats = p.render_frame(&mut scene, &row_camera(), &[cascade()]).clone();

        assert_eq!(
            p.backend().pass_labels(),
            [
                "shadow_0",
                "opaque",
                "transparent",
                "composite",
                "bloom_extract",
                "bloom_down_0",
                "bloom_up_0",
                "tone_map",
                "resolve"
            ]
        );
        assert_eq!(
            p.backend().pass_calls("tone_map"),
            &[
                BackendCall::BindPipeline(PipelineId(14)),
                BackendCall::BindGroup {
                    slot: 0,
                    group: BindGroupHandle(14),
                    offset: None
                },
                BackendCall::Draw {
                    vertices: 3,
                    instances: 1
                },
            ]
        );
        // two casters, two opaque draws, six fullscreen triangles
        assert_eq!(stats.draw_calls, 2 + 2 + 6);
    }

    #[test]
    fn degenerate_camera_keeps_everything() {
        let mut p = pipeline(config());
        let mut scene = row_scene(5);
        let camera = CameraView {
            projection: Mat4::ZERO,
            ..row_camera()
        };
        let stats = p.render_frame(&mut scene, &camera, &[]).clone();
        assert_eq!(stats.degenerate_planes, 6);
        assert_eq!(stats.visible, 5);
        assert_eq!(stats.draw_calls, 5);
    }

    #[test]
    fn static_cache_matches_full_rebuild() {
        let camera = overview_camera();
        let cascades = [cascade()];
        let mut cached = pipeline(SchedulerConfig {
            static_cache: true,
            ..config()
        });
        let mut plain = pipeline(config());
        let mut a = grid_scene();
        let mut b = grid_scene();

        for frame in 0..4 {
            let t = frame as f32 * 0.25;
            a.animate(t);
            b.animate(t);
            let sa = cached.render_frame(&mut a, &camera, &cascades).clone();
            let sb = plain.render_frame(&mut b, &camera, &cascades).clone();

            assert_eq!(sa.static_cache_hit, frame > 0);
            assert_eq!(cached.opaque_commands(), plain.opaque_commands());
            assert_eq!(cached.transparent_commands(), plain.transparent_commands());
            assert_eq!(cached.shadow_commands(), plain.shadow_commands());
            assert_eq!(sa.state_changes, sb.state_changes);
            assert_eq!(sa.draw_calls, sb.draw_calls);
            assert_eq!(sa.visible, sb.visible);
            assert_eq!(sa.culled, sb.culled);
            if frame > 0 {
                assert!(sa.replayed_commands > 0);
            }
        }
    }

    #[test]
    fn static_change_invalidates_cache() {
        let camera = row_camera();
        let mut p = pipeline(SchedulerConfig {
            static_cache: true,
            ..config()
        });
        let mut scene = row_scene(4);
        p.render_frame(&mut scene, &camera, &[]);
        assert!(p.render_frame(&mut scene, &camera, &[]).static_cache_hit);

        scene.set_transform(0, Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)), unit_cube());
        assert!(!p.render_frame(&mut scene, &camera, &[]).static_cache_hit);

        let moved = CameraView {
            position: Vec3::ONE,
            view: Mat4::look_at_rh(Vec3::new(1.0, 2.0, 15.0), Vec3::ZERO, Vec3::Y),
            ..camera
        };
        p.render_frame(&mut scene, &camera, &[]);
        assert!(!p.render_frame(&mut scene, &moved, &[]).static_cache_hit);
    }

    /// Candidates 0 and 1 are dynamic, 2 and 3 static; 1 starts behind
    /// `row_camera`.
    fn mixed_scene() -> StaticScene {
        let placements = [(false, 0.0, 0.0), (false, 1.0, 100.0), (true, 2.0, 0.0), (true, 3.0, 0.0)];
        let mut scene = StaticScene::new();
        for (i, &(is_static, x, z)) in placements.iter().enumerate() {
            let candidate = Candidate {
                pipeline: PipelineId(0),
                material: MaterialId(i as u16),
                casts_shadow: true,
                is_static,
                ..Candidate::default()
            };
            scene.push(candidate, Mat4::from_translation(Vec3::new(x, 0.0, z)), unit_cube());
        }
        scene
    }

    #[test]
    fn static_replay_overflow_keeps_lowest_candidates() {
        let camera = row_camera();
        let cascades = [cascade()];
        let base = SchedulerConfig {
            max_draws_per_pass: 3,
            ..config()
        };
        let mut cached = pipeline(SchedulerConfig {
            static_cache: true,
            ..base.clone()
        });
        let mut plain = pipeline(base);
        let mut a = mixed_scene();
        let mut b = mixed_scene();

        let sources = |commands: &[DrawCommand]| {
            let mut s: Vec<u32> = commands.iter().map(|c| c.source).collect();
            s.sort();
            s
        };
        let positions = [Vec3::new(1.0, 0.0, 100.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 100.0)];
        for (frame, position) in positions.into_iter().enumerate() {
            if frame > 0 {
                a.set_transform(1, Mat4::from_translation(position), unit_cube());
                b.set_transform(1, Mat4::from_translation(position), unit_cube());
            }
            let sa = cached.render_frame(&mut a, &camera, &cascades).clone();
            let sb = plain.render_frame(&mut b, &camera, &cascades).clone();

            assert_eq!(order(cached.opaque_commands()), order(plain.opaque_commands()));
            assert_eq!(order(cached.shadow_commands()), order(plain.shadow_commands()));
            assert_eq!(sa.commands_dropped, sb.commands_dropped);
            assert_eq!(sa.draw_calls, sb.draw_calls);
            assert_eq!(sa.visible, sb.visible);
            if frame == 1 {
                assert_eq!(sources(cached.opaque_commands()), [0, 1, 2]);
                assert!(sa.commands_dropped >= 1);
                assert!(!sa.static_cache_hit);
                assert_eq!(sa.replayed_commands, 0);
            }
        }
        // The cache survives the overflowing frame and is used again.
        assert!(cached.stats().static_cache_hit);
        assert_eq!(sources(cached.opaque_commands()), [0, 2, 3]);
    }

    #[test]
    fn static_cache_matches_full_rebuild_under_overflow() {
        let camera = overview_camera();
        let cascades = [cascade()];
        let base = SchedulerConfig {
            max_draws_per_pass: 24,
            ..config()
        };
        let mut cached = pipeline(SchedulerConfig {
            static_cache: true,
            ..base.clone()
        });
        let mut plain = pipeline(base);
        let mut a = grid_scene();
        let mut b = grid_scene();

        for frame in 0..4 {
            let t = frame as f32 * 0.25;
            a.animate(t);
            b.animate(t);
            let sa = cached.render_frame(&mut a, &camera, &cascades).clone();
            let sb = plain.render_frame(&mut b, &camera, &cascades).clone();

            assert!(sb.commands_dropped > 0);
            assert_eq!(cached.opaque_commands(), plain.opaque_commands());
            assert_eq!(cached.transparent_commands(), plain.transparent_commands());
            assert_eq!(cached.shadow_commands(), plain.shadow_commands());
            assert_eq!(sa.commands_dropped, sb.commands_dropped);
            assert_eq!(sa.draw_calls, sb.draw_calls);
            assert_eq!(sa.state_changes, sb.state_changes);
        }
    }

    #[test]
    fn static_cache_matches_full_rebuild_with_small_uniform_ring() {
        let camera = overview_camera();
        let cascades = [cascade()];
        let base = SchedulerConfig {
            uniform_bytes_per_frame: 40 * 256,
            ..config()
        };
        let mut cached = pipeline(SchedulerConfig {
            static_cache: true,
            ..base.clone()
        });
        let mut plain = pipeline(base);
        let mut a = grid_scene();
        let mut b = grid_scene();

        for frame in 0..4 {
            let t = frame as f32 * 0.25;
            a.animate(t);
            b.animate(t);
            let sa = cached.render_frame(&mut a, &camera, &cascades).clone();
            let sb = plain.render_frame(&mut b, &camera, &cascades).clone();

            assert!(sb.uniform_exhausted > 0);
            assert_eq!(sa.static_cache_hit, frame > 0);
            assert_eq!(cached.opaque_commands(), plain.opaque_commands());
            assert_eq!(cached.transparent_commands(), plain.transparent_commands());
            assert_eq!(cached.shadow_commands(), plain.shadow_commands());
            assert_eq!(sa.uniform_exhausted, sb.uniform_exhausted);
            assert_eq!(sa.draw_calls, sb.draw_calls);
            assert_eq!(sa.uniform_bytes, sb.uniform_bytes);
        }
    }

    #[test]
    fn missing_transforms_are_counted() {
        let mut p = pipeline(config());
        let mut scene = row_scene(3);
        scene.push_candidate(Candidate {
            bounds: unit_cube(),
            transform: TransformRef(99),
            ..Candidate::default()
        });
        let stats = p.render_frame(&mut scene, &row_camera(), &[]).clone();

        assert_eq!(stats.missing_transforms, 1);
        assert_eq!(stats.draw_calls, 3);
        assert_eq!(stats.commands_dropped, 0);
        assert!(stats.degraded());
    }

    #[test]
    fn skinned_draws_upload_bone_palettes() {
        let mut p = pipeline(config());
        let mut scene = row_scene(1);
        let palette = [Mat4::from_translation(Vec3::X), Mat4::from_translation(Vec3::Y)];
        let bones = scene.push_bones(&palette);
        if let Some(c) = scene.candidate_mut(0) {
            c.bones = Some(bones);
        }
        let stats = p.render_frame(&mut scene, &row_camera(), &[]).clone();
        assert_eq!(stats.draw_calls, 1);

        let cmd = p.opaque_commands()[0];
        let object: ObjectUniforms =
            bytemuck::pod_read_unaligned(p.backend().uniform_bytes(cmd.object_offset, 80));
        assert_eq!(object.bone_count, 2);
        assert!(object.bone_offset < cmd.object_offset);
        let first_bone: [[f32; 4]; 4] =
            bytemuck::pod_read_unaligned(p.backend().uniform_bytes(object.bone_offset, 64));
        assert_eq!(first_bone, palette[0].to_cols_array_2d());
    }

    #[test]
    fn frame_index_and_timer_advance() {
        let mut p = pipeline(config());
        let mut scene = row_scene(2);
        for i in 0..3 {
            assert_eq!(p.render_frame(&mut scene, &row_camera(), &[]).frame_index, i);
        }
        assert_eq!(p.frame_index(), 3);
        assert_eq!(p.timer().count(), 3);
    }

    #[test]
    fn invalid_config_fails_construction() {
        let err = FramePipeline::new(
            RecordingBackend::new(),
            bindings(),
            FrameTargets::default(),
            SchedulerConfig {
                frames_in_flight: 1,
                ..config()
            },
        );
        assert!(matches!(err, Err(SchedError::InvalidConfig(_))));
    }
}
