use strata_common::{
    BindGroupHandle, BufferHandle, PipelineId, SchedError, UnknownIdPolicy,
};
use strata_sort::DrawCommand;

use crate::backend::RenderBackend;
use crate::bindings::BindingTable;

/// Per-pass view data, bound with the pass's dynamic offset.
pub const VIEW_SLOT: u32 = 0;
pub const MATERIAL_SLOT: u32 = 1;
/// Per-draw data; rebound for every draw.
pub const OBJECT_SLOT: u32 = 2;

/// Mirror of what the backend currently has bound. `None` is the
/// "nothing known" sentinel every pass starts from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingState {
    pub pipeline: Option<PipelineId>,
    pub view_offset: Option<u32>,
    pub material: Option<BindGroupHandle>,
    pub vertex: Option<BufferHandle>,
    pub index: Option<BufferHandle>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitCounters {
    pub draw_calls: u32,
    pub triangles: u64,
    pub pipeline_binds: u32,
    /// View and material group binds.
    pub bind_group_binds: u32,
    pub object_binds: u32,
    pub buffer_binds: u32,
    /// Commands dropped for unknown ids.
    pub skipped: u32,
}

impl SubmitCounters {
    pub fn state_changes(&self) -> u32 {
        self.pipeline_binds + self.bind_group_binds + self.buffer_binds
    }

    pub fn add(&mut self, other: &SubmitCounters) {
        self.draw_calls += other.draw_calls;
        self.triangles += other.triangles;
        self.pipeline_binds += other.pipeline_binds;
        self.bind_group_binds += other.bind_group_binds;
        self.object_binds += other.object_binds;
        self.buffer_binds += other.buffer_binds;
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Default)]
pub struct SubmitReport {
    pub counters: SubmitCounters,
    /// First unknown id met, kept for the caller's warning.
    pub first_unknown: Option<SchedError>,
}

/// Turns a sorted command list into the shortest bind/draw sequence.
#[derive(Debug)]
pub struct StateCache {
    state: BindingState,
    policy: UnknownIdPolicy,
}

impl StateCache {
    pub fn new(policy: UnknownIdPolicy) -> Self {
        Self {
            state: BindingState::default(),
            policy,
        }
    }

    /// Forget all bindings. Call at the start of every pass.
    pub fn reset(&mut self) {
        self.state = BindingState::default();
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    pub fn policy(&self) -> UnknownIdPolicy {
        self.policy
    }

    /// Emit binds and draws for `commands`, in order.
    ///
    /// # Panics
    /// With [`UnknownIdPolicy::Panic`], on the first command whose pipeline,
    /// material or geometry is not in `table`.
    pub fn submit<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        table: &BindingTable,
        view_offset: u32,
        commands: &[DrawCommand],
    ) -> SubmitReport {
        let mut report = SubmitReport::default();
        let c = &mut report.counters;

        for cmd in commands {
            let (material_group, geometry) =
                match table.resolve(cmd.pipeline, cmd.material, cmd.geometry) {
                    Ok(resolved) => resolved,
                    Err(err) => {
                        if self.policy == UnknownIdPolicy::Panic {
                            panic!("draw command from candidate {} references {err}", cmd.source);
                        }
                        c.skipped += 1;
                        report.first_unknown.get_or_insert(err);
                        continue;
                    }
                };

            if self.state.pipeline != Some(cmd.pipeline) {
                backend.bind_pipeline(cmd.pipeline);
                self.state.pipeline = Some(cmd.pipeline);
                // A new pipeline may have a different layout.
                self.state.view_offset = None;
                self.state.material = None;
                c.pipeline_binds += 1;
            }

            if self.state.view_offset != Some(view_offset) {
                backend.bind_group(VIEW_SLOT, table.view_group(), Some(view_offset));
                self.state.view_offset = Some(view_offset);
                c.bind_group_binds += 1;
            }

            if self.state.material != Some(material_group) {
                backend.bind_group(MATERIAL_SLOT, material_group, None);
                self.state.material = Some(material_group);
                c.bind_group_binds += 1;
            }

            backend.bind_group(OBJECT_SLOT, table.object_group(), Some(cmd.object_offset));
            c.object_binds += 1;

            if self.state.vertex != Some(geometry.vertex_buffer) {
                backend.bind_vertex_buffer(0, geometry.vertex_buffer);
                self.state.vertex = Some(geometry.vertex_buffer);
                c.buffer_binds += 1;
            }

            match geometry.index_buffer {
                Some(index) => {
                    if self.state.index != Some(index) {
                        backend.bind_index_buffer(index);
                        self.state.index = Some(index);
                        c.buffer_binds += 1;
                    }
                    backend.draw_indexed(geometry.element_count, 1);
                }
                None => backend.draw(geometry.element_count, 1),
            }
            c.draw_calls += 1;
            c.triangles += geometry.triangles() as u64;
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::GeometryBinding;
    use crate::recorder::{BackendCall, RecordingBackend};
    use strata_common::{GeometryId, MaterialId};

    const A: PipelineId = PipelineId(1);
    const B: PipelineId = PipelineId(2);

    fn table() -> BindingTable {
        let mut t = BindingTable::new(BindGroupHandle(900), BindGroupHandle(901));
        for p in 0..8 {
            t.register_pipeline(PipelineId(p));
        }
        for m in 0..8 {
            t.register_material(MaterialId(m), BindGroupHandle(100 + m as u32));
        }
        t.register_geometry(
            GeometryId(0),
            GeometryBinding {
                vertex_buffer: BufferHandle(10),
                index_buffer: Some(BufferHandle(11)),
                element_count: 36,
            },
        );
        t.register_geometry(
            GeometryId(1),
            GeometryBinding {
                vertex_buffer: BufferHandle(20),
                index_buffer: None,
                element_count: 6,
            },
        );
        t
    }

    fn cmd(pipeline: PipelineId, material: u16, geometry: u32, source: u32) -> DrawCommand {
        DrawCommand {
            pipeline,
            material: MaterialId(material),
            geometry: GeometryId(geometry),
            source,
            object_offset: source * 256,
            ..DrawCommand::default()
        }
    }

    fn runs(pipelines: &[PipelineId]) -> u32 {
        pipelines.windows(2).filter(|w| w[0] != w[1]).count() as u32 + 1
    }

    #[test]
    fn pipeline_binds_follow_runs() {
        // [A, A, B, B, A] binds A, B, A.
        let commands: Vec<DrawCommand> = [A, A, B, B, A]
            .iter()
            .enumerate()
            .map(|(i, p)| cmd(*p, 0, 0, i as u32))
            .collect();
        let mut backend = RecordingBackend::new();
        let mut cache = StateCache::new(UnknownIdPolicy::Skip);
        let report = cache.submit(&mut backend, &table(), 0, &commands);

        assert_eq!(report.counters.pipeline_binds, 3);
        assert_eq!(backend.pipeline_binds(), 3);
        assert_eq!(report.counters.draw_calls, 5);
        assert_eq!(report.counters.object_binds, 5);
    }

    #[test]
    fn pipeline_binds_equal_runs_for_random_sequences() {
        let mut state = 0xdead_beefu64;
        for _ in 0..50 {
            let pipelines: Vec<PipelineId> = (0..40)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    PipelineId((state % 3) as u16)
                })
                .collect();
            let commands: Vec<DrawCommand> = pipelines
                .iter()
                .enumerate()
                .map(|(i, p)| cmd(*p, (i % 2) as u16, 0, i as u32))
                .collect();
            let mut backend = RecordingBackend::new();
            let mut cache = StateCache::new(UnknownIdPolicy::Skip);
            let report = cache.submit(&mut backend, &table(), 0, &commands);
            assert_eq!(report.counters.pipeline_binds, runs(&pipelines));
        }
    }

    #[test]
    fn pipeline_change_rebinds_view_and_material() {
        let commands = [cmd(A, 3, 0, 0), cmd(B, 3, 0, 1)];
        let mut backend = RecordingBackend::new();
        let mut cache = StateCache::new(UnknownIdPolicy::Skip);
        let report = cache.submit(&mut backend, &table(), 512, &commands);

        let material_binds = backend.count(|c| {
            matches!(c, BackendCall::BindGroup { slot: MATERIAL_SLOT, .. })
        });
        let view_binds = backend.count(|c| {
            matches!(c, BackendCall::BindGroup { slot: VIEW_SLOT, offset: Some(512), .. })
        });
        assert_eq!(material_binds, 2);
        assert_eq!(view_binds, 2);
        assert_eq!(report.counters.bind_group_binds, 4);
    }

    #[test]
    fn same_state_only_rebinds_object_group() {
        let commands = [cmd(A, 1, 0, 0), cmd(A, 1, 0, 1), cmd(A, 1, 0, 2)];
        let mut backend = RecordingBackend::new();
        let mut cache = StateCache::new(UnknownIdPolicy::Skip);
        cache.submit(&mut backend, &table(), 0, &commands);

        let calls = backend.calls();
        // pipeline, view, material, object, vertex, index, draw
        assert_eq!(calls.len(), 7 + 2 * 2);
        let object_offsets: Vec<Option<u32>> = calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::BindGroup {
                    slot: OBJECT_SLOT,
                    offset,
                    ..
                } => Some(*offset),
                _ => None,
            })
            .collect();
        assert_eq!(object_offsets, [Some(0), Some(256), Some(512)]);
    }

    #[test]
    fn cache_mirrors_last_command_exactly() {
        let t = table();
        let commands = [cmd(A, 1, 0, 0), cmd(B, 2, 1, 1), cmd(B, 4, 0, 2)];
        let mut backend = RecordingBackend::new();
        let mut cache = StateCache::new(UnknownIdPolicy::Skip);
        for c in &commands {
            cache.submit(&mut backend, &t, 0, std::slice::from_ref(c));
            let (group, geom) = t.resolve(c.pipeline, c.material, c.geometry).unwrap();
            let s = cache.state();
            assert_eq!(s.pipeline, Some(c.pipeline));
            assert_eq!(s.material, Some(group));
            assert_eq!(s.vertex, Some(geom.vertex_buffer));
            assert_eq!(s.view_offset, Some(0));
        }
    }

    #[test]
    fn non_indexed_geometry_uses_draw() {
        let mut backend = RecordingBackend::new();
        let mut cache = StateCache::new(UnknownIdPolicy::Skip);
        let report = cache.submit(&mut backend, &table(), 0, &[cmd(A, 0, 1, 0)]);
        assert!(backend.calls().contains(&BackendCall::Draw {
            vertices: 6,
            instances: 1
        }));
        assert_eq!(report.counters.triangles, 2);
    }

    #[test]
    fn unknown_ids_are_skipped_without_touching_state() {
        let commands = [cmd(A, 0, 0, 0), cmd(PipelineId(99), 0, 0, 1), cmd(A, 77, 0, 2)];
        let mut backend = RecordingBackend::new();
        let mut cache = StateCache::new(UnknownIdPolicy::Skip);
        let report = cache.submit(&mut backend, &table(), 0, &commands);

        assert_eq!(report.counters.skipped, 2);
        assert_eq!(report.counters.draw_calls, 1);
        assert!(matches!(
            report.first_unknown,
            Some(SchedError::UnknownPipeline(PipelineId(99)))
        ));
        assert_eq!(cache.state().pipeline, Some(A));
    }

    #[test]
    #[should_panic(expected = "unknown material")]
    fn unknown_ids_panic_under_strict_policy() {
        let mut backend = RecordingBackend::new();
        let mut cache = StateCache::new(UnknownIdPolicy::Panic);
        cache.submit(&mut backend, &table(), 0, &[cmd(A, 200, 0, 0)]);
    }

    #[test]
    fn reset_forces_full_rebind() {
        let t = table();
        let mut backend = RecordingBackend::new();
        let mut cache = StateCache::new(UnknownIdPolicy::Skip);
        cache.submit(&mut backend, &t, 0, &[cmd(A, 0, 0, 0)]);
        cache.reset();
        assert_eq!(cache.state(), BindingState::default());
        let report = cache.submit(&mut backend, &t, 0, &[cmd(A, 0, 0, 1)]);
        assert_eq!(report.counters.pipeline_binds, 1);
        assert_eq!(report.counters.buffer_binds, 2);
    }
}
