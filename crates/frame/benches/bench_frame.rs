use std::hint::black_box;
use std::time::Instant;

use glam::Vec3;
use strata_common::{
    BindGroupHandle, BufferHandle, ClipDepth, GeometryId, MaterialId, PipelineId, SchedulerConfig,
    TargetId, UnknownIdPolicy,
};
use strata_cull::{FrustumExtractor, VisibilityFilter};
use strata_frame::{
    Camera, FramePipeline, FrameTargets, ProceduralSpec, SceneSource, ShadowCascade, StaticScene,
};
use strata_sort::{DepthRange, DrawCommand, KeyEncoder, KeyInput, RadixSorter};
use strata_submit::{BindingTable, GeometryBinding, RecordingBackend};

const SHADOW_PIPELINE: PipelineId = PipelineId(8);

fn make_scene(objects: usize) -> StaticScene {
    StaticScene::procedural(&ProceduralSpec {
        objects,
        pipelines: 8,
        materials: 64,
        ..ProceduralSpec::default()
    })
}

fn camera() -> Camera {
    let mut cam = Camera::default();
    cam.look_at(Vec3::new(0.0, 60.0, 90.0), Vec3::ZERO);
    cam
}

fn bindings() -> BindingTable {
    let mut t = BindingTable::new(BindGroupHandle(0), BindGroupHandle(1));
    for p in 0..=SHADOW_PIPELINE.0 {
        t.register_pipeline(PipelineId(p));
    }
    for m in 0..64 {
        t.register_material(MaterialId(m), BindGroupHandle(10 + m as u32));
    }
    for g in 0..2 {
        t.register_geometry(
            GeometryId(g),
            GeometryBinding {
                vertex_buffer: BufferHandle(g * 2),
                index_buffer: Some(BufferHandle(g * 2 + 1)),
                element_count: 36,
            },
        );
    }
    t
}

fn bench_cull(objects: usize, iterations: usize) {
    let scene = make_scene(objects);
    let view_proj = camera().view_projection();
    let mut extractor = FrustumExtractor::new(ClipDepth::default());
    let mut filter = VisibilityFilter::with_capacity(objects).expect("filter");

    let start = Instant::now();
    for _ in 0..iterations {
        let frustum = extractor.extract(black_box(&view_proj));
        black_box(filter.filter(&frustum, black_box(scene.candidates())).len());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  cull ({objects} objects, {iterations} iters): {per_iter:?}/iter, visible {}",
        filter.visible().len()
    );
}

fn bench_sort(count: usize, iterations: usize) {
    let encoder = KeyEncoder::new(DepthRange::new(0.1, 1000.0));
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let commands: Vec<DrawCommand> = (0..count)
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let key = encoder.encode(&KeyInput {
                layer: Default::default(),
                pass: Default::default(),
                transparent: false,
                pipeline: PipelineId((state % 16) as u16),
                material: MaterialId((state >> 16) as u16),
                depth: (state >> 40) as f32 / (1u64 << 24) as f32 * 1000.0,
            });
            DrawCommand {
                key,
                source: i as u32,
                ..DrawCommand::default()
            }
        })
        .collect();
    let mut sorter = RadixSorter::with_capacity(count).expect("sorter");
    let mut work = commands.clone();

    let start = Instant::now();
    for _ in 0..iterations {
        work.copy_from_slice(&commands);
        sorter.sort(black_box(&mut work)).expect("sort");
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  radix sort ({count} commands, {iterations} iters): {per_iter:?}/iter");
}

fn bench_frame(objects: usize, iterations: usize, static_cache: bool) {
    let mut scene = make_scene(objects);
    let cam = camera();
    let view = cam.to_view();
    let cascades = [ShadowCascade::orthographic_fit(
        Vec3::new(-0.4, -1.0, -0.3),
        Vec3::ZERO,
        80.0,
        cam.clip_depth,
        TargetId(16),
    )];
    let config = SchedulerConfig {
        max_candidates: objects,
        max_draws_per_pass: objects,
        uniform_bytes_per_frame: (objects * 2 + 8) * 256,
        static_cache,
        unknown_id_policy: UnknownIdPolicy::Skip,
        ..SchedulerConfig::default()
    };
    let mut pipeline = FramePipeline::new(
        RecordingBackend::new(),
        bindings(),
        FrameTargets::default(),
        config,
    )
    .expect("pipeline")
    .with_shadow_pipeline(SHADOW_PIPELINE);

    let start = Instant::now();
    for i in 0..iterations {
        scene.animate(i as f32 * 0.016);
        pipeline.backend_mut().clear();
        black_box(pipeline.render_frame(&mut scene, black_box(&view), &cascades));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    let stats = pipeline.stats();
    println!(
        "  frame ({objects} objects, cache={static_cache}, {iterations} iters): {per_iter:?}/iter, draws {}, state changes {}",
        stats.draw_calls, stats.state_changes
    );
}

fn main() {
    println!("=== Frame Scheduler Benchmarks ===\n");

    println!("Frustum cull:");
    bench_cull(1000, 10000);
    bench_cull(10000, 1000);

    println!("\nRadix sort:");
    bench_sort(1000, 10000);
    bench_sort(4096, 2000);
    bench_sort(16384, 500);

    println!("\nFull frame (shadow + opaque + transparent):");
    bench_frame(1000, 1000, false);
    bench_frame(1000, 1000, true);
    bench_frame(4096, 200, false);
    bench_frame(4096, 200, true);

    println!("\n=== Done ===");
}
