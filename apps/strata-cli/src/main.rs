use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use glam::{Mat4, Vec3};
use strata_common::{
    Aabb, BindGroupHandle, BufferHandle, Candidate, ClipDepth, GeometryId, Layer, MaterialId,
    PassKind, PipelineId, SchedulerConfig, TargetId, TransformRef, UnknownIdPolicy,
};
use strata_cull::{Frustum, aabb_visible};
use strata_frame::{
    Camera, FramePipeline, FrameTargets, ProceduralSpec, ShadowCascade, StaticScene, unit_cube,
};
use strata_render_wgpu::{GpuDemo, HeadlessContext, SHADOW_MAP, demo_scene, lit_fraction};
use strata_sort::{DepthRange, DrawCommand, KeyEncoder, KeyInput, RadixSorter};
use strata_submit::{BindingTable, GeometryBinding, RecordingBackend, StateCache};
use tracing_subscriber::EnvFilter;

const SIM_PIPELINES: u16 = 8;
const SIM_MATERIALS: u16 = 64;
const SHADOW_PIPELINE: PipelineId = PipelineId(SIM_PIPELINES);

#[derive(Parser)]
#[command(name = "strata-cli", about = "Per-frame render command scheduler driver")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Render frames of a procedural scene into the recording backend
    Simulate {
        /// Number of scene objects
        #[arg(short, long, default_value = "1000")]
        objects: usize,
        /// Number of frames to render
        #[arg(short, long, default_value = "60")]
        frames: u64,
        /// Scheduler config (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print per-frame stats as JSON lines
        #[arg(long)]
        json: bool,
        /// Replay sorted static commands between frames
        #[arg(long)]
        static_cache: bool,
        /// Keep the camera fixed instead of orbiting
        #[arg(long)]
        still: bool,
    },
    /// Run one of the reference scenarios and print its outcome
    Scenario {
        #[arg(value_enum)]
        name: Scenario,
    },
    /// Render one frame on a headless GPU device
    Gpu {
        #[arg(short, long, default_value = "2000")]
        objects: usize,
        #[arg(long, default_value = "640")]
        width: u32,
        #[arg(long, default_value = "360")]
        height: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Scenario {
    /// Opaque key ordering
    A,
    /// Far-plane culling
    B,
    /// Command pool overflow
    C,
    /// Pipeline bind elision
    D,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Info => {
            println!("strata-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", strata_common::crate_info());
            println!("cull: {}", strata_cull::crate_info());
            println!("sort: {}", strata_sort::crate_info());
            println!("uniforms: {}", strata_uniforms::crate_info());
            println!("submit: {}", strata_submit::crate_info());
            println!("frame: {}", strata_frame::crate_info());
            println!("render-wgpu: {}", strata_render_wgpu::crate_info());
        }
        Commands::Simulate {
            objects,
            frames,
            config,
            json,
            static_cache,
            still,
        } => simulate(objects, frames, config, json, static_cache, still)?,
        Commands::Scenario { name } => match name {
            Scenario::A => scenario_sort()?,
            Scenario::B => scenario_cull(),
            Scenario::C => scenario_capacity()?,
            Scenario::D => scenario_state_cache(),
        },
        Commands::Gpu {
            objects,
            width,
            height,
        } => gpu(objects, width, height)?,
    }

    Ok(())
}

fn sim_bindings(pipelines: u16, materials: u16) -> BindingTable {
    let mut table = BindingTable::new(BindGroupHandle(0), BindGroupHandle(1));
    for p in 0..=pipelines {
        table.register_pipeline(PipelineId(p));
    }
    for m in 0..materials {
        table.register_material(MaterialId(m), BindGroupHandle(16 + m as u32));
    }
    for g in 0..2 {
        table.register_geometry(
            GeometryId(g),
            GeometryBinding {
                vertex_buffer: BufferHandle(g * 2),
                index_buffer: Some(BufferHandle(g * 2 + 1)),
                element_count: 36,
            },
        );
    }
    table
}

fn simulate(
    objects: usize,
    frames: u64,
    config_path: Option<PathBuf>,
    json: bool,
    static_cache: bool,
    still: bool,
) -> anyhow::Result<()> {
    let mut config = match &config_path {
        Some(path) => SchedulerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SchedulerConfig {
            max_candidates: objects.max(1),
            max_draws_per_pass: objects.max(1),
            uniform_bytes_per_frame: (objects * 2 + 16).max(64) * 256,
            ..SchedulerConfig::default()
        },
    };
    config.static_cache |= static_cache;

    let mut scene = StaticScene::procedural(&ProceduralSpec {
        objects,
        pipelines: SIM_PIPELINES,
        materials: SIM_MATERIALS,
        ..ProceduralSpec::default()
    });
    let mut pipeline = FramePipeline::new(
        RecordingBackend::new(),
        sim_bindings(SIM_PIPELINES, SIM_MATERIALS),
        FrameTargets::default(),
        config.clone(),
    )?
    .with_shadow_pipeline(SHADOW_PIPELINE);

    let mut camera = Camera {
        clip_depth: config.clip_depth,
        ..Camera::default()
    };
    let radius = (objects as f32).sqrt() * 3.0;
    camera.look_at(Vec3::new(0.0, radius * 0.5, radius), Vec3::ZERO);
    let cascades = [ShadowCascade::orthographic_fit(
        Vec3::new(-0.4, -1.0, -0.3),
        Vec3::ZERO,
        radius,
        config.clip_depth,
        TargetId(16),
    )];

    tracing::info!(
        objects,
        frames,
        config = ?config_path,
        static_cache = config.static_cache,
        clip_depth = ?config.clip_depth,
        "simulation starting"
    );
    println!("Simulating {objects} objects for {frames} frames (static cache: {})", config.static_cache);
    for frame in 0..frames {
        let t = frame as f32 / 60.0;
        scene.animate(t);
        if !still {
            camera.orbit(Vec3::ZERO, radius, radius * 0.5, t * 0.2);
        }
        pipeline.backend_mut().clear();
        let stats = pipeline.render_frame(&mut scene, &camera.to_view(), &cascades);
        if json {
            println!("{}", serde_json::to_string(stats)?);
        } else {
            println!("{stats}");
        }
    }

    let timer = pipeline.timer();
    println!(
        "Frame time over {} frames: avg {:?}, min {:?}, max {:?}",
        timer.count(),
        timer.average(),
        timer.min(),
        timer.max()
    );
    Ok(())
}

fn scenario_sort() -> anyhow::Result<()> {
    let encoder = KeyEncoder::new(DepthRange::new(0.1, 10.0));
    let (a, b) = (PipelineId(1), PipelineId(2));
    let input = [("C1", a, 1, 5.0), ("C2", b, 2, 1.0), ("C3", a, 1, 3.0)];
    let mut commands: Vec<DrawCommand> = input
        .iter()
        .enumerate()
        .map(|(i, &(_, pipeline, material, depth))| DrawCommand {
            key: encoder.encode(&KeyInput {
                layer: Layer::World,
                pass: PassKind::Opaque,
                transparent: false,
                pipeline,
                material: MaterialId(material),
                depth,
            }),
            pipeline,
            source: i as u32,
            ..DrawCommand::default()
        })
        .collect();

    RadixSorter::with_capacity(commands.len())?.sort(&mut commands)?;
    let order: Vec<&str> = commands.iter().map(|c| input[c.source as usize].0).collect();
    println!("Scenario A: sorted order {}", order.join(", "));
    println!("Expected C3, C1, C2: {}", if order == ["C3", "C1", "C2"] { "OK" } else { "MISMATCH" });
    Ok(())
}

fn scenario_cull() {
    let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::Z, Vec3::Y);
    let projection = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 200.0);
    let frustum = Frustum::from_view_projection(&(projection * view), ClipDepth::NegativeOneToOne);

    let far_away = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 1000.0), Vec3::ONE);
    let straddling = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 199.5), Vec3::ONE);
    let (a, b) = (aabb_visible(&frustum, &far_away), aabb_visible(&frustum, &straddling));
    println!("Scenario B: far plane at 200");
    println!("  box at z=1000: {}", if a { "kept" } else { "culled" });
    println!("  box at z=199.5: {}", if b { "kept" } else { "culled" });
    println!("Expected culled, kept: {}", if !a && b { "OK" } else { "MISMATCH" });
}

fn scenario_capacity() -> anyhow::Result<()> {
    let mut scene = StaticScene::new();
    for x in [-2.0, 0.0, 2.0] {
        let candidate = Candidate {
            casts_shadow: false,
            ..Candidate::new(
                unit_cube(),
                TransformRef(0),
                PipelineId(0),
                MaterialId(0),
                GeometryId(0),
            )
        };
        scene.push(candidate, Mat4::from_translation(Vec3::new(x, 0.0, 0.0)), unit_cube());
    }
    let config = SchedulerConfig {
        max_draws_per_pass: 2,
        ..SchedulerConfig::default()
    };
    let mut pipeline = FramePipeline::new(
        RecordingBackend::new(),
        sim_bindings(1, 1),
        FrameTargets::default(),
        config,
    )?;
    let mut camera = Camera::default();
    camera.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);

    let stats = pipeline.render_frame(&mut scene, &camera.to_view(), &[]).clone();
    println!("Scenario C: 3 submissions into a pool of capacity 2");
    println!(
        "  retained {}, dropped {}, draws {}",
        pipeline.opaque_commands().len(),
        stats.commands_dropped,
        stats.draw_calls
    );
    let ok = pipeline.opaque_commands().len() == 2 && stats.commands_dropped == 1;
    println!("Frame completed: {}", if ok { "OK" } else { "MISMATCH" });
    Ok(())
}

fn scenario_state_cache() {
    let (a, b) = (PipelineId(0), PipelineId(1));
    let commands: Vec<DrawCommand> = [a, a, b, b, a]
        .iter()
        .enumerate()
        .map(|(i, &pipeline)| DrawCommand {
            pipeline,
            source: i as u32,
            ..DrawCommand::default()
        })
        .collect();

    let mut backend = RecordingBackend::new();
    let mut cache = StateCache::new(UnknownIdPolicy::Skip);
    let report = cache.submit(&mut backend, &sim_bindings(1, 1), 0, &commands);
    println!("Scenario D: pipelines [A, A, B, B, A]");
    println!(
        "  pipeline binds {}, draws {}, state changes {}",
        report.counters.pipeline_binds,
        report.counters.draw_calls,
        report.counters.state_changes()
    );
    println!(
        "Expected 3 pipeline binds: {}",
        if backend.pipeline_binds() == 3 { "OK" } else { "MISMATCH" }
    );
}

fn gpu(objects: usize, width: u32, height: u32) -> anyhow::Result<()> {
    let ctx = HeadlessContext::new().context("headless GPU unavailable")?;
    println!("Adapter: {} ({:?})", ctx.adapter_info.name, ctx.adapter_info.backend);

    let config = SchedulerConfig {
        max_candidates: objects.max(1),
        max_draws_per_pass: objects.max(1),
        uniform_bytes_per_frame: (objects * 2 + 16).max(64) * 256,
        ..SchedulerConfig::default()
    };
    tracing::debug!(objects, width, height, "building gpu demo");
    let mut demo = GpuDemo::new(ctx, width, height, config)?;
    let mut scene = demo_scene(objects);

    let mut camera = Camera {
        aspect: width as f32 / height.max(1) as f32,
        clip_depth: ClipDepth::ZeroToOne,
        ..Camera::default()
    };
    let radius = (objects as f32).sqrt() * 3.0;
    camera.look_at(Vec3::new(0.0, radius * 0.5, radius), Vec3::ZERO);
    let cascade = ShadowCascade::orthographic_fit(
        Vec3::new(-0.4, -1.0, -0.3),
        Vec3::ZERO,
        radius,
        ClipDepth::ZeroToOne,
        SHADOW_MAP,
    );

    let stats = demo.render(&mut scene, &camera.to_view(), &[cascade]).clone();
    println!("{stats}");
    let pixels = demo.read_output()?;
    println!(
        "Output {}x{}: {:.1}% lit",
        width,
        height,
        lit_fraction(&pixels) * 100.0
    );
    Ok(())
}
