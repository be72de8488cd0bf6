//! Offscreen frame with every pass wired to real wgpu resources: shadow
//! map, lit opaque geometry, weighted-blended transparency, bloom, tone map.

use std::num::NonZeroU64;

use strata_common::{
    BindGroupHandle, BufferHandle, ClipDepth, GeometryId, MaterialId, PipelineId, SchedulerConfig,
    TargetId,
};
use strata_frame::{
    CameraView, FramePipeline, FrameStats, FrameTargets, PostChain, PostResources, ProceduralSpec,
    SceneSource, ShadowCascade, StaticScene,
};
use strata_submit::{BindingTable, GeometryBinding};
use strata_uniforms::{ObjectUniforms, ViewUniforms};
use wgpu::util::DeviceExt;

use crate::backend::WgpuBackend;
use crate::headless::{GpuError, HeadlessContext};
use crate::mesh::{self, Vertex};
use crate::shaders;

pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const REVEALAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Float;
pub const LDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

pub const LIT_PIPELINE: PipelineId = PipelineId(0);
pub const UNLIT_PIPELINE: PipelineId = PipelineId(1);
pub const TRANSPARENT_PIPELINE: PipelineId = PipelineId(2);
pub const SHADOW_PIPELINE: PipelineId = PipelineId(3);
const COMPOSITE_PIPELINE: PipelineId = PipelineId(4);
const BLOOM_EXTRACT_PIPELINE: PipelineId = PipelineId(5);
const BLOOM_DOWN_PIPELINE: PipelineId = PipelineId(6);
const BLOOM_UP_PIPELINE: PipelineId = PipelineId(7);
const TONE_MAP_PIPELINE: PipelineId = PipelineId(8);
const RESOLVE_PIPELINE: PipelineId = PipelineId(9);

const VIEW_GROUP: BindGroupHandle = BindGroupHandle(0);
const OBJECT_GROUP: BindGroupHandle = BindGroupHandle(1);
const COMPOSITE_INPUT: BindGroupHandle = BindGroupHandle(2);
const EXTRACT_INPUT: BindGroupHandle = BindGroupHandle(3);
const TONE_MAP_INPUT: BindGroupHandle = BindGroupHandle(4);
const RESOLVE_INPUT: BindGroupHandle = BindGroupHandle(5);
const BLOOM_INPUT_BASE: u32 = 6;
const MATERIAL_GROUP_BASE: u32 = 16;

const CUBE_VERTICES: BufferHandle = BufferHandle(0);
const CUBE_INDICES: BufferHandle = BufferHandle(1);
const CUBE_TRIANGLES: BufferHandle = BufferHandle(2);

const LDR_TARGET: TargetId = TargetId(4);
const OUTPUT_TARGET: TargetId = TargetId(5);
pub const SHADOW_MAP: TargetId = TargetId(6);
const BLOOM_TARGET_BASE: u16 = 8;

const BLOOM_LEVELS: usize = 4;
const SHADOW_MAP_SIZE: u32 = 1024;
pub const DEMO_MATERIALS: u16 = 32;

/// Procedural scene whose transparent candidates use the accumulation
/// pipeline, so every candidate matches a pipeline the demo registers.
pub fn demo_scene(objects: usize) -> StaticScene {
    let mut scene = StaticScene::procedural(&ProceduralSpec {
        objects,
        pipelines: 2,
        materials: DEMO_MATERIALS,
        geometries: 2,
        ..ProceduralSpec::default()
    });
    for i in 0..scene.len() {
        if let Some(c) = scene.candidate_mut(i) {
            if c.transparent {
                c.pipeline = TRANSPARENT_PIPELINE;
            }
        }
    }
    scene
}

/// Bytes per row of a readback copy, padded to the copy alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Fraction of RGBA8 pixels brighter than near-black.
pub fn lit_fraction(pixels: &[u8]) -> f64 {
    let total = pixels.len() / 4;
    if total == 0 {
        return 0.0;
    }
    let lit = pixels
        .chunks_exact(4)
        .filter(|p| p[..3].iter().any(|&c| c > 8))
        .count();
    lit as f64 / total as f64
}

struct Layouts {
    view: wgpu::BindGroupLayout,
    material: wgpu::BindGroupLayout,
    object: wgpu::BindGroupLayout,
    post: wgpu::BindGroupLayout,
}

fn uniform_layout(
    device: &wgpu::Device,
    label: &str,
    visibility: wgpu::ShaderStages,
    dynamic: bool,
    size: u64,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: dynamic,
                min_binding_size: NonZeroU64::new(size),
            },
            count: None,
        }],
    })
}

fn sampled_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

impl Layouts {
    fn new(device: &wgpu::Device) -> Self {
        let view_size = std::mem::size_of::<ViewUniforms>() as u64;
        let object_size = std::mem::size_of::<ObjectUniforms>() as u64;
        Self {
            view: uniform_layout(
                device,
                "view_layout",
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                true,
                view_size,
            ),
            material: uniform_layout(
                device,
                "material_layout",
                wgpu::ShaderStages::FRAGMENT,
                false,
                16,
            ),
            object: uniform_layout(
                device,
                "object_layout",
                wgpu::ShaderStages::VERTEX,
                true,
                object_size,
            ),
            post: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("post_layout"),
                entries: &[
                    sampled_texture_entry(0),
                    sampled_texture_entry(1),
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            }),
        }
    }
}

fn render_texture(
    device: &wgpu::Device,
    label: &str,
    (width, height): (u32, u32),
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | usage,
        view_formats: &[],
    })
}

fn color_targets(
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> [Option<wgpu::ColorTargetState>; 1] {
    [Some(wgpu::ColorTargetState {
        format,
        blend,
        write_mask: wgpu::ColorWrites::ALL,
    })]
}

fn additive() -> wgpu::BlendState {
    let add = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: add,
        alpha: add,
    }
}

/// Revealage multiplies the destination by `1 - alpha`.
fn revealage_blend() -> wgpu::BlendState {
    let reveal = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::OneMinusSrc,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: reveal,
        alpha: reveal,
    }
}

struct MeshPipelineDesc<'a> {
    label: &'a str,
    fragment: Option<(&'a str, &'a [Option<wgpu::ColorTargetState>])>,
    vertex_entry: &'a str,
    depth_write: bool,
    cull_mode: Option<wgpu::Face>,
    bias: wgpu::DepthBiasState,
}

fn mesh_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    desc: MeshPipelineDesc<'_>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(desc.vertex_entry),
            compilation_options: Default::default(),
            buffers: &[Vertex::LAYOUT],
        },
        fragment: desc.fragment.map(|(entry, targets)| wgpu::FragmentState {
            module,
            entry_point: Some(entry),
            compilation_options: Default::default(),
            targets,
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: desc.cull_mode,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: desc.depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: desc.bias,
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    entry: &str,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(entry),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_fullscreen"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(entry),
            compilation_options: Default::default(),
            targets: &color_targets(format, blend),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn install_pipelines(backend: &mut WgpuBackend, layouts: &Layouts) {
    let device = backend.device();
    let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("mesh_pipeline_layout"),
        bind_group_layouts: &[&layouts.view, &layouts.material, &layouts.object],
        push_constant_ranges: &[],
    });
    let post_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("post_pipeline_layout"),
        bind_group_layouts: &[&layouts.post],
        push_constant_ranges: &[],
    });
    let mesh_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("mesh_shader"),
        source: wgpu::ShaderSource::Wgsl(shaders::mesh_shader().into()),
    });
    let depth_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("depth_shader"),
        source: wgpu::ShaderSource::Wgsl(shaders::depth_shader().into()),
    });
    let post_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("post_shader"),
        source: wgpu::ShaderSource::Wgsl(shaders::POST_SHADER.into()),
    });

    let opaque_targets = color_targets(HDR_FORMAT, None);
    let accum_targets = [
        Some(wgpu::ColorTargetState {
            format: HDR_FORMAT,
            blend: Some(additive()),
            write_mask: wgpu::ColorWrites::ALL,
        }),
        Some(wgpu::ColorTargetState {
            format: REVEALAGE_FORMAT,
            blend: Some(revealage_blend()),
            write_mask: wgpu::ColorWrites::ALL,
        }),
    ];

    let pipelines = [
        (
            LIT_PIPELINE,
            mesh_pipeline(device, &mesh_layout, &mesh_module, MeshPipelineDesc {
                label: "lit",
                fragment: Some(("fs_lit", opaque_targets.as_slice())),
                vertex_entry: "vs_main",
                depth_write: true,
                cull_mode: Some(wgpu::Face::Back),
                bias: Default::default(),
            }),
        ),
        (
            UNLIT_PIPELINE,
            mesh_pipeline(device, &mesh_layout, &mesh_module, MeshPipelineDesc {
                label: "unlit",
                fragment: Some(("fs_unlit", opaque_targets.as_slice())),
                vertex_entry: "vs_main",
                depth_write: true,
                cull_mode: Some(wgpu::Face::Back),
                bias: Default::default(),
            }),
        ),
        (
            TRANSPARENT_PIPELINE,
            mesh_pipeline(device, &mesh_layout, &mesh_module, MeshPipelineDesc {
                label: "accumulate",
                fragment: Some(("fs_accumulate", accum_targets.as_slice())),
                vertex_entry: "vs_main",
                depth_write: false,
                cull_mode: None,
                bias: Default::default(),
            }),
        ),
        (
            SHADOW_PIPELINE,
            mesh_pipeline(device, &mesh_layout, &depth_module, MeshPipelineDesc {
                label: "shadow_depth",
                fragment: None,
                vertex_entry: "vs_depth",
                depth_write: true,
                cull_mode: Some(wgpu::Face::Back),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
        ),
        (
            COMPOSITE_PIPELINE,
            fullscreen_pipeline(
                device,
                &post_layout,
                &post_module,
                "fs_composite",
                HDR_FORMAT,
                Some(wgpu::BlendState::ALPHA_BLENDING),
            ),
        ),
        (
            BLOOM_EXTRACT_PIPELINE,
            fullscreen_pipeline(device, &post_layout, &post_module, "fs_bloom_extract", HDR_FORMAT, None),
        ),
        (
            BLOOM_DOWN_PIPELINE,
            fullscreen_pipeline(device, &post_layout, &post_module, "fs_downsample", HDR_FORMAT, None),
        ),
        (
            BLOOM_UP_PIPELINE,
            fullscreen_pipeline(
                device,
                &post_layout,
                &post_module,
                "fs_upsample",
                HDR_FORMAT,
                Some(additive()),
            ),
        ),
        (
            TONE_MAP_PIPELINE,
            fullscreen_pipeline(device, &post_layout, &post_module, "fs_tonemap", LDR_FORMAT, None),
        ),
        (
            RESOLVE_PIPELINE,
            fullscreen_pipeline(device, &post_layout, &post_module, "fs_resolve", OUTPUT_FORMAT, None),
        ),
    ];

    for (id, pipeline) in pipelines {
        backend.insert_pipeline(id, pipeline);
    }
}

fn material_color(index: u16) -> [f32; 4] {
    let hue = index as f32 / DEMO_MATERIALS as f32 * std::f32::consts::TAU;
    [
        0.55 + 0.45 * hue.cos(),
        0.55 + 0.45 * (hue + 2.1).cos(),
        0.55 + 0.45 * (hue + 4.2).cos(),
        0.4,
    ]
}

/// Materials, meshes and the ring-backed view and object groups.
fn install_scene_resources(backend: &mut WgpuBackend, layouts: &Layouts, bindings: &mut BindingTable) {
    let device = backend.device();
    let ring_group = |label: &str, layout: &wgpu::BindGroupLayout, size: usize| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: backend.uniform_ring(),
                    offset: 0,
                    size: NonZeroU64::new(size as u64),
                }),
            }],
        })
    };
    let view_group = ring_group("view_group", &layouts.view, std::mem::size_of::<ViewUniforms>());
    let object_group =
        ring_group("object_group", &layouts.object, std::mem::size_of::<ObjectUniforms>());

    let materials: Vec<wgpu::BindGroup> = (0..DEMO_MATERIALS)
        .map(|m| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("material_buffer"),
                contents: bytemuck::cast_slice(&material_color(m)),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("material_group"),
                layout: &layouts.material,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            })
        })
        .collect();

    let (vertices, indices) = mesh::cube();
    let triangles = mesh::cube_triangles();
    let vertex_buffer = |label: &str, data: &[Vertex]| {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::VERTEX,
        })
    };
    let cube_vertices = vertex_buffer("cube_vertices", &vertices);
    let cube_triangles = vertex_buffer("cube_triangles", &triangles);
    let cube_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("cube_indices"),
        contents: bytemuck::cast_slice(&indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    backend.insert_bind_group(VIEW_GROUP, view_group);
    backend.insert_bind_group(OBJECT_GROUP, object_group);
    for (m, group) in materials.into_iter().enumerate() {
        let handle = BindGroupHandle(MATERIAL_GROUP_BASE + m as u32);
        backend.insert_bind_group(handle, group);
        bindings.register_material(MaterialId(m as u16), handle);
    }
    backend.insert_vertex_buffer(CUBE_VERTICES, cube_vertices);
    backend.insert_index_buffer(CUBE_INDICES, cube_indices, wgpu::IndexFormat::Uint16);
    backend.insert_vertex_buffer(CUBE_TRIANGLES, cube_triangles);

    bindings.register_geometry(
        GeometryId(0),
        GeometryBinding {
            vertex_buffer: CUBE_VERTICES,
            index_buffer: Some(CUBE_INDICES),
            element_count: indices.len() as u32,
        },
    );
    bindings.register_geometry(
        GeometryId(1),
        GeometryBinding {
            vertex_buffer: CUBE_TRIANGLES,
            index_buffer: None,
            element_count: triangles.len() as u32,
        },
    );
    for id in [LIT_PIPELINE, UNLIT_PIPELINE, TRANSPARENT_PIPELINE, SHADOW_PIPELINE] {
        bindings.register_pipeline(id);
    }
}

/// Offscreen targets plus the post bind groups that sample them. Returns
/// the output texture for readback.
fn install_targets(
    backend: &mut WgpuBackend,
    layouts: &Layouts,
    targets: &FrameTargets,
    size: (u32, u32),
) -> (wgpu::Texture, Vec<(TargetId, BindGroupHandle)>) {
    let device = backend.device();
    let sampled = wgpu::TextureUsages::TEXTURE_BINDING;
    let main_color = render_texture(device, "main_color", size, HDR_FORMAT, sampled);
    let main_depth = render_texture(device, "main_depth", size, DEPTH_FORMAT, wgpu::TextureUsages::empty());
    let accum = render_texture(device, "accum", size, HDR_FORMAT, sampled);
    let revealage = render_texture(device, "revealage", size, REVEALAGE_FORMAT, sampled);
    let ldr = render_texture(device, "ldr", size, LDR_FORMAT, sampled);
    let output = render_texture(device, "output", size, OUTPUT_FORMAT, wgpu::TextureUsages::COPY_SRC);
    let shadow_map = render_texture(
        device,
        "shadow_map",
        (SHADOW_MAP_SIZE, SHADOW_MAP_SIZE),
        DEPTH_FORMAT,
        sampled,
    );
    let bloom: Vec<wgpu::Texture> = (0..BLOOM_LEVELS)
        .map(|i| {
            let mip = (size.0 >> (i + 1), size.1 >> (i + 1));
            render_texture(device, "bloom_mip", mip, HDR_FORMAT, sampled)
        })
        .collect();

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("post_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });
    let view = |t: &wgpu::Texture| t.create_view(&wgpu::TextureViewDescriptor::default());
    let post_group = |primary: &wgpu::Texture, secondary: &wgpu::Texture| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("post_input"),
            layout: &layouts.post,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view(primary)),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view(secondary)),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        })
    };

    let mut groups = vec![
        (COMPOSITE_INPUT, post_group(&accum, &revealage)),
        (EXTRACT_INPUT, post_group(&main_color, &main_color)),
        (TONE_MAP_INPUT, post_group(&main_color, &bloom[0])),
        (RESOLVE_INPUT, post_group(&ldr, &ldr)),
    ];
    let mut mips = Vec::with_capacity(BLOOM_LEVELS);
    for (i, texture) in bloom.iter().enumerate() {
        let handle = BindGroupHandle(BLOOM_INPUT_BASE + i as u32);
        groups.push((handle, post_group(texture, texture)));
        mips.push((TargetId(BLOOM_TARGET_BASE + i as u16), handle));
    }

    let views = [
        (targets.main_color, view(&main_color)),
        (targets.main_depth, view(&main_depth)),
        (targets.accum, view(&accum)),
        (targets.revealage, view(&revealage)),
        (LDR_TARGET, view(&ldr)),
        (OUTPUT_TARGET, view(&output)),
        (SHADOW_MAP, view(&shadow_map)),
    ];
    let bloom_views: Vec<wgpu::TextureView> = bloom.iter().map(view).collect();

    for (handle, group) in groups {
        backend.insert_bind_group(handle, group);
    }
    for (id, v) in views {
        backend.insert_target(id, v);
    }
    for ((id, _), v) in mips.iter().zip(bloom_views) {
        backend.insert_target(*id, v);
    }
    (output, mips)
}

/// A [`FramePipeline`] driving real GPU passes into an offscreen image.
pub struct GpuDemo {
    frame: FramePipeline<WgpuBackend>,
    output: wgpu::Texture,
    width: u32,
    height: u32,
}

impl GpuDemo {
    /// Forces zero-to-one clip depth and raises the uniform alignment to
    /// the device minimum.
    pub fn new(
        ctx: HeadlessContext,
        width: u32,
        height: u32,
        mut config: SchedulerConfig,
    ) -> Result<Self, GpuError> {
        config.clip_depth = ClipDepth::ZeroToOne;
        config.uniform_alignment = config.uniform_alignment.max(ctx.uniform_alignment());
        config.validate()?;

        let ring_size = (config.uniform_region_size() * config.frames_in_flight) as u64;
        let mut backend = WgpuBackend::new(ctx.device, ctx.queue, ring_size);
        let layouts = Layouts::new(backend.device());
        let targets = FrameTargets::default();
        let mut bindings = BindingTable::new(VIEW_GROUP, OBJECT_GROUP);

        install_pipelines(&mut backend, &layouts);
        install_scene_resources(&mut backend, &layouts, &mut bindings);
        let (output, mips) = install_targets(&mut backend, &layouts, &targets, (width, height));

        let post = PostChain::standard(
            &PostResources {
                composite: (COMPOSITE_PIPELINE, COMPOSITE_INPUT),
                bloom_extract: (BLOOM_EXTRACT_PIPELINE, EXTRACT_INPUT),
                bloom_down: BLOOM_DOWN_PIPELINE,
                bloom_up: BLOOM_UP_PIPELINE,
                tone_map: (TONE_MAP_PIPELINE, TONE_MAP_INPUT),
                resolve: (RESOLVE_PIPELINE, RESOLVE_INPUT),
                scene_color: targets.main_color,
                ldr: LDR_TARGET,
                output: OUTPUT_TARGET,
            },
            &mips,
            BLOOM_LEVELS - 1,
        );

        let frame = FramePipeline::new(backend, bindings, targets, config)?
            .with_post_chain(post)
            .with_shadow_pipeline(SHADOW_PIPELINE);
        tracing::info!(width, height, "gpu demo ready");
        Ok(Self {
            frame,
            output,
            width,
            height,
        })
    }

    pub fn render<S: SceneSource + ?Sized>(
        &mut self,
        scene: &mut S,
        camera: &CameraView,
        cascades: &[ShadowCascade],
    ) -> &FrameStats {
        self.frame.render_frame(scene, camera, cascades)
    }

    pub fn pipeline(&self) -> &FramePipeline<WgpuBackend> {
        &self.frame
    }

    pub fn pipeline_mut(&mut self) -> &mut FramePipeline<WgpuBackend> {
        &mut self.frame
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Copy the resolved output to host memory as tightly packed RGBA8 rows.
    pub fn read_output(&self) -> Result<Vec<u8>, GpuError> {
        let backend = self.frame.backend();
        let device = backend.device();
        let unpadded = (self.width * 4) as usize;
        let padded = padded_bytes_per_row(self.width);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size: padded as u64 * self.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.output,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        backend.queue().submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| GpuError::Readback(e.to_string()))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;

        let mut pixels = Vec::with_capacity(unpadded * self.height as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded]);
            }
        }
        buffer.unmap();
        Ok(pixels)
    }
}
