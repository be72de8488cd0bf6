/// Shared uniform declarations. Layouts match `ViewUniforms` and
/// `ObjectUniforms` byte for byte.
const UNIFORMS: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
    position: vec4<f32>,
    near: f32,
    far: f32,
    _pad: vec2<f32>,
};

struct Material {
    color: vec4<f32>,
};

struct Object {
    world: mat4x4<f32>,
    palette_index: u32,
    bone_offset: u32,
    bone_count: u32,
    _pad: u32,
};

@group(0) @binding(0)
var<uniform> camera: Camera;

@group(1) @binding(0)
var<uniform> material: Material;

@group(2) @binding(0)
var<uniform> draw_object: Object;
"#;

/// Lit opaque and weighted-blended transparent mesh shading.
const MESH_BODY: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) view_depth: f32,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world_pos = draw_object.world * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.clip_position = camera.view_proj * world_pos;
    out.world_normal = normalize((draw_object.world * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.view_depth = -(camera.view * world_pos).z;
    return out;
}

fn shade(normal: vec3<f32>) -> vec3<f32> {
    let light_dir = normalize(vec3<f32>(0.3, 1.0, 0.5));
    let diffuse = max(dot(normal, light_dir), 0.0);
    return material.color.rgb * (0.3 + diffuse * 0.7);
}

@fragment
fn fs_lit(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(shade(in.world_normal), 1.0);
}

@fragment
fn fs_unlit(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(material.color.rgb, 1.0);
}

struct AccumOutput {
    @location(0) accum: vec4<f32>,
    @location(1) revealage: vec4<f32>,
};

@fragment
fn fs_accumulate(in: VertexOutput) -> AccumOutput {
    let alpha = clamp(material.color.a, 0.05, 0.95);
    let z = clamp(in.view_depth / camera.far, 0.0, 1.0);
    let weight = clamp(alpha * 10.0 / (1e-5 + pow(z, 3.0) * 1e3), 1e-2, 3e3);
    var out: AccumOutput;
    out.accum = vec4<f32>(shade(in.world_normal) * alpha, alpha) * weight;
    out.revealage = vec4<f32>(alpha);
    return out;
}
"#;

/// Depth-only shadow caster.
const DEPTH_BODY: &str = r#"
@vertex
fn vs_depth(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return camera.view_proj * draw_object.world * vec4<f32>(position, 1.0);
}
"#;

/// Fullscreen triangle plus every post-process stage.
pub const POST_SHADER: &str = r#"
struct FullscreenOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> FullscreenOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: FullscreenOutput;
    out.position = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@group(0) @binding(0)
var t_primary: texture_2d<f32>;
@group(0) @binding(1)
var t_secondary: texture_2d<f32>;
@group(0) @binding(2)
var s_linear: sampler;

@fragment
fn fs_composite(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let accum = textureSample(t_primary, s_linear, in.uv);
    let revealage = textureSample(t_secondary, s_linear, in.uv).r;
    let color = accum.rgb / max(accum.a, 1e-5);
    return vec4<f32>(color, 1.0 - revealage);
}

@fragment
fn fs_bloom_extract(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let color = textureSample(t_primary, s_linear, in.uv).rgb;
    let luma = dot(color, vec3<f32>(0.2126, 0.7152, 0.0722));
    return vec4<f32>(color * smoothstep(0.8, 1.2, luma), 1.0);
}

@fragment
fn fs_downsample(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let texel = 1.0 / vec2<f32>(textureDimensions(t_primary));
    var sum = vec3<f32>(0.0);
    sum += textureSample(t_primary, s_linear, in.uv + texel * vec2<f32>(-1.0, -1.0)).rgb;
    sum += textureSample(t_primary, s_linear, in.uv + texel * vec2<f32>(1.0, -1.0)).rgb;
    sum += textureSample(t_primary, s_linear, in.uv + texel * vec2<f32>(-1.0, 1.0)).rgb;
    sum += textureSample(t_primary, s_linear, in.uv + texel * vec2<f32>(1.0, 1.0)).rgb;
    return vec4<f32>(sum * 0.25, 1.0);
}

@fragment
fn fs_upsample(in: FullscreenOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(textureSample(t_primary, s_linear, in.uv).rgb * 0.5, 1.0);
}

@fragment
fn fs_tonemap(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let hdr = textureSample(t_primary, s_linear, in.uv).rgb
        + textureSample(t_secondary, s_linear, in.uv).rgb * 0.3;
    // ACES fit
    let a = hdr * (2.51 * hdr + 0.03);
    let b = hdr * (2.43 * hdr + 0.59) + 0.14;
    return vec4<f32>(clamp(a / b, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}

@fragment
fn fs_resolve(in: FullscreenOutput) -> @location(0) vec4<f32> {
    return textureSample(t_primary, s_linear, in.uv);
}
"#;

pub fn mesh_shader() -> String {
    format!("{UNIFORMS}{MESH_BODY}")
}

pub fn depth_shader() -> String {
    format!("{UNIFORMS}{DEPTH_BODY}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_shader_declares_all_groups() {
        let src = mesh_shader();
        for group in ["@group(0)", "@group(1)", "@group(2)"] {
            assert!(src.contains(group), "missing {group}");
        }
        for entry in ["vs_main", "fs_lit", "fs_unlit", "fs_accumulate"] {
            assert!(src.contains(entry), "missing {entry}");
        }
    }

    #[test]
    fn post_shader_has_every_stage() {
        for entry in [
            "fs_composite",
            "fs_bloom_extract",
            "fs_downsample",
            "fs_upsample",
            "fs_tonemap",
            "fs_resolve",
        ] {
            assert!(POST_SHADER.contains(entry), "missing {entry}");
        }
    }
}
