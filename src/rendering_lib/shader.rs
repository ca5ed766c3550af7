// src/rendering_lib/shader.rs

/// Shared frame block, included at the top of every shader below.
const FRAME_BLOCK: &str = r#"
struct Frame {
    view_proj: mat4x4<f32>,
    light_view_proj: mat4x4<f32>,
    camera: vec4<f32>,
    viewport: vec4<f32>,
    key_dir: vec4<f32>,
    key_color: vec4<f32>,
    fill_dir: vec4<f32>,
    fill_color: vec4<f32>,
    rim_dir: vec4<f32>,
    rim_color: vec4<f32>,
    ambient: vec4<f32>,
    hemi_sky: vec4<f32>,
    hemi_ground: vec4<f32>,
    fog: vec4<f32>,
    fog_far: vec4<f32>,
    point_pos: array<vec4<f32>, 4>,
    point_color: array<vec4<f32>, 4>,
};

struct Object {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    color: vec4<f32>,
    emissive: vec4<f32>,
    flags: vec4<f32>,
};

@group(0) @binding(0) var<uniform> frame: Frame;
@group(1) @binding(0) var<uniform> object: Object;
"#;

pub const MESH_SHADER_BODY: &str = r#"
@group(2) @binding(0) var shadow_map: texture_depth_2d;
@group(2) @binding(1) var shadow_sampler: sampler_comparison;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = object.model * vec4<f32>(in.position, 1.0);
    out.world_position = world.xyz;
    out.world_normal = (object.normal_matrix * vec4<f32>(in.normal, 0.0)).xyz;
    out.clip_position = frame.view_proj * world;
    return out;
}

// 2x2 percentage-closer filter on the key light's depth map.
fn key_shadow(world_position: vec3<f32>) -> f32 {
    let light_clip = frame.light_view_proj * vec4<f32>(world_position, 1.0);
    let ndc = light_clip.xyz / light_clip.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    let texel = frame.fog_far.y;
    var lit = 0.0;
    for (var x = 0; x < 2; x = x + 1) {
        for (var y = 0; y < 2; y = y + 1) {
            let offset = (vec2<f32>(f32(x), f32(y)) - 0.5) * texel;
            lit = lit + textureSampleCompareLevel(shadow_map, shadow_sampler, uv + offset, ndc.z - 0.002);
        }
    }
    let outside = uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0 || ndc.z > 1.0;
    return select(lit * 0.25, 1.0, outside);
}

fn directional(n: vec3<f32>, v: vec3<f32>, dir: vec4<f32>, color: vec4<f32>, shininess: f32) -> vec3<f32> {
    let l = normalize(dir.xyz);
    let diffuse = max(dot(n, l), 0.0);
    let h = normalize(l + v);
    let specular = pow(max(dot(n, h), 0.0), shininess) * 0.25;
    return color.rgb * color.w * (diffuse + specular);
}

fn aces(x: vec3<f32>) -> vec3<f32> {
    let a = 2.51;
    let b = 0.03;
    let c = 2.43;
    let d = 0.59;
    let e = 0.14;
    return clamp((x * (a * x + b)) / (x * (c * x + d) + e), vec3<f32>(0.0), vec3<f32>(1.0));
}

@fragment
fn fs_main(in: VertexOutput, @builtin(front_facing) front: bool) -> @location(0) vec4<f32> {
    let shadow = key_shadow(in.world_position);

    var n = normalize(in.world_normal);
    if (!front) {
        n = -n;
    }
    let v = normalize(frame.camera.xyz - in.world_position);
    let base = object.color.rgb;
    let shininess = mix(64.0, 4.0, clamp(object.emissive.w, 0.0, 1.0));

    var light = frame.ambient.rgb;
    light = light + mix(frame.hemi_ground.rgb, frame.hemi_sky.rgb, n.y * 0.5 + 0.5) * frame.hemi_sky.w;
    light = light + directional(n, v, frame.key_dir, frame.key_color, shininess) * shadow;
    light = light + directional(n, v, frame.fill_dir, frame.fill_color, shininess);
    light = light + directional(n, v, frame.rim_dir, frame.rim_color, shininess);

    let count = i32(frame.viewport.w);
    for (var i = 0; i < 4; i = i + 1) {
        if (i < count) {
            let to_light = frame.point_pos[i].xyz - in.world_position;
            let falloff = clamp(1.0 - length(to_light) / frame.point_pos[i].w, 0.0, 1.0);
            let diffuse = max(dot(n, normalize(to_light)), 0.0);
            light = light + frame.point_color[i].rgb * frame.point_color[i].w * diffuse * falloff * falloff;
        }
    }

    var color = base * light + object.emissive.rgb;
    if (object.flags.x > 0.5) {
        color = base + object.emissive.rgb;
    }

    let view_distance = length(frame.camera.xyz - in.world_position);
    let fog = clamp((view_distance - frame.fog.w) / max(frame.fog_far.x - frame.fog.w, 0.001), 0.0, 1.0);
    color = mix(color, frame.fog.rgb, fog);

    return vec4<f32>(aces(color * frame.viewport.z), object.color.a);
}
"#;

pub const SHADOW_SHADER_BODY: &str = r#"
@vertex
fn vs_shadow(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> @builtin(position) vec4<f32> {
    return frame.light_view_proj * object.model * vec4<f32>(position, 1.0);
}
"#;

pub const POINT_SHADER_BODY: &str = r#"
struct PointInput {
    @location(0) position: vec3<f32>,
    @location(1) size: f32,
    @location(2) color: vec4<f32>,
    @location(3) phase: f32,
};

struct PointOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
    @location(2) phase: f32,
};

@vertex
fn vs_points(@builtin(vertex_index) index: u32, in: PointInput) -> PointOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0), vec2<f32>(1.0, -1.0), vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0), vec2<f32>(1.0, 1.0), vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[index];
    let world = object.model * vec4<f32>(in.position, 1.0);
    var clip = frame.view_proj * world;

    // Size attenuates with distance; 200 / depth puts unit size at a few pixels.
    let depth = max(clip.w, 0.001);
    let pixels = in.size * (200.0 / depth);
    let half_ndc = vec2<f32>(pixels / max(frame.viewport.x, 1.0), pixels / max(frame.viewport.y, 1.0));
    clip = vec4<f32>(clip.xy + corner * half_ndc * clip.w, clip.zw);

    var out: PointOutput;
    out.clip_position = clip;
    out.uv = corner;
    out.color = in.color;
    out.phase = in.phase;
    return out;
}

@fragment
fn fs_points(in: PointOutput) -> @location(0) vec4<f32> {
    let d = length(in.uv);
    if (d > 1.0) {
        discard;
    }
    let soft = 1.0 - smoothstep(0.0, 1.0, d);
    let twinkle = 0.8 + 0.2 * sin(frame.camera.w * 2.0 + in.phase * 10.0);
    let alpha = soft * twinkle * in.color.a;
    return vec4<f32>(in.color.rgb * alpha, alpha);
}
"#;

pub fn mesh_shader_source() -> String {
    format!("{FRAME_BLOCK}{MESH_SHADER_BODY}")
}

pub fn shadow_shader_source() -> String {
    format!("{FRAME_BLOCK}{SHADOW_SHADER_BODY}")
}

pub fn point_shader_source() -> String {
    format!("{FRAME_BLOCK}{POINT_SHADER_BODY}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_shader_declares_its_entry_points() {
        let mesh = mesh_shader_source();
        assert!(mesh.contains("fn vs_main") && mesh.contains("fn fs_main"));
        assert!(shadow_shader_source().contains("fn vs_shadow"));
        let points = point_shader_source();
        assert!(points.contains("fn vs_points") && points.contains("fn fs_points"));
        assert!(points.starts_with("\nstruct Frame"));
    }
}
