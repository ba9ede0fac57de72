//! GLSL sources for every pass.
//!
//! Each fragment program is assembled from a shared header, a generated
//! parameter loader, the pass body and a shared footer. Parameters arrive as a
//! `vec4 slots[4]` uniform array packed by [`Parameters::pack`] and are copied
//! into plain globals named after the parameter, so pass bodies read
//! `pixelSize` rather than `ubo.slots[0].x`.
//!
//! [`Parameters::pack`]: crate::params::Parameters::pack

use std::fmt::Write as _;

use crate::passes::{ParamKind, PassKind, PARAM_SLOTS};
use crate::pipeline::PassOptions;

/// Full-screen triangle. `v_uv` has its origin in the top-left corner so it
/// lines up with texture coordinates without a per-pass flip.
pub const VERTEX_SHADER: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    vec2 pos = positions[uint(gl_VertexIndex)];
    v_uv = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Copies the input texture unchanged. Used when no pass is enabled.
pub const BLIT_FRAGMENT: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(set = 0, binding = 1) uniform texture2D t_diffuse;
layout(set = 0, binding = 2) uniform sampler s_diffuse;

void main() {
    outColor = textureLod(sampler2D(t_diffuse, s_diffuse), v_uv, 0.0);
}
";

const HEADER: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform PassParams {
    vec4 slots[4];
} ubo;

layout(set = 0, binding = 1) uniform texture2D t_diffuse;
layout(set = 0, binding = 2) uniform sampler s_diffuse;

vec4 tex(vec2 uv) {
    return textureLod(sampler2D(t_diffuse, s_diffuse), uv, 0.0);
}

float hash(vec2 p) {
    return fract(sin(dot(p, vec2(12.9898, 78.233))) * 43758.5453);
}
";

const FOOTER: &str = r"
void main() {
    load_params();
    outColor = effect(v_uv);
}
";

const CHROMATIC: &str = r"
vec4 effect(vec2 uv) {
    vec4 blurred = vec4(0.0);
    float total = 0.0;
    for (int i = 0; i < 5; i++) {
        float t = float(i) / 4.0;
        blurred += tex(uv + rotationVelocity * t * 0.1) * (1.0 - t);
        total += 1.0 - t;
    }
    blurred /= total;

    vec4 colorR = tex(uv + rotationVelocity * 0.75);
    vec4 colorG = tex(uv - rotationVelocity * 0.25);
    vec4 colorB = tex(uv + rotationVelocity * 0.35);
    vec4 split = vec4(
        mix(blurred.r, colorR.r, 0.5),
        mix(blurred.g, colorG.g, 0.5),
        mix(blurred.b, colorB.b, 0.5),
        blurred.a
    );
    return mix(split, blurred, 0.5);
}
";

const PIXELATION: &str = r"
vec4 effect(vec2 uv) {
    if (pixelSize <= 0.0) {
        return tex(uv);
    }
    float aspect = resolution.x / max(resolution.y, 1.0);
    vec2 cell = vec2(pixelSize, pixelSize * aspect);
    vec2 grid = (floor(uv / cell) + 0.5) * cell;
    float row = floor(uv.y / cell.y);
    vec2 shift = vec2((hash(vec2(row, 0.0)) - 0.5) * pixelSize * 4.0, 0.0);
    vec4 center = tex(grid);
    return vec4(tex(grid + shift).r, center.g, tex(grid - shift).b, center.a);
}
";

const NOISE: &str = r"
vec4 effect(vec2 uv) {
    vec4 color = tex(uv);
    float grain = hash(uv * 1000.0 + vec2(time)) - 0.5;
    return vec4(color.rgb + vec3(grain * noiseStrength), color.a);
}
";

const RGB_GLITCH: &str = r"
vec4 effect(vec2 uv) {
    float block = floor(uv.y * 32.0);
    float slice = floor(uTime * 12.0);
    float mask = 1.0 - step(uGlitch, hash(vec2(block, slice)));
    float shift = (hash(vec2(slice, block)) - 0.5) * uAmount * 0.1 * mask;
    float split = uChromAbb * mask;
    vec2 base = uv + vec2(shift, 0.0);
    vec4 color = tex(base);
    return vec4(tex(base + vec2(split, 0.0)).r, color.g, tex(base - vec2(split, 0.0)).b, color.a);
}
";

const BLINDS: &str = r"
vec3 band_weights(float phase) {
    return vec3(
        max(0.0, 1.0 - abs(phase)) + max(0.0, 1.0 - abs(phase - 3.0)),
        max(0.0, 1.0 - abs(phase - 1.0)),
        max(0.0, 1.0 - abs(phase - 2.0))
    );
}

vec4 effect(vec2 uv) {
    if (uAmount <= 0.0) {
        return tex(uv);
    }
    float band = floor(uv.y * BLINDS_BANDS);
    vec3 weights = band_weights(mod(band + uTime * 2.0, 3.0));
    float channel = clamp(dot(tex(uv).rgb, weights), 0.0, 1.0);

    float aspect = uResolution.x / max(uResolution.y, 1.0);
    float falloff = clamp(1.0 - length((uv - uMousePos) * vec2(aspect, 1.0)), 0.25, 1.0);
    float displacement = pow(channel, 3.0) / 10.0 * uAmount * falloff;

    vec4 warped = tex(uv + vec2(0.0, displacement));
    vec3 tinted = mix(warped.rgb, weights * max(warped.r, max(warped.g, warped.b)), min(uAmount * 0.35, 1.0));
    return vec4(tinted, warped.a);
}
";

const DIFFUSE: &str = r"
vec4 effect(vec2 uv) {
    if (amount <= 0.0) {
        return tex(uv);
    }
    float aspect = uResolution.x / max(uResolution.y, 1.0);
    float falloff = clamp(1.0 - length((uv - uMousePos) * vec2(aspect, 1.0)), 0.25, 1.0);
    vec2 spread = xy * amount * falloff;
    vec4 sum = vec4(0.0);
    for (int i = 0; i < DIFFUSE_SAMPLES; i++) {
        float fi = float(i);
        vec2 jitter = vec2(
            hash(uv + vec2(fi, uTime)),
            hash(uv + vec2(uTime, fi) + 17.0)
        ) - 0.5;
        sum += tex(uv + jitter * spread);
    }
    return sum / float(DIFFUSE_SAMPLES);
}
";

const GRAIN: &str = r"
const float PHI = 1.61803398874989484820459;

float gold_noise(vec2 p, float seed) {
    return fract(tan(distance(p * PHI, p) * seed) * p.x);
}

vec3 overlay(vec3 base, vec3 blend) {
    vec3 low = 2.0 * base * blend;
    vec3 high = 1.0 - 2.0 * (1.0 - base) * (1.0 - blend);
    return mix(low, high, step(vec3(0.5), base));
}

vec4 effect(vec2 uv) {
    vec4 color = tex(uv);
    if (uAmount <= 0.0) {
        return color;
    }
    float seed = fract(uTime) + 1.0;
    float grain = clamp(gold_noise(uv * uResolution, seed), 0.0, 1.0);
    vec3 blended = overlay(color.rgb, vec3(grain));
    return vec4(mix(color.rgb, blended, uAmount), color.a);
}
";

fn body(kind: PassKind) -> &'static str {
    match kind {
        PassKind::Chromatic => CHROMATIC,
        PassKind::Pixelation => PIXELATION,
        PassKind::Noise => NOISE,
        PassKind::RgbGlitch => RGB_GLITCH,
        PassKind::Blinds => BLINDS,
        PassKind::Diffuse => DIFFUSE,
        PassKind::Grain => GRAIN,
    }
}

const COMPONENTS: [&str; 4] = ["x", "y", "z", "w"];

/// Declares one global per parameter and a `load_params` that fills them
/// from the packed uniform slots.
fn parameter_block(kind: PassKind) -> String {
    let layout = kind.spec().slot_layout();
    let mut out = String::new();
    for (spec, _) in &layout {
        let _ = writeln!(out, "{} {};", spec.kind.glsl_type(), spec.name);
    }
    out.push_str("\nvoid load_params() {\n");
    for (spec, offset) in &layout {
        let slot = offset / 4;
        debug_assert!(slot < PARAM_SLOTS);
        let first = offset % 4;
        let swizzle: String = COMPONENTS[first..first + spec.kind.components()].concat();
        let _ = writeln!(out, "    {} = ubo.slots[{slot}].{swizzle};", spec.name);
    }
    out.push_str("}\n");
    out
}

fn constants(kind: PassKind, options: &PassOptions) -> String {
    match kind {
        PassKind::Blinds => format!(
            "const float BLINDS_BANDS = {}.0;\n",
            options.blinds_bands
        ),
        PassKind::Diffuse => format!(
            "const int DIFFUSE_SAMPLES = {};\n",
            options.diffuse_samples
        ),
        _ => String::new(),
    }
}

/// Produces the complete GLSL 450 fragment program for `kind`.
pub fn fragment_source(kind: PassKind, options: &PassOptions) -> String {
    let options = options.sanitized();
    format!(
        "{HEADER}\n{constants}\n{params}{body}{FOOTER}",
        constants = constants(kind, &options),
        params = parameter_block(kind),
        body = body(kind),
    )
}
