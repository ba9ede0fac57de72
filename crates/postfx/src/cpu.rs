//! Software rendition of every pass.
//!
//! Each effect mirrors its GLSL body in [`crate::shaders`] closely enough to
//! reason about the same edge cases (identity at zero intensity, clamped
//! sampling at the borders) without a GPU.

use glam::{Vec2, Vec3, Vec4, Vec4Swizzles};
use image::RgbaImage;

use crate::params::Parameters;
use crate::passes::PassKind;
use crate::pipeline::PassOptions;

/// Linear RGBA image with `f32` channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<Vec4>,
}

impl Frame {
    /// Transparent black frame. Zero dimensions are bumped to one pixel.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0.0; 4])
    }

    pub fn filled(width: u32, height: u32, color: [f32; 4]) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            pixels: vec![Vec4::from_array(color); (width * height) as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [f32; 4]) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(Vec4::from_array(f(x, y)));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_rgba8(image: &RgbaImage) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| {
            let [r, g, b, a] = image.get_pixel(x, y).0;
            [
                f32::from(r) / 255.0,
                f32::from(g) / 255.0,
                f32::from(b) / 255.0,
                f32::from(a) / 255.0,
            ]
        })
    }

    /// Quantises to 8-bit, clamping out-of-range channels the way a unorm
    /// render target does.
    pub fn to_rgba8(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let pixel = self.pixel(x, y);
            image::Rgba(pixel.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> [f32; 4] {
        self.texel(x as i64, y as i64).to_array()
    }

    fn texel(&self, x: i64, y: i64) -> Vec4 {
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        self.pixels[y * self.width as usize + x]
    }

    /// Bilinear sample with clamp-to-edge addressing; `uv` origin is top-left.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let px = uv.x * self.width as f32 - 0.5;
        let py = uv.y * self.height as f32 - 0.5;
        if !px.is_finite() || !py.is_finite() {
            return self.texel(0, 0);
        }
        let x0 = px.floor();
        let y0 = py.floor();
        let fx = px - x0;
        let fy = py - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);
        let top = mix4(self.texel(x0, y0), self.texel(x0 + 1, y0), fx);
        let bottom = mix4(self.texel(x0, y0 + 1), self.texel(x0 + 1, y0 + 1), fx);
        mix4(top, bottom, fy)
    }

    /// Largest per-channel difference between two frames of equal size.
    pub fn max_abs_difference(&self, other: &Frame) -> f32 {
        if self.width != other.width || self.height != other.height {
            return f32::INFINITY;
        }
        self.pixels
            .iter()
            .zip(&other.pixels)
            .map(|(a, b)| (*a - *b).abs().max_element())
            .fold(0.0, f32::max)
    }

    fn map_uv(&self, effect: impl Fn(&Frame, Vec2) -> Vec4) -> Frame {
        let size = Vec2::new(self.width as f32, self.height as f32);
        let mut pixels = Vec::with_capacity(self.pixels.len());
        for y in 0..self.height {
            for x in 0..self.width {
                let uv = (Vec2::new(x as f32, y as f32) + 0.5) / size;
                pixels.push(effect(self, uv));
            }
        }
        Frame {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

fn mix3(a: Vec3, b: Vec3, t: Vec3) -> Vec3 {
    a * (Vec3::ONE - t) + b * t
}

fn mix4(a: Vec4, b: Vec4, t: f32) -> Vec4 {
    a * (1.0 - t) + b * t
}

fn fract(x: f32) -> f32 {
    x - x.floor()
}

fn step(edge: f32, x: f32) -> f32 {
    if x < edge {
        0.0
    } else {
        1.0
    }
}

fn hash(p: Vec2) -> f32 {
    fract((p.dot(Vec2::new(12.9898, 78.233))).sin() * 43758.5453)
}

/// GLSL `mod`, which takes the sign of the divisor.
fn modulo(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

fn pointer_falloff(uv: Vec2, pointer: Vec2, resolution: Vec2) -> f32 {
    let aspect = resolution.x / resolution.y.max(1.0);
    (1.0 - ((uv - pointer) * Vec2::new(aspect, 1.0)).length()).clamp(0.25, 1.0)
}

/// Runs one pass over `input` using the current parameter values.
pub fn apply(kind: PassKind, input: &Frame, params: &Parameters, options: &PassOptions) -> Frame {
    debug_assert_eq!(params.kind(), kind);
    match kind {
        PassKind::Chromatic => chromatic(input, params),
        PassKind::Pixelation => pixelation(input, params),
        PassKind::Noise => noise(input, params),
        PassKind::RgbGlitch => rgb_glitch(input, params),
        PassKind::Blinds => blinds(input, params, options),
        PassKind::Diffuse => diffuse(input, params, options),
        PassKind::Grain => grain(input, params),
    }
}

fn chromatic(input: &Frame, params: &Parameters) -> Frame {
    let velocity = Vec2::from_array(params.vec2("rotationVelocity"));
    input.map_uv(|frame, uv| {
        let mut blurred = Vec4::ZERO;
        let mut total = 0.0;
        for i in 0..5 {
            let t = i as f32 / 4.0;
            blurred += frame.sample(uv + velocity * t * 0.1) * (1.0 - t);
            total += 1.0 - t;
        }
        blurred /= total;

        let r = frame.sample(uv + velocity * 0.75).x;
        let g = frame.sample(uv - velocity * 0.25).y;
        let b = frame.sample(uv + velocity * 0.35).z;
        let split = Vec4::new(
            mix(blurred.x, r, 0.5),
            mix(blurred.y, g, 0.5),
            mix(blurred.z, b, 0.5),
            blurred.w,
        );
        mix4(split, blurred, 0.5)
    })
}

fn pixelation(input: &Frame, params: &Parameters) -> Frame {
    let pixel_size = params.float("pixelSize");
    if pixel_size <= 0.0 {
        return input.map_uv(Frame::sample);
    }
    let resolution = Vec2::from_array(params.vec2("resolution"));
    let aspect = resolution.x / resolution.y.max(1.0);
    let cell = Vec2::new(pixel_size, pixel_size * aspect);
    input.map_uv(|frame, uv| {
        let grid = ((uv / cell).floor() + 0.5) * cell;
        let row = (uv.y / cell.y).floor();
        let shift = Vec2::new((hash(Vec2::new(row, 0.0)) - 0.5) * pixel_size * 4.0, 0.0);
        let center = frame.sample(grid);
        Vec4::new(
            frame.sample(grid + shift).x,
            center.y,
            frame.sample(grid - shift).z,
            center.w,
        )
    })
}

fn noise(input: &Frame, params: &Parameters) -> Frame {
    let time = params.float("time");
    let strength = params.float("noiseStrength");
    input.map_uv(|frame, uv| {
        let color = frame.sample(uv);
        let grain = hash(uv * 1000.0 + Vec2::splat(time)) - 0.5;
        (color.xyz() + Vec3::splat(grain * strength)).extend(color.w)
    })
}

fn rgb_glitch(input: &Frame, params: &Parameters) -> Frame {
    let amount = params.float("uAmount");
    let chrom_abb = params.float("uChromAbb");
    let glitch = params.float("uGlitch");
    let slice = (params.float("uTime") * 12.0).floor();
    input.map_uv(|frame, uv| {
        let block = (uv.y * 32.0).floor();
        let mask = 1.0 - step(glitch, hash(Vec2::new(block, slice)));
        let shift = (hash(Vec2::new(slice, block)) - 0.5) * amount * 0.1 * mask;
        let split = Vec2::new(chrom_abb * mask, 0.0);
        let base = uv + Vec2::new(shift, 0.0);
        let color = frame.sample(base);
        Vec4::new(
            frame.sample(base + split).x,
            color.y,
            frame.sample(base - split).z,
            color.w,
        )
    })
}

fn band_weights(phase: f32) -> Vec3 {
    Vec3::new(
        (1.0 - phase.abs()).max(0.0) + (1.0 - (phase - 3.0).abs()).max(0.0),
        (1.0 - (phase - 1.0).abs()).max(0.0),
        (1.0 - (phase - 2.0).abs()).max(0.0),
    )
}

fn blinds(input: &Frame, params: &Parameters, options: &PassOptions) -> Frame {
    let amount = params.float("uAmount");
    if amount <= 0.0 {
        return input.map_uv(Frame::sample);
    }
    let time = params.float("uTime");
    let pointer = Vec2::from_array(params.vec2("uMousePos"));
    let resolution = Vec2::from_array(params.vec2("uResolution"));
    let bands = options.sanitized().blinds_bands as f32;
    input.map_uv(|frame, uv| {
        let band = (uv.y * bands).floor();
        let weights = band_weights(modulo(band + time * 2.0, 3.0));
        let channel = frame.sample(uv).xyz().dot(weights).clamp(0.0, 1.0);
        let displacement =
            channel.powf(3.0) / 10.0 * amount * pointer_falloff(uv, pointer, resolution);

        let warped = frame.sample(uv + Vec2::new(0.0, displacement));
        let peak = warped.x.max(warped.y.max(warped.z));
        let tint = Vec3::splat((amount * 0.35).min(1.0));
        mix3(warped.xyz(), weights * peak, tint).extend(warped.w)
    })
}

fn diffuse(input: &Frame, params: &Parameters, options: &PassOptions) -> Frame {
    let amount = params.float("amount");
    if amount <= 0.0 {
        return input.map_uv(Frame::sample);
    }
    let time = params.float("uTime");
    let xy = Vec2::from_array(params.vec2("xy"));
    let pointer = Vec2::from_array(params.vec2("uMousePos"));
    let resolution = Vec2::from_array(params.vec2("uResolution"));
    let samples = options.sanitized().diffuse_samples;
    input.map_uv(|frame, uv| {
        let spread = xy * amount * pointer_falloff(uv, pointer, resolution);
        let mut sum = Vec4::ZERO;
        for i in 0..samples {
            let fi = i as f32;
            let jitter = Vec2::new(
                hash(uv + Vec2::new(fi, time)),
                hash(uv + Vec2::new(time, fi) + 17.0),
            ) - 0.5;
            sum += frame.sample(uv + jitter * spread);
        }
        sum / samples as f32
    })
}

const PHI: f32 = 1.618_034;

fn gold_noise(p: Vec2, seed: f32) -> f32 {
    let value = fract(((p * PHI).distance(p) * seed).tan() * p.x);
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

fn overlay(base: Vec3, blend: Vec3) -> Vec3 {
    let low = 2.0 * base * blend;
    let high = Vec3::ONE - 2.0 * (Vec3::ONE - base) * (Vec3::ONE - blend);
    let select = Vec3::new(step(0.5, base.x), step(0.5, base.y), step(0.5, base.z));
    mix3(low, high, select)
}

fn grain(input: &Frame, params: &Parameters) -> Frame {
    let amount = params.float("uAmount");
    if amount <= 0.0 {
        return input.map_uv(Frame::sample);
    }
    let seed = fract(params.float("uTime")) + 1.0;
    let resolution = Vec2::from_array(params.vec2("uResolution"));
    input.map_uv(|frame, uv| {
        let color = frame.sample(uv);
        let noise = gold_noise(uv * resolution, seed);
        let blended = overlay(color.xyz(), Vec3::splat(noise));
        mix3(color.xyz(), blended, Vec3::splat(amount)).extend(color.w)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::ParamValue;

    fn gradient(width: u32, height: u32) -> Frame {
        Frame::from_fn(width, height, |x, y| {
            [
                x as f32 / width as f32,
                y as f32 / height as f32,
                0.25,
                1.0,
            ]
        })
    }

    #[test]
    fn sampling_texel_centres_returns_texels() {
        let frame = gradient(8, 4);
        let sample = frame.sample(Vec2::new(2.5 / 8.0, 1.5 / 4.0));
        assert_eq!(sample.to_array(), frame.pixel(2, 1));
    }

    #[test]
    fn sampling_clamps_to_edges() {
        let frame = gradient(8, 4);
        assert_eq!(frame.sample(Vec2::new(-3.0, -3.0)).to_array(), frame.pixel(0, 0));
        assert_eq!(frame.sample(Vec2::new(4.0, 4.0)).to_array(), frame.pixel(7, 3));
    }

    #[test]
    fn rgba8_round_trip_clamps() {
        let frame = Frame::filled(2, 2, [1.5, -0.5, 0.5, 1.0]);
        let image = frame.to_rgba8();
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 128, 255]);
    }

    #[test]
    fn pixelation_quantises_when_active() {
        let input = gradient(64, 32);
        let mut params = Parameters::defaults(PassKind::Pixelation.spec());
        params.set("pixelSize", ParamValue::Float(0.125)).unwrap();
        params
            .set("resolution", ParamValue::Vec2([64.0, 32.0]))
            .unwrap();
        let output = apply(PassKind::Pixelation, &input, &params, &PassOptions::default());
        // Green is sampled at the cell centre, so neighbours inside a cell agree.
        assert_eq!(output.pixel(0, 0)[1], output.pixel(1, 1)[1]);
        assert!(output.max_abs_difference(&input) > 0.01);
    }

    #[test]
    fn noise_stays_within_strength() {
        let input = Frame::filled(16, 16, [0.5, 0.5, 0.5, 1.0]);
        let mut params = Parameters::defaults(PassKind::Noise.spec());
        params.set("noiseStrength", ParamValue::Float(0.2)).unwrap();
        let output = apply(PassKind::Noise, &input, &params, &PassOptions::default());
        let diff = output.max_abs_difference(&input);
        assert!(diff > 0.0 && diff <= 0.1 + 1e-6, "diff = {diff}");
    }

    #[test]
    fn grain_output_is_finite() {
        let input = gradient(32, 32);
        let mut params = Parameters::defaults(PassKind::Grain.spec());
        params.set("uAmount", ParamValue::Float(1.0)).unwrap();
        params
            .set("uResolution", ParamValue::Vec2([32.0, 32.0]))
            .unwrap();
        params.set("uTime", ParamValue::Float(12.7)).unwrap();
        let output = apply(PassKind::Grain, &input, &params, &PassOptions::default());
        for y in 0..32 {
            for x in 0..32 {
                assert!(output.pixel(x, y).iter().all(|c| c.is_finite()));
            }
        }
    }

    #[test]
    fn band_weights_sum_to_one() {
        for step in 0..30 {
            let phase = step as f32 / 10.0;
            let sum = band_weights(phase).element_sum();
            assert!((sum - 1.0).abs() < 1e-5, "phase {phase}");
        }
    }
}
