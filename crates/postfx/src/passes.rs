use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of `vec4` slots in every pass uniform block.
pub const PARAM_SLOTS: usize = 4;

/// Identifies one stage of the post-processing chain.
///
/// The declaration order is the composition order: a pipeline always runs its
/// passes in this sequence regardless of how they were listed in the
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// Rotation-driven motion blur with channel split. Always on.
    Chromatic,
    /// UV quantisation with per-row RGB displacement.
    Pixelation,
    /// Additive grayscale noise.
    Noise,
    /// Scanline block glitch with chromatic separation.
    RgbGlitch,
    /// Banded colour-cycling vertical warp.
    Blinds,
    /// Radial multi-sample scatter.
    Diffuse,
    /// Overlay-blended film grain. Always on, always last.
    Grain,
}

impl PassKind {
    /// Every pass in canonical composition order.
    pub const ALL: [PassKind; 7] = [
        PassKind::Chromatic,
        PassKind::Pixelation,
        PassKind::Noise,
        PassKind::RgbGlitch,
        PassKind::Blinds,
        PassKind::Diffuse,
        PassKind::Grain,
    ];

    pub fn id(self) -> &'static str {
        match self {
            PassKind::Chromatic => "chromatic",
            PassKind::Pixelation => "pixelation",
            PassKind::Noise => "noise",
            PassKind::RgbGlitch => "rgb_glitch",
            PassKind::Blinds => "blinds",
            PassKind::Diffuse => "diffuse",
            PassKind::Grain => "grain",
        }
    }

    /// Transient passes only run while a transition is in flight.
    pub fn is_transient(self) -> bool {
        !matches!(self, PassKind::Chromatic | PassKind::Grain)
    }

    pub fn order(self) -> usize {
        self as usize
    }

    pub fn spec(self) -> &'static PassSpec {
        match self {
            PassKind::Chromatic => &CHROMATIC,
            PassKind::Pixelation => &PIXELATION,
            PassKind::Noise => &NOISE,
            PassKind::RgbGlitch => &RGB_GLITCH,
            PassKind::Blinds => &BLINDS,
            PassKind::Diffuse => &DIFFUSE,
            PassKind::Grain => &GRAIN,
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PassKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        PassKind::ALL
            .into_iter()
            .find(|kind| kind.id() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown pass '{value}'; expected one of {}",
                    PassKind::ALL.map(PassKind::id).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Float,
    Vec2,
}

impl ParamKind {
    pub fn components(self) -> usize {
        match self {
            ParamKind::Float => 1,
            ParamKind::Vec2 => 2,
        }
    }

    pub fn glsl_type(self) -> &'static str {
        match self {
            ParamKind::Float => "float",
            ParamKind::Vec2 => "vec2",
        }
    }
}

/// Who writes a parameter and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRole {
    /// Non-zero only while a transition is running.
    Transient,
    /// Seconds since start, advanced every frame.
    Time,
    /// Device pixel size of the render target, updated on resize.
    Resolution,
    /// Pointer position in UV space (origin top-left).
    Pointer,
    /// Per-frame model rotation delta.
    Velocity,
    /// Fixed at construction from configuration.
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Vec2([f32; 2]),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Vec2(_) => ParamKind::Vec2,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            ParamValue::Float(value) => Some(*value),
            ParamValue::Vec2(_) => None,
        }
    }

    pub fn as_vec2(&self) -> Option<[f32; 2]> {
        match self {
            ParamValue::Vec2(value) => Some(*value),
            ParamValue::Float(_) => None,
        }
    }

    pub(crate) fn components(&self) -> &[f32] {
        match self {
            ParamValue::Float(value) => std::slice::from_ref(value),
            ParamValue::Vec2(value) => value.as_slice(),
        }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.components().iter().all(|c| c.is_finite())
    }

    pub(crate) fn clamped(&self, min: f32, max: f32) -> ParamValue {
        match self {
            ParamValue::Float(value) => ParamValue::Float(value.clamp(min, max)),
            ParamValue::Vec2([x, y]) => ParamValue::Vec2([x.clamp(min, max), y.clamp(min, max)]),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(value) => write!(f, "{value}"),
            ParamValue::Vec2([x, y]) => write!(f, "({x}, {y})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub role: ParamRole,
    pub default: ParamValue,
    pub min: f32,
    pub max: f32,
}

impl ParamSpec {
    const fn float(name: &'static str, role: ParamRole, default: f32, min: f32, max: f32) -> Self {
        Self {
            name,
            kind: ParamKind::Float,
            role,
            default: ParamValue::Float(default),
            min,
            max,
        }
    }

    const fn vec2(
        name: &'static str,
        role: ParamRole,
        default: [f32; 2],
        min: f32,
        max: f32,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Vec2,
            role,
            default: ParamValue::Vec2(default),
            min,
            max,
        }
    }
}

/// Static description of a pass: its id and its parameters in declaration order.
#[derive(Debug)]
pub struct PassSpec {
    pub kind: PassKind,
    pub params: &'static [ParamSpec],
}

impl PassSpec {
    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|spec| spec.name == name)
    }

    /// Component offsets of each parameter inside the packed uniform block.
    ///
    /// Floats take the next free component; `vec2`s start on an even
    /// component so they never straddle a `vec4` slot.
    pub fn slot_layout(&self) -> Vec<(&'static ParamSpec, usize)> {
        let mut offset = 0usize;
        let mut layout = Vec::with_capacity(self.params.len());
        for spec in self.params {
            if spec.kind == ParamKind::Vec2 && offset % 2 == 1 {
                offset += 1;
            }
            layout.push((spec, offset));
            offset += spec.kind.components();
        }
        debug_assert!(offset <= PARAM_SLOTS * 4, "pass parameters overflow uniform slots");
        layout
    }
}

const TIME_MAX: f32 = 1.0e7;
const RESOLUTION_MAX: f32 = 16384.0;

static CHROMATIC: PassSpec = PassSpec {
    kind: PassKind::Chromatic,
    params: &[ParamSpec::vec2(
        "rotationVelocity",
        ParamRole::Velocity,
        [0.0, 0.0],
        -1.0,
        1.0,
    )],
};

static PIXELATION: PassSpec = PassSpec {
    kind: PassKind::Pixelation,
    params: &[
        ParamSpec::float("pixelSize", ParamRole::Transient, 0.0, 0.0, 0.25),
        ParamSpec::vec2("resolution", ParamRole::Resolution, [1.0, 1.0], 1.0, RESOLUTION_MAX),
    ],
};

static NOISE: PassSpec = PassSpec {
    kind: PassKind::Noise,
    params: &[
        ParamSpec::float("time", ParamRole::Time, 0.0, 0.0, TIME_MAX),
        ParamSpec::float("noiseStrength", ParamRole::Transient, 0.0, 0.0, 1.0),
    ],
};

static RGB_GLITCH: PassSpec = PassSpec {
    kind: PassKind::RgbGlitch,
    params: &[
        ParamSpec::float("uAmount", ParamRole::Transient, 0.0, 0.0, 4.0),
        ParamSpec::float("uChromAbb", ParamRole::Transient, 0.0, 0.0, 0.2),
        ParamSpec::float("uGlitch", ParamRole::Transient, 0.0, 0.0, 1.0),
        ParamSpec::float("uTime", ParamRole::Time, 0.0, 0.0, TIME_MAX),
    ],
};

static BLINDS: PassSpec = PassSpec {
    kind: PassKind::Blinds,
    params: &[
        ParamSpec::float("uAmount", ParamRole::Transient, 0.0, 0.0, 4.0),
        ParamSpec::float("uTime", ParamRole::Time, 0.0, 0.0, TIME_MAX),
        ParamSpec::vec2("uMousePos", ParamRole::Pointer, [0.5, 0.5], 0.0, 1.0),
        ParamSpec::vec2("uResolution", ParamRole::Resolution, [1.0, 1.0], 1.0, RESOLUTION_MAX),
    ],
};

static DIFFUSE: PassSpec = PassSpec {
    kind: PassKind::Diffuse,
    params: &[
        ParamSpec::float("uTime", ParamRole::Time, 0.0, 0.0, TIME_MAX),
        ParamSpec::vec2("xy", ParamRole::Static, [1.0, 1.0], 0.0, 4.0),
        ParamSpec::float("amount", ParamRole::Transient, 0.0, 0.0, 1.0),
        ParamSpec::vec2("uMousePos", ParamRole::Pointer, [0.5, 0.5], 0.0, 1.0),
        ParamSpec::vec2("uResolution", ParamRole::Resolution, [1.0, 1.0], 1.0, RESOLUTION_MAX),
    ],
};

static GRAIN: PassSpec = PassSpec {
    kind: PassKind::Grain,
    params: &[
        ParamSpec::float("uTime", ParamRole::Time, 0.0, 0.0, TIME_MAX),
        ParamSpec::float("uAmount", ParamRole::Static, 0.08, 0.0, 1.0),
        ParamSpec::vec2("uResolution", ParamRole::Resolution, [1.0, 1.0], 1.0, RESOLUTION_MAX),
    ],
};
