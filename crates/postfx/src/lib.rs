//! Full-screen post-processing passes and the pipeline that chains them.
//!
//! The crate is GPU-agnostic: it owns the pass catalog, parameter storage,
//! GLSL sources and a CPU reference renderer. The `renderer` crate turns an
//! [`EffectPipeline`] into wgpu render passes every frame.

pub mod cpu;
pub mod easing;
mod error;
pub mod params;
pub mod passes;
pub mod pipeline;
pub mod shaders;

pub use cpu::Frame;
pub use easing::EasingCurve;
pub use error::PipelineError;
pub use params::Parameters;
pub use passes::{ParamKind, ParamRole, ParamSpec, ParamValue, PassKind, PassSpec, PARAM_SLOTS};
pub use pipeline::{
    EffectPipeline, Pass, PassControl, PassOptions, PipelineLayout, RenderSize, MAX_PIXEL_RATIO,
};
