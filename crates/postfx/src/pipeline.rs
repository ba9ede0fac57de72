use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::cpu::{self, Frame};
use crate::error::PipelineError;
use crate::params::Parameters;
use crate::passes::{ParamRole, ParamValue, PassKind};

/// Device pixel ratios above this are clamped before sizing render targets.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

const MAX_BLINDS_BANDS: u32 = 64;
const MAX_DIFFUSE_SAMPLES: u32 = 24;

/// Logical size of the render target plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl RenderSize {
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio.min(MAX_PIXEL_RATIO)
        } else {
            1.0
        };
        Self {
            width: width.max(1),
            height: height.max(1),
            pixel_ratio,
        }
    }

    pub fn device_width(&self) -> u32 {
        ((self.width as f32 * self.pixel_ratio).round() as u32).max(1)
    }

    pub fn device_height(&self) -> u32 {
        ((self.height as f32 * self.pixel_ratio).round() as u32).max(1)
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl Default for RenderSize {
    fn default() -> Self {
        Self::new(1280, 800, 1.0)
    }
}

/// Construction-time constants baked into pass programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassOptions {
    pub blinds_bands: u32,
    pub diffuse_samples: u32,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            blinds_bands: 12,
            diffuse_samples: MAX_DIFFUSE_SAMPLES,
        }
    }
}

impl PassOptions {
    pub fn sanitized(&self) -> Self {
        Self {
            blinds_bands: self.blinds_bands.clamp(1, MAX_BLINDS_BANDS),
            diffuse_samples: self.diffuse_samples.clamp(1, MAX_DIFFUSE_SAMPLES),
        }
    }
}

/// The set of passes a pipeline is built with, always in canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineLayout {
    kinds: Vec<PassKind>,
}

impl PipelineLayout {
    pub fn new(kinds: impl IntoIterator<Item = PassKind>) -> Self {
        let mut kinds: Vec<PassKind> = kinds.into_iter().collect();
        kinds.sort();
        kinds.dedup();
        Self { kinds }
    }

    pub fn all() -> Self {
        Self::new(PassKind::ALL)
    }

    pub fn kinds(&self) -> &[PassKind] {
        &self.kinds
    }

    pub fn contains(&self, kind: PassKind) -> bool {
        self.kinds.binary_search(&kind).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Pass {
    kind: PassKind,
    params: Parameters,
    enabled: bool,
    render_to_screen: bool,
}

impl Pass {
    fn new(kind: PassKind) -> Self {
        Self {
            kind,
            params: Parameters::defaults(kind.spec()),
            enabled: !kind.is_transient(),
            render_to_screen: false,
        }
    }

    pub fn kind(&self) -> PassKind {
        self.kind
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn render_to_screen(&self) -> bool {
        self.render_to_screen
    }
}

/// Write access to pass state used by whatever drives transitions.
pub trait PassControl {
    fn set_pass_enabled(&mut self, pass: PassKind, enabled: bool) -> Result<(), PipelineError>;

    /// Returns the value actually stored after clamping.
    fn set_pass_parameter(
        &mut self,
        pass: PassKind,
        name: &str,
        value: ParamValue,
    ) -> Result<ParamValue, PipelineError>;
}

/// Ordered chain of passes fed by the scene render.
#[derive(Debug, Clone)]
pub struct EffectPipeline {
    passes: Vec<Pass>,
    size: RenderSize,
    options: PassOptions,
}

impl EffectPipeline {
    /// Builds every pass in `layout` with quiescent defaults. Steady passes
    /// start enabled, transient ones disabled.
    pub fn new(
        layout: &PipelineLayout,
        size: RenderSize,
        options: PassOptions,
    ) -> Result<Self, PipelineError> {
        if layout.is_empty() {
            return Err(PipelineError::Empty);
        }
        let mut pipeline = Self {
            passes: layout.kinds().iter().copied().map(Pass::new).collect(),
            size,
            options: options.sanitized(),
        };
        pipeline.apply_size();
        pipeline.update_screen_pass();
        debug!(
            passes = ?layout.kinds(),
            width = size.device_width(),
            height = size.device_height(),
            "built effect pipeline"
        );
        Ok(pipeline)
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn pass(&self, kind: PassKind) -> Option<&Pass> {
        self.passes.iter().find(|pass| pass.kind == kind)
    }

    pub fn contains(&self, kind: PassKind) -> bool {
        self.pass(kind).is_some()
    }

    pub fn enabled_passes(&self) -> impl Iterator<Item = &Pass> + '_ {
        self.passes.iter().filter(|pass| pass.enabled)
    }

    pub fn size(&self) -> RenderSize {
        self.size
    }

    pub fn options(&self) -> &PassOptions {
        &self.options
    }

    /// The pass that writes to the screen: the last enabled one.
    pub fn screen_pass(&self) -> Option<PassKind> {
        self.passes
            .iter()
            .find(|pass| pass.render_to_screen)
            .map(|pass| pass.kind)
    }

    fn pass_mut(&mut self, kind: PassKind) -> Result<&mut Pass, PipelineError> {
        self.passes
            .iter_mut()
            .find(|pass| pass.kind == kind)
            .ok_or(PipelineError::UnknownPass(kind))
    }

    fn update_screen_pass(&mut self) {
        let last = self.passes.iter().rposition(|pass| pass.enabled);
        for (index, pass) in self.passes.iter_mut().enumerate() {
            pass.render_to_screen = Some(index) == last;
        }
    }

    /// Resizes the render target. Only resolution parameters change.
    pub fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32) -> RenderSize {
        self.size = RenderSize::new(width, height, pixel_ratio);
        self.apply_size();
        debug!(
            width = self.size.device_width(),
            height = self.size.device_height(),
            ratio = self.size.pixel_ratio,
            "resized effect pipeline"
        );
        self.size
    }

    fn apply_size(&mut self) {
        let resolution = ParamValue::Vec2([
            self.size.device_width() as f32,
            self.size.device_height() as f32,
        ]);
        for pass in &mut self.passes {
            pass.params.set_role(ParamRole::Resolution, resolution);
        }
    }

    /// Sets every time parameter to `seconds` since the viewer started.
    pub fn advance_time(&mut self, seconds: f32) {
        for pass in &mut self.passes {
            pass.params.set_role(ParamRole::Time, ParamValue::Float(seconds));
        }
    }

    /// Pointer position in UV space, origin top-left.
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        for pass in &mut self.passes {
            pass.params.set_role(ParamRole::Pointer, ParamValue::Vec2([x, y]));
        }
    }

    pub fn set_rotation_velocity(&mut self, velocity: [f32; 2]) {
        for pass in &mut self.passes {
            pass.params.set_role(ParamRole::Velocity, ParamValue::Vec2(velocity));
        }
    }

    /// Disables every transient pass and zeroes every transient parameter.
    pub fn reset_transients(&mut self) {
        for pass in &mut self.passes {
            pass.params.reset_role(ParamRole::Transient);
            if pass.kind.is_transient() {
                pass.enabled = false;
            }
        }
        self.update_screen_pass();
    }

    pub fn is_quiescent(&self) -> bool {
        self.passes.iter().all(|pass| {
            pass.params.role_at_default(ParamRole::Transient)
                && !(pass.kind.is_transient() && pass.enabled)
        })
    }

    /// Composes all enabled passes in order on the CPU.
    pub fn render_cpu(&self, input: &Frame) -> Frame {
        let mut enabled = self.enabled_passes().peekable();
        if enabled.peek().is_none() {
            return input.clone();
        }
        let mut frame = input.clone();
        for pass in enabled {
            trace!(pass = %pass.kind, "cpu pass");
            frame = cpu::apply(pass.kind, &frame, &pass.params, &self.options);
        }
        frame
    }
}

impl PassControl for EffectPipeline {
    fn set_pass_enabled(&mut self, pass: PassKind, enabled: bool) -> Result<(), PipelineError> {
        let target = self.pass_mut(pass)?;
        if target.enabled != enabled {
            target.enabled = enabled;
            self.update_screen_pass();
        }
        Ok(())
    }

    fn set_pass_parameter(
        &mut self,
        pass: PassKind,
        name: &str,
        value: ParamValue,
    ) -> Result<ParamValue, PipelineError> {
        self.pass_mut(pass)?.params.set(name, value)
    }
}
