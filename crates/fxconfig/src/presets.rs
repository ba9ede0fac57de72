use std::time::Duration;

use postfx::{EasingCurve, ParamKind, ParamRole, PassKind, PipelineLayout};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Built-in preset used when the configuration does not name one.
pub const DEFAULT_PRESET: &str = "pixel";

/// Names of the presets compiled into the binary.
pub const BUILTIN_PRESETS: [&str; 5] = ["still", "pixel", "glitch", "blinds", "diffuse"];

const DEFAULT_PHASE: Duration = Duration::from_millis(350);

/// Peak value one transient parameter reaches at the end of the out-phase.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EffectPeak {
    pub pass: PassKind,
    pub param: String,
    pub peak: f32,
}

impl EffectPeak {
    pub fn new(pass: PassKind, param: &str, peak: f32) -> Self {
        Self {
            pass,
            param: param.to_string(),
            peak,
        }
    }
}

/// Declarative description of a model-swap transition.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Preset {
    pub passes: Vec<PassKind>,
    #[serde(rename = "out", default = "default_phase", with = "crate::duration")]
    pub out_duration: Duration,
    #[serde(rename = "in", default = "default_phase", with = "crate::duration")]
    pub in_duration: Duration,
    #[serde(default)]
    pub curve: EasingCurve,
    #[serde(default)]
    pub effects: Vec<EffectPeak>,
}

fn default_phase() -> Duration {
    DEFAULT_PHASE
}

impl Preset {
    fn builtin(passes: &[PassKind], effects: Vec<EffectPeak>) -> Self {
        Self {
            passes: passes.to_vec(),
            out_duration: DEFAULT_PHASE,
            in_duration: DEFAULT_PHASE,
            curve: EasingCurve::EaseInOut,
            effects,
        }
    }

    /// Passes in canonical composition order, duplicates removed.
    pub fn layout(&self) -> PipelineLayout {
        PipelineLayout::new(self.passes.iter().copied())
    }

    /// Transient passes this preset switches on while a transition runs.
    pub fn transient_passes(&self) -> Vec<PassKind> {
        self.layout()
            .kinds()
            .iter()
            .copied()
            .filter(|kind| kind.is_transient())
            .collect()
    }

    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.passes.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "preset '{name}' must list at least one pass"
            )));
        }
        let layout = self.layout();
        for effect in &self.effects {
            let pass = effect.pass;
            if !layout.contains(pass) {
                return Err(ConfigError::Invalid(format!(
                    "preset '{name}' drives '{pass}.{}' but '{pass}' is not in its passes",
                    effect.param
                )));
            }
            let spec = pass.spec().param(&effect.param).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "preset '{name}': pass '{pass}' has no parameter '{}'",
                    effect.param
                ))
            })?;
            if spec.role != ParamRole::Transient || spec.kind != ParamKind::Float {
                return Err(ConfigError::Invalid(format!(
                    "preset '{name}': '{pass}.{}' is not a transient intensity",
                    effect.param
                )));
            }
            if !effect.peak.is_finite() || effect.peak < 0.0 || effect.peak > spec.max {
                return Err(ConfigError::Invalid(format!(
                    "preset '{name}': peak for '{pass}.{}' must be within 0..={}, got {}",
                    effect.param, spec.max, effect.peak
                )));
            }
        }
        Ok(())
    }
}

/// Looks up one of the presets compiled into the binary.
pub fn builtin(name: &str) -> Option<Preset> {
    use PassKind::*;

    let preset = match name {
        "still" => Preset::builtin(&[Chromatic, Grain], Vec::new()),
        "pixel" => Preset::builtin(
            &[Chromatic, Pixelation, Noise, Grain],
            vec![
                EffectPeak::new(Pixelation, "pixelSize", 0.008),
                EffectPeak::new(Noise, "noiseStrength", 0.12),
            ],
        ),
        "glitch" => Preset::builtin(
            &[Chromatic, Noise, RgbGlitch, Grain],
            vec![
                EffectPeak::new(RgbGlitch, "uAmount", 1.0),
                EffectPeak::new(RgbGlitch, "uChromAbb", 0.02),
                EffectPeak::new(RgbGlitch, "uGlitch", 0.6),
                EffectPeak::new(Noise, "noiseStrength", 0.1),
            ],
        ),
        "blinds" => Preset::builtin(
            &[Chromatic, Blinds, Grain],
            vec![EffectPeak::new(Blinds, "uAmount", 1.0)],
        ),
        "diffuse" => Preset::builtin(
            &[Chromatic, Noise, Diffuse, Grain],
            vec![
                EffectPeak::new(Diffuse, "amount", 0.05),
                EffectPeak::new(Noise, "noiseStrength", 0.08),
            ],
        ),
        _ => return None,
    };
    Some(preset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_validates() {
        for name in BUILTIN_PRESETS {
            let preset = builtin(name).expect("builtin preset");
            preset.validate(name).unwrap();
            assert_eq!(preset.out_duration, Duration::from_millis(350));
            assert_eq!(preset.in_duration, Duration::from_millis(350));
            assert_eq!(preset.curve, EasingCurve::EaseInOut);
        }
        assert!(builtin("bloom").is_none());
    }

    #[test]
    fn pixel_preset_peaks() {
        let preset = builtin("pixel").unwrap();
        assert_eq!(
            preset.transient_passes(),
            vec![PassKind::Pixelation, PassKind::Noise]
        );
        assert_eq!(preset.effects[0], EffectPeak::new(PassKind::Pixelation, "pixelSize", 0.008));
    }

    #[test]
    fn rejects_steady_parameter_as_effect() {
        let mut preset = builtin("still").unwrap();
        preset
            .effects
            .push(EffectPeak::new(PassKind::Grain, "uAmount", 0.5));
        assert!(matches!(preset.validate("x"), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_effect_on_missing_pass() {
        let mut preset = builtin("still").unwrap();
        preset
            .effects
            .push(EffectPeak::new(PassKind::Diffuse, "amount", 0.05));
        let err = preset.validate("x").unwrap_err();
        assert!(err.to_string().contains("not in its passes"));
    }

    #[test]
    fn rejects_peak_out_of_range() {
        let mut preset = builtin("pixel").unwrap();
        preset.effects[0].peak = -0.1;
        assert!(preset.validate("pixel").is_err());
        preset.effects[0].peak = f32::NAN;
        assert!(preset.validate("pixel").is_err());
    }
}
