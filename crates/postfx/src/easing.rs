use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Shape applied to normalised transition progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EasingCurve {
    Linear,
    Smoothstep,
    /// Quadratic ease-in-out: `2t²` below one half, `1 - (2 - 2t)² / 2` above.
    #[default]
    EaseInOut,
}

impl EasingCurve {
    /// Samples the curve at `t`, clamping the input to `[0, 1]` first.
    pub fn sample(self, t: f32) -> f32 {
        let clamped = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            EasingCurve::Linear => clamped,
            EasingCurve::Smoothstep => clamped * clamped * (3.0 - 2.0 * clamped),
            EasingCurve::EaseInOut => {
                if clamped < 0.5 {
                    2.0 * clamped * clamped
                } else {
                    -1.0 + (4.0 - 2.0 * clamped) * clamped
                }
            }
        }
    }
}

impl fmt::Display for EasingCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EasingCurve::Linear => f.write_str("linear"),
            EasingCurve::Smoothstep => f.write_str("smoothstep"),
            EasingCurve::EaseInOut => f.write_str("ease-in-out"),
        }
    }
}

impl FromStr for EasingCurve {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(EasingCurve::Linear),
            "smoothstep" | "smooth" => Ok(EasingCurve::Smoothstep),
            "ease-in-out" | "easeinout" | "ease_in_out" | "quad" => Ok(EasingCurve::EaseInOut),
            other => Err(format!(
                "unknown easing curve '{other}'; expected linear, smoothstep, or ease-in-out"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_curve_increases_monotonically() {
        let curve = EasingCurve::Linear;
        let mut last = 0.0;
        for step in 0..=10 {
            let sample = curve.sample(step as f32 / 10.0);
            assert!(sample >= last - f32::EPSILON);
            last = sample;
        }
    }

    #[test]
    fn ease_in_out_hits_endpoints_and_midpoint() {
        let curve = EasingCurve::EaseInOut;
        assert!((curve.sample(0.0) - 0.0).abs() < 1e-6);
        assert!((curve.sample(0.5) - 0.5).abs() < 1e-6);
        assert!((curve.sample(1.0) - 1.0).abs() < 1e-6);
        assert!(curve.sample(0.25) < 0.25);
        assert!(curve.sample(0.75) > 0.75);
    }

    #[test]
    fn ease_in_out_matches_closed_form() {
        let curve = EasingCurve::EaseInOut;
        for step in 0..=20 {
            let t = step as f32 / 20.0;
            let expected = if t < 0.5 {
                2.0 * t * t
            } else {
                1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
            };
            assert!((curve.sample(t) - expected).abs() < 1e-5, "t = {t}");
        }
    }

    #[test]
    fn clamps_out_of_range_input() {
        for curve in [EasingCurve::Linear, EasingCurve::Smoothstep, EasingCurve::EaseInOut] {
            assert_eq!(curve.sample(-3.0), 0.0);
            assert_eq!(curve.sample(7.0), 1.0);
            assert_eq!(curve.sample(f32::NAN), 0.0);
        }
    }

    #[test]
    fn parses_curve_names() {
        assert_eq!("Ease-In-Out".parse::<EasingCurve>().unwrap(), EasingCurve::EaseInOut);
        assert_eq!("smooth".parse::<EasingCurve>().unwrap(), EasingCurve::Smoothstep);
        assert!("bounce".parse::<EasingCurve>().is_err());
    }
}
