use tracing::warn;

use crate::error::PipelineError;
use crate::passes::{ParamRole, ParamSpec, ParamValue, PassKind, PassSpec, PARAM_SLOTS};

/// Current parameter values for one pass, kept in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    kind: PassKind,
    entries: Vec<(&'static ParamSpec, ParamValue)>,
}

impl Parameters {
    pub fn defaults(spec: &'static PassSpec) -> Self {
        Self {
            kind: spec.kind,
            entries: spec
                .params
                .iter()
                .map(|param| (param, param.default))
                .collect(),
        }
    }

    pub fn kind(&self) -> PassKind {
        self.kind
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.entries
            .iter()
            .find(|(spec, _)| spec.name == name)
            .map(|(_, value)| *value)
    }

    /// Reads a scalar parameter; missing or mistyped names read as zero.
    pub fn float(&self, name: &str) -> f32 {
        let value = self.get(name).and_then(|value| value.as_float());
        debug_assert!(value.is_some(), "{}.{name} is not a float parameter", self.kind);
        value.unwrap_or(0.0)
    }

    pub fn vec2(&self, name: &str) -> [f32; 2] {
        let value = self.get(name).and_then(|value| value.as_vec2());
        debug_assert!(value.is_some(), "{}.{name} is not a vec2 parameter", self.kind);
        value.unwrap_or([0.0, 0.0])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static ParamSpec, ParamValue)> + '_ {
        self.entries.iter().map(|(spec, value)| (*spec, *value))
    }

    /// Writes a parameter, clamping it into the declared range.
    ///
    /// Out-of-range values are not an error: they are clamped and logged.
    /// Non-finite values fall back to the declared default. Returns the value
    /// that was actually stored.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<ParamValue, PipelineError> {
        let kind = self.kind;
        let (spec, slot) = self
            .entries
            .iter_mut()
            .find(|(spec, _)| spec.name == name)
            .ok_or_else(|| PipelineError::UnknownParameter {
                pass: kind,
                name: name.to_string(),
            })?;

        if value.kind() != spec.kind {
            return Err(PipelineError::TypeMismatch {
                pass: kind,
                name: spec.name,
                expected: spec.kind,
                found: value.kind(),
            });
        }

        let stored = if !value.is_finite() {
            warn!(pass = %kind, param = spec.name, %value, "non-finite parameter; using default");
            spec.default
        } else {
            let clamped = value.clamped(spec.min, spec.max);
            if clamped != value {
                warn!(
                    pass = %kind,
                    param = spec.name,
                    requested = %value,
                    clamped = %clamped,
                    "parameter out of range; clamping"
                );
            }
            clamped
        };
        *slot = stored;
        Ok(stored)
    }

    /// Writes `value` to every parameter with the given role, clamped silently.
    pub(crate) fn set_role(&mut self, role: ParamRole, value: ParamValue) {
        for (spec, slot) in &mut self.entries {
            if spec.role == role && spec.kind == value.kind() && value.is_finite() {
                *slot = value.clamped(spec.min, spec.max);
            }
        }
    }

    pub(crate) fn reset_role(&mut self, role: ParamRole) {
        for (spec, slot) in &mut self.entries {
            if spec.role == role {
                *slot = spec.default;
            }
        }
    }

    pub fn role_at_default(&self, role: ParamRole) -> bool {
        self.entries
            .iter()
            .filter(|(spec, _)| spec.role == role)
            .all(|(spec, value)| *value == spec.default)
    }

    /// Packs values into the `vec4` slot array consumed by the GPU uniform block.
    pub fn pack(&self) -> [[f32; 4]; PARAM_SLOTS] {
        let mut flat = [0.0f32; PARAM_SLOTS * 4];
        for (spec, offset) in self.kind.spec().slot_layout() {
            if let Some(value) = self.get(spec.name) {
                for (index, component) in value.components().iter().enumerate() {
                    flat[offset + index] = *component;
                }
            }
        }
        let mut slots = [[0.0f32; 4]; PARAM_SLOTS];
        for (index, chunk) in flat.chunks_exact(4).enumerate() {
            slots[index].copy_from_slice(chunk);
        }
        slots
    }
}
