use crate::passes::{ParamKind, PassKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("pass '{0}' is not part of this pipeline")]
    UnknownPass(PassKind),
    #[error("pass '{pass}' has no parameter named '{name}'")]
    UnknownParameter { pass: PassKind, name: String },
    #[error("parameter '{pass}.{name}' expects {expected:?}, got {found:?}")]
    TypeMismatch {
        pass: PassKind,
        name: &'static str,
        expected: ParamKind,
        found: ParamKind,
    },
    #[error("pipeline layout contains no passes")]
    Empty,
}
