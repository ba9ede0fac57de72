/// Failure of a single asset load. `Clone` so one failure can be handed to
/// every caller waiting on the same load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("failed to fetch {source_url}: {reason}")]
    Fetch { source_url: String, reason: String },
    #[error("failed to decode {source_url}: {reason}")]
    Decode { source_url: String, reason: String },
    #[error("unsupported asset source '{0}'")]
    UnsupportedSource(String),
    #[error("asset worker for {0} exited without a result")]
    WorkerLost(String),
}

impl AssetError {
    pub(crate) fn fetch(source_url: &str, reason: impl ToString) -> Self {
        AssetError::Fetch {
            source_url: source_url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decode(source_url: &str, reason: impl ToString) -> Self {
        AssetError::Decode {
            source_url: source_url.to_string(),
            reason: reason.to_string(),
        }
    }
}
