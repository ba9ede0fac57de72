use std::fmt;

use crossbeam_channel::Sender;

/// Catalog id of a garment model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        ModelId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog id of a matcap texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub String);

impl TextureId {
    pub fn new(id: impl Into<String>) -> Self {
        TextureId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one model load. Tickets increase monotonically, so a
/// completion carrying an older ticket is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub model: ModelId,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct LoadFailure(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadCompletion {
    pub ticket: LoadTicket,
    pub model: ModelId,
    pub result: Result<(), LoadFailure>,
}

impl LoadCompletion {
    pub fn succeeded(request: &LoadRequest) -> Self {
        Self {
            ticket: request.ticket,
            model: request.model.clone(),
            result: Ok(()),
        }
    }

    pub fn failed(request: &LoadRequest, reason: impl Into<String>) -> Self {
        Self {
            ticket: request.ticket,
            model: request.model.clone(),
            result: Err(LoadFailure(reason.into())),
        }
    }
}

/// Scene-side collaborator: owns the displayed mesh and its material.
pub trait SceneDriver {
    /// Starts fetching `request.model`. Exactly one [`LoadCompletion`] for
    /// the request must eventually be sent on `completions`, possibly before
    /// this call returns.
    fn load_model(&mut self, request: LoadRequest, completions: Sender<LoadCompletion>);

    /// Swaps the displayed mesh to a model whose load has completed.
    fn show_model(&mut self, model: &ModelId) -> Result<(), LoadFailure>;

    /// Applies a matcap texture to the current model.
    fn apply_texture(&mut self, texture: &TextureId);

    fn current_model(&self) -> Option<ModelId>;
}
