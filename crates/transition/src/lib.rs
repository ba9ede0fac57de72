//! Model-swap transitions: the eased two-phase controller and the per-frame
//! stage that owns every write to the effect pipeline.

mod clock;
mod controller;
mod driver;
mod stage;

pub use clock::PhaseClock;
pub use controller::{CompletionOutcome, Phase, TransitionController};
pub use driver::{
    LoadCompletion, LoadFailure, LoadRequest, LoadTicket, ModelId, SceneDriver, TextureId,
};
pub use stage::{FrameInputs, Stage};
