use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use postfx::{EffectPipeline, RenderSize};
use tracing::{debug, warn};

use crate::controller::{CompletionOutcome, Phase, TransitionController};
use crate::driver::{LoadCompletion, ModelId, SceneDriver, TextureId};

/// Per-frame inputs gathered by the window layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    /// Pointer position in UV space (origin top-left), if known.
    pub pointer: Option<[f32; 2]>,
    /// Model rotation delta since the previous frame.
    pub rotation_velocity: [f32; 2],
}

impl Default for FrameInputs {
    fn default() -> Self {
        Self {
            pointer: None,
            rotation_velocity: [0.0, 0.0],
        }
    }
}

/// Single writer of pass state.
///
/// Every frame [`Stage::tick`] drains load completions, advances the
/// controller (which writes transient parameters), then writes the steady
/// per-frame parameters. Rendering happens after the tick.
pub struct Stage<D> {
    controller: TransitionController,
    pipeline: EffectPipeline,
    driver: D,
    completions_tx: Sender<LoadCompletion>,
    completions_rx: Receiver<LoadCompletion>,
    started: Instant,
}

impl<D: SceneDriver> Stage<D> {
    pub fn new(
        controller: TransitionController,
        pipeline: EffectPipeline,
        driver: D,
        started: Instant,
    ) -> Self {
        let (completions_tx, completions_rx) = crossbeam_channel::unbounded();
        Self {
            controller,
            pipeline,
            driver,
            completions_tx,
            completions_rx,
            started,
        }
    }

    pub fn controller(&self) -> &TransitionController {
        &self.controller
    }

    pub fn pipeline(&self) -> &EffectPipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut EffectPipeline {
        &mut self.pipeline
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    /// Selection entry point for models. Loads are issued from here only when
    /// the out-phase is already complete. Same-model checks use the model the
    /// driver is showing.
    pub fn select_model(&mut self, model: ModelId, now: Instant) {
        self.controller.set_displayed(self.driver.current_model());
        if let Some(request) = self.controller.select_model(model, now, &mut self.pipeline) {
            self.driver.load_model(request, self.completions_tx.clone());
        }
    }

    /// Textures swap immediately, without a transition.
    pub fn select_texture(&mut self, texture: TextureId) {
        debug!(texture = %texture, "applying texture");
        self.driver.apply_texture(&texture);
    }

    pub fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32) -> RenderSize {
        self.pipeline.resize(width, height, pixel_ratio)
    }

    pub fn tick(&mut self, now: Instant, inputs: FrameInputs) -> Phase {
        self.drain_completions(now);

        if let Some(request) = self.controller.advance(now, &mut self.pipeline) {
            self.driver.load_model(request, self.completions_tx.clone());
        }

        let seconds = now.saturating_duration_since(self.started).as_secs_f32();
        self.pipeline.advance_time(seconds);
        if let Some([x, y]) = inputs.pointer {
            self.pipeline.set_pointer(x, y);
        }
        self.pipeline.set_rotation_velocity(inputs.rotation_velocity);

        if self.controller.is_idle() && !self.pipeline.is_quiescent() {
            warn!("transient passes left active after transition; resetting");
            self.pipeline.reset_transients();
        }
        self.controller.phase()
    }

    fn drain_completions(&mut self, now: Instant) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            let LoadCompletion {
                ticket,
                model,
                result,
            } = completion;
            let result = if self.controller.is_current(ticket) {
                result.and_then(|()| self.driver.show_model(&model))
            } else {
                result
            };
            if self.controller.model_loaded(ticket, result, now) == CompletionOutcome::Stale {
                debug!(%ticket, model = %model, "dropped superseded load");
            }
        }
    }
}
