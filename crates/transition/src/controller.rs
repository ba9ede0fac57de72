use std::time::Instant;

use fxconfig::Preset;
use postfx::{ParamValue, PassControl, PassKind};
use tracing::{debug, info, warn};

use crate::clock::PhaseClock;
use crate::driver::{LoadFailure, LoadRequest, LoadTicket, ModelId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    TransitioningOut,
    TransitioningIn,
}

#[derive(Debug, Clone)]
enum State {
    Idle,
    Out {
        clock: PhaseClock,
        target: ModelId,
        pending: Option<LoadTicket>,
    },
    In {
        clock: PhaseClock,
        target: ModelId,
    },
}

/// What the caller should do with a load completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The completion matched the in-flight load; the in-phase has started.
    Accepted,
    /// The completion belongs to a superseded request and was ignored.
    Stale,
}

/// Drives transient pass intensities through an out-phase, a model load and
/// an in-phase.
///
/// A selection received mid-transition preempts the running one: the new
/// target replaces the old during the out-phase, a pending load is abandoned
/// and reissued, and an in-phase reverses into the out-phase at the mirrored
/// progress so intensities stay continuous.
#[derive(Debug, Clone)]
pub struct TransitionController {
    preset: Preset,
    transient_passes: Vec<PassKind>,
    state: State,
    next_ticket: u64,
    displayed: Option<ModelId>,
    intensity: f32,
}

impl TransitionController {
    pub fn new(preset: Preset, displayed: Option<ModelId>) -> Self {
        let transient_passes = preset.transient_passes();
        Self {
            preset,
            transient_passes,
            state: State::Idle,
            next_ticket: 1,
            displayed,
            intensity: 0.0,
        }
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Out { .. } => Phase::TransitioningOut,
            State::In { .. } => Phase::TransitioningIn,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Model the running transition is heading to.
    pub fn target(&self) -> Option<&ModelId> {
        match &self.state {
            State::Idle => None,
            State::Out { target, .. } | State::In { target, .. } => Some(target),
        }
    }

    pub fn pending_ticket(&self) -> Option<LoadTicket> {
        match &self.state {
            State::Out { pending, .. } => *pending,
            _ => None,
        }
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.pending_ticket() == Some(ticket)
    }

    pub fn displayed(&self) -> Option<&ModelId> {
        self.displayed.as_ref()
    }

    /// Replaces the controller's record of the model on screen with what the
    /// scene actually shows.
    pub fn set_displayed(&mut self, model: Option<ModelId>) {
        self.displayed = model;
    }

    /// Eased intensity multiplier applied to every peak on the last write.
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Requests a swap to `model`. Returns a load request when one must be
    /// issued right away (zero-length out-phase, or a retarget while a load
    /// was already pending).
    pub fn select_model<P>(&mut self, model: ModelId, now: Instant, fx: &mut P) -> Option<LoadRequest>
    where
        P: PassControl + ?Sized,
    {
        let state = std::mem::replace(&mut self.state, State::Idle);
        self.state = match state {
            State::Idle => {
                if self.displayed.as_ref() == Some(&model) {
                    debug!(model = %model, "model already displayed; ignoring selection");
                    return None;
                }
                info!(model = %model, "starting transition");
                self.enable_transients(fx);
                State::Out {
                    clock: PhaseClock::new(now, self.preset.out_duration),
                    target: model,
                    pending: None,
                }
            }
            State::Out {
                clock,
                target,
                pending,
            } => {
                if target == model {
                    self.state = State::Out {
                        clock,
                        target,
                        pending,
                    };
                    return None;
                }
                if let Some(ticket) = pending {
                    debug!(%ticket, stale = %target, model = %model, "abandoning pending load");
                } else {
                    debug!(from = %target, to = %model, "retargeting transition");
                }
                State::Out {
                    clock,
                    target: model,
                    pending: None,
                }
            }
            State::In { clock, target } => {
                // A target whose load failed is not on screen; selecting it
                // again retries.
                if target == model && self.displayed.as_ref() == Some(&target) {
                    self.state = State::In { clock, target };
                    return None;
                }
                let mirrored = 1.0 - clock.progress(now);
                debug!(to = %model, progress = mirrored, "reversing into out-phase");
                self.enable_transients(fx);
                State::Out {
                    clock: PhaseClock::resumed(now, self.preset.out_duration, mirrored),
                    target: model,
                    pending: None,
                }
            }
        };
        self.advance(now, fx)
    }

    /// Steps the state machine and writes transient parameters for `now`.
    /// Returns a load request when the out-phase has just completed.
    pub fn advance<P>(&mut self, now: Instant, fx: &mut P) -> Option<LoadRequest>
    where
        P: PassControl + ?Sized,
    {
        match &mut self.state {
            State::Idle => None,
            State::Out {
                clock,
                target,
                pending,
            } => {
                let progress = clock.progress(now);
                let eased = self.preset.curve.sample(progress);
                let request = if progress >= 1.0 && pending.is_none() {
                    let ticket = LoadTicket(self.next_ticket);
                    self.next_ticket += 1;
                    *pending = Some(ticket);
                    debug!(%ticket, model = %target, "out-phase complete; requesting load");
                    Some(LoadRequest {
                        ticket,
                        model: target.clone(),
                    })
                } else {
                    None
                };
                self.write_intensity(eased, fx);
                request
            }
            State::In { clock, .. } => {
                let progress = clock.progress(now);
                if progress >= 1.0 {
                    self.finish(fx);
                } else {
                    let eased = self.preset.curve.sample(1.0 - progress);
                    self.write_intensity(eased, fx);
                }
                None
            }
        }
    }

    /// Feeds back the outcome of a load. Completions whose ticket is not the
    /// pending one are ignored. A failed load still runs the in-phase so the
    /// effects ramp down; the displayed model stays as it was.
    pub fn model_loaded(
        &mut self,
        ticket: LoadTicket,
        result: Result<(), LoadFailure>,
        now: Instant,
    ) -> CompletionOutcome {
        if !self.is_current(ticket) {
            debug!(%ticket, "ignoring stale load completion");
            return CompletionOutcome::Stale;
        }
        let State::Out { target, .. } = std::mem::replace(&mut self.state, State::Idle) else {
            return CompletionOutcome::Stale;
        };
        match result {
            Ok(()) => {
                info!(model = %target, %ticket, "model loaded");
                self.displayed = Some(target.clone());
            }
            Err(err) => {
                warn!(model = %target, %ticket, error = %err, "model load failed; keeping current model");
            }
        }
        self.state = State::In {
            clock: PhaseClock::new(now, self.preset.in_duration),
            target,
        };
        CompletionOutcome::Accepted
    }

    fn enable_transients<P>(&self, fx: &mut P)
    where
        P: PassControl + ?Sized,
    {
        for &pass in &self.transient_passes {
            if let Err(err) = fx.set_pass_enabled(pass, true) {
                warn!(%pass, error = %err, "failed to enable transient pass");
            }
        }
    }

    fn write_intensity<P>(&mut self, eased: f32, fx: &mut P)
    where
        P: PassControl + ?Sized,
    {
        self.intensity = eased;
        for effect in &self.preset.effects {
            let value = ParamValue::Float(eased * effect.peak);
            if let Err(err) = fx.set_pass_parameter(effect.pass, &effect.param, value) {
                warn!(pass = %effect.pass, param = %effect.param, error = %err, "failed to write transient parameter");
            }
        }
    }

    fn finish<P>(&mut self, fx: &mut P)
    where
        P: PassControl + ?Sized,
    {
        self.write_intensity(0.0, fx);
        for &pass in &self.transient_passes {
            if let Err(err) = fx.set_pass_enabled(pass, false) {
                warn!(%pass, error = %err, "failed to disable transient pass");
            }
        }
        self.state = State::Idle;
        info!(model = ?self.displayed.as_ref().map(ModelId::as_str), "transition complete");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fxconfig::presets;
    use postfx::{EffectPipeline, PassOptions, RenderSize};

    use super::*;

    const PHASE: Duration = Duration::from_millis(350);

    fn setup(name: &str) -> (TransitionController, EffectPipeline) {
        let preset = presets::builtin(name).unwrap();
        let pipeline =
            EffectPipeline::new(&preset.layout(), RenderSize::default(), PassOptions::default())
                .unwrap();
        (
            TransitionController::new(preset, Some(ModelId::new("hoodie"))),
            pipeline,
        )
    }

    fn pixel_size(pipeline: &EffectPipeline) -> f32 {
        pipeline
            .pass(PassKind::Pixelation)
            .unwrap()
            .params()
            .float("pixelSize")
    }

    #[test]
    fn out_phase_follows_ease_curve() {
        let (mut controller, mut fx) = setup("pixel");
        let t0 = Instant::now();
        assert!(controller
            .select_model(ModelId::new("tee"), t0, &mut fx)
            .is_none());
        assert_eq!(controller.phase(), Phase::TransitioningOut);
        assert_eq!(pixel_size(&fx), 0.0);
        assert!(fx.pass(PassKind::Pixelation).unwrap().enabled());

        assert!(controller.advance(t0 + PHASE / 2, &mut fx).is_none());
        assert!((pixel_size(&fx) - 0.004).abs() < 1e-6);

        let request = controller.advance(t0 + PHASE, &mut fx).expect("load request");
        assert_eq!(request.model, ModelId::new("tee"));
        assert!((pixel_size(&fx) - 0.008).abs() < 1e-6);

        // Peak is held while waiting; no second request.
        assert!(controller.advance(t0 + PHASE * 3, &mut fx).is_none());
        assert!((pixel_size(&fx) - 0.008).abs() < 1e-6);
    }

    #[test]
    fn in_phase_ramps_down_to_idle() {
        let (mut controller, mut fx) = setup("pixel");
        let t0 = Instant::now();
        controller.select_model(ModelId::new("tee"), t0, &mut fx);
        let request = controller.advance(t0 + PHASE, &mut fx).unwrap();
        let t1 = t0 + PHASE;
        assert_eq!(
            controller.model_loaded(request.ticket, Ok(()), t1),
            CompletionOutcome::Accepted
        );
        assert_eq!(controller.phase(), Phase::TransitioningIn);
        assert_eq!(controller.displayed(), Some(&ModelId::new("tee")));

        controller.advance(t1, &mut fx);
        assert!((pixel_size(&fx) - 0.008).abs() < 1e-6);
        controller.advance(t1 + PHASE / 2, &mut fx);
        assert!((pixel_size(&fx) - 0.004).abs() < 1e-6);
        controller.advance(t1 + PHASE, &mut fx);
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(fx.is_quiescent());
        assert_eq!(fx.screen_pass(), Some(PassKind::Grain));
    }

    #[test]
    fn selecting_displayed_model_is_a_no_op() {
        let (mut controller, mut fx) = setup("glitch");
        let now = Instant::now();
        assert!(controller
            .select_model(ModelId::new("hoodie"), now, &mut fx)
            .is_none());
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(fx.is_quiescent());
    }

    #[test]
    fn selecting_current_target_is_a_no_op() {
        let (mut controller, mut fx) = setup("pixel");
        let t0 = Instant::now();
        controller.select_model(ModelId::new("tee"), t0, &mut fx);
        let request = controller.advance(t0 + PHASE, &mut fx).unwrap();
        assert!(controller
            .select_model(ModelId::new("tee"), t0 + PHASE, &mut fx)
            .is_none());
        assert!(controller.is_current(request.ticket));
    }

    #[test]
    fn retarget_during_pending_load_invalidates_ticket() {
        let (mut controller, mut fx) = setup("pixel");
        let t0 = Instant::now();
        controller.select_model(ModelId::new("tee"), t0, &mut fx);
        let first = controller.advance(t0 + PHASE, &mut fx).unwrap();
        let second = controller
            .select_model(ModelId::new("jacket"), t0 + PHASE, &mut fx)
            .expect("reissued load");
        assert!(second.ticket > first.ticket);
        assert_eq!(second.model, ModelId::new("jacket"));
        assert_eq!(
            controller.model_loaded(first.ticket, Ok(()), t0 + PHASE),
            CompletionOutcome::Stale
        );
        assert_eq!(controller.phase(), Phase::TransitioningOut);
        assert_eq!(controller.displayed(), Some(&ModelId::new("hoodie")));
    }

    #[test]
    fn selection_during_in_phase_mirrors_progress() {
        let (mut controller, mut fx) = setup("pixel");
        let t0 = Instant::now();
        controller.select_model(ModelId::new("tee"), t0, &mut fx);
        let request = controller.advance(t0 + PHASE, &mut fx).unwrap();
        let t1 = t0 + PHASE;
        controller.model_loaded(request.ticket, Ok(()), t1);
        let quarter = t1 + PHASE / 4;
        controller.advance(quarter, &mut fx);
        let before = controller.intensity();

        assert!(controller
            .select_model(ModelId::new("jacket"), quarter, &mut fx)
            .is_none());
        assert_eq!(controller.phase(), Phase::TransitioningOut);
        assert!((controller.intensity() - before).abs() < 1e-3);
        assert_eq!(controller.target(), Some(&ModelId::new("jacket")));
    }

    #[test]
    fn failed_load_still_returns_to_idle() {
        let (mut controller, mut fx) = setup("diffuse");
        let t0 = Instant::now();
        controller.select_model(ModelId::new("tee"), t0, &mut fx);
        let request = controller.advance(t0 + PHASE, &mut fx).unwrap();
        controller.model_loaded(
            request.ticket,
            Err(LoadFailure("404".into())),
            t0 + PHASE,
        );
        assert_eq!(controller.phase(), Phase::TransitioningIn);
        controller.advance(t0 + PHASE * 2, &mut fx);
        assert_eq!(controller.phase(), Phase::Idle);
        assert_eq!(controller.displayed(), Some(&ModelId::new("hoodie")));
        assert!(fx.is_quiescent());
    }

    #[test]
    fn zero_length_phases_complete_on_the_same_tick() {
        let mut preset = presets::builtin("pixel").unwrap();
        preset.out_duration = Duration::ZERO;
        preset.in_duration = Duration::ZERO;
        let mut fx =
            EffectPipeline::new(&preset.layout(), RenderSize::default(), PassOptions::default())
                .unwrap();
        let mut controller = TransitionController::new(preset, None);
        let now = Instant::now();
        let request = controller
            .select_model(ModelId::new("tee"), now, &mut fx)
            .expect("immediate load");
        controller.model_loaded(request.ticket, Ok(()), now);
        controller.advance(now, &mut fx);
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(fx.is_quiescent());
    }

    #[test]
    fn retrying_a_failed_target_during_in_phase_reloads() {
        let (mut controller, mut fx) = setup("pixel");
        let t0 = Instant::now();
        controller.select_model(ModelId::new("tee"), t0, &mut fx);
        let failed = controller.advance(t0 + PHASE, &mut fx).unwrap();
        let t1 = t0 + PHASE;
        controller.model_loaded(failed.ticket, Err(LoadFailure("offline".into())), t1);
        assert_eq!(controller.phase(), Phase::TransitioningIn);

        let retry_at = t1 + PHASE / 2;
        controller.select_model(ModelId::new("tee"), retry_at, &mut fx);
        assert_eq!(controller.phase(), Phase::TransitioningOut);
        let retry = controller.advance(t1 + PHASE * 2, &mut fx).expect("second load");
        assert_eq!(retry.model, ModelId::new("tee"));
        assert!(retry.ticket > failed.ticket);
    }

    #[test]
    fn loaded_target_is_not_reselected_during_in_phase() {
        let (mut controller, mut fx) = setup("pixel");
        let t0 = Instant::now();
        controller.select_model(ModelId::new("tee"), t0, &mut fx);
        let request = controller.advance(t0 + PHASE, &mut fx).unwrap();
        controller.model_loaded(request.ticket, Ok(()), t0 + PHASE);

        controller.select_model(ModelId::new("tee"), t0 + PHASE * 3 / 2, &mut fx);
        assert_eq!(controller.phase(), Phase::TransitioningIn);
    }
}
