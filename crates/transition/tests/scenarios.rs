use std::collections::HashSet;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use fxconfig::presets;
use postfx::{EffectPipeline, PassKind, PassOptions, RenderSize};
use transition::{
    FrameInputs, LoadCompletion, LoadFailure, LoadRequest, ModelId, Phase, SceneDriver, Stage,
    TextureId, TransitionController,
};

const FRAME: Duration = Duration::from_millis(16);
const PHASE: Duration = Duration::from_millis(350);

#[derive(Default)]
struct FakeDriver {
    requests: Vec<LoadRequest>,
    held: Vec<(LoadRequest, Sender<LoadCompletion>)>,
    failing: HashSet<String>,
    hold: bool,
    shown: Option<ModelId>,
    texture: Option<TextureId>,
}

impl FakeDriver {
    fn release_all(&mut self) {
        for (request, completions) in self.held.drain(..) {
            let completion = if self.failing.contains(request.model.as_str()) {
                LoadCompletion::failed(&request, "not found")
            } else {
                LoadCompletion::succeeded(&request)
            };
            completions.send(completion).unwrap();
        }
    }
}

impl SceneDriver for FakeDriver {
    fn load_model(&mut self, request: LoadRequest, completions: Sender<LoadCompletion>) {
        self.requests.push(request.clone());
        self.held.push((request, completions));
        if !self.hold {
            self.release_all();
        }
    }

    fn show_model(&mut self, model: &ModelId) -> Result<(), LoadFailure> {
        self.shown = Some(model.clone());
        Ok(())
    }

    fn apply_texture(&mut self, texture: &TextureId) {
        self.texture = Some(texture.clone());
    }

    fn current_model(&self) -> Option<ModelId> {
        self.shown.clone()
    }
}

/// Builds a stage showing `hoodie`, as after a successful initial load.
fn stage(preset: &str, mut driver: FakeDriver, now: Instant) -> Stage<FakeDriver> {
    driver.shown = Some(ModelId::new("hoodie"));
    let preset = presets::builtin(preset).unwrap();
    let pipeline = EffectPipeline::new(
        &preset.layout(),
        RenderSize::new(1280, 800, 1.0),
        PassOptions::default(),
    )
    .unwrap();
    let controller = TransitionController::new(preset, Some(ModelId::new("hoodie")));
    Stage::new(controller, pipeline, driver, now)
}

fn param(stage: &Stage<FakeDriver>, pass: PassKind, name: &str) -> f32 {
    stage.pipeline().pass(pass).unwrap().params().float(name)
}

/// Ticks at frame cadence from `from` until `until` (inclusive), returning
/// the last tick time.
fn run(stage: &mut Stage<FakeDriver>, from: Instant, until: Instant) -> Instant {
    let mut now = from;
    while now < until {
        stage.tick(now, FrameInputs::default());
        now += FRAME;
    }
    stage.tick(until, FrameInputs::default());
    until
}

#[test]
fn pixel_preset_swaps_with_a_single_load() {
    let t0 = Instant::now();
    let mut stage = stage(
        "pixel",
        FakeDriver {
            hold: true,
            ..FakeDriver::default()
        },
        t0,
    );

    stage.select_model(ModelId::new("tee"), t0);
    stage.tick(t0, FrameInputs::default());
    assert_eq!(stage.phase(), Phase::TransitioningOut);
    assert_eq!(param(&stage, PassKind::Pixelation, "pixelSize"), 0.0);

    let mut last = 0.0;
    let mut now = t0;
    while now < t0 + PHASE {
        stage.tick(now, FrameInputs::default());
        let value = param(&stage, PassKind::Pixelation, "pixelSize");
        assert!(value >= last, "pixelSize decreased during out-phase");
        last = value;
        assert!(stage.driver().requests.is_empty(), "load issued before out-phase ended");
        now += FRAME;
    }

    stage.tick(t0 + PHASE, FrameInputs::default());
    assert!((param(&stage, PassKind::Pixelation, "pixelSize") - 0.008).abs() < 1e-6);
    assert_eq!(stage.driver().requests.len(), 1);

    stage.driver_mut().release_all();
    let loaded_at = t0 + PHASE + FRAME;
    stage.tick(loaded_at, FrameInputs::default());
    assert_eq!(stage.phase(), Phase::TransitioningIn);
    assert_eq!(stage.driver().shown, Some(ModelId::new("tee")));

    run(&mut stage, loaded_at, loaded_at + PHASE);
    assert_eq!(stage.phase(), Phase::Idle);
    assert!(stage.pipeline().is_quiescent());
    assert_eq!(stage.driver().requests.len(), 1);
}

#[test]
fn double_select_loads_only_the_latest_model() {
    let t0 = Instant::now();
    let mut stage = stage("glitch", FakeDriver::default(), t0);

    stage.select_model(ModelId::new("tee"), t0);
    stage.tick(t0 + FRAME, FrameInputs::default());
    stage.select_model(ModelId::new("jacket"), t0 + FRAME * 2);

    let end = run(&mut stage, t0 + FRAME * 2, t0 + PHASE * 4);
    assert_eq!(stage.phase(), Phase::Idle, "still transitioning at {end:?}");
    let loaded: Vec<_> = stage
        .driver()
        .requests
        .iter()
        .map(|request| request.model.as_str().to_string())
        .collect();
    assert_eq!(loaded, vec!["jacket".to_string()]);
    assert_eq!(stage.driver().shown, Some(ModelId::new("jacket")));
    assert!(stage.pipeline().is_quiescent());
}

#[test]
fn stale_completion_is_ignored_after_retarget() {
    let t0 = Instant::now();
    let mut stage = stage(
        "pixel",
        FakeDriver {
            hold: true,
            ..FakeDriver::default()
        },
        t0,
    );

    stage.select_model(ModelId::new("tee"), t0);
    stage.tick(t0 + PHASE, FrameInputs::default());
    assert_eq!(stage.driver().requests.len(), 1);

    stage.select_model(ModelId::new("jacket"), t0 + PHASE + FRAME);
    assert_eq!(stage.driver().requests.len(), 2);

    // Both loads finish; only the second may drive the transition.
    stage.driver_mut().release_all();
    stage.tick(t0 + PHASE + FRAME * 2, FrameInputs::default());
    assert_eq!(stage.driver().shown, Some(ModelId::new("jacket")));
    assert_eq!(stage.controller().displayed(), Some(&ModelId::new("jacket")));

    run(&mut stage, t0 + PHASE + FRAME * 2, t0 + PHASE * 3);
    assert_eq!(stage.phase(), Phase::Idle);
    assert!(stage.pipeline().is_quiescent());
}

#[test]
fn resize_mid_transition_only_touches_resolution() {
    let t0 = Instant::now();
    let mut stage = stage(
        "diffuse",
        FakeDriver {
            hold: true,
            ..FakeDriver::default()
        },
        t0,
    );

    stage.select_model(ModelId::new("tee"), t0);
    let mid = t0 + PHASE / 2;
    stage.tick(mid, FrameInputs::default());
    let amount = param(&stage, PassKind::Diffuse, "amount");
    let noise = param(&stage, PassKind::Noise, "noiseStrength");
    assert!(amount > 0.0);

    let size = stage.resize(800, 600, 1.0);
    assert_eq!((size.device_width(), size.device_height()), (800, 600));
    assert_eq!(param(&stage, PassKind::Diffuse, "amount"), amount);
    assert_eq!(param(&stage, PassKind::Noise, "noiseStrength"), noise);
    for pass in [PassKind::Diffuse, PassKind::Grain] {
        let resolution = stage
            .pipeline()
            .pass(pass)
            .unwrap()
            .params()
            .vec2("uResolution");
        assert_eq!(resolution, [800.0, 600.0]);
    }
    assert_eq!(stage.phase(), Phase::TransitioningOut);
}

#[test]
fn failed_load_returns_to_quiescent_idle() {
    let t0 = Instant::now();
    let mut driver = FakeDriver::default();
    driver.failing.insert("missing".to_string());
    let mut stage = stage("blinds", driver, t0);

    stage.select_model(ModelId::new("missing"), t0);
    run(&mut stage, t0, t0 + PHASE * 3);
    assert_eq!(stage.phase(), Phase::Idle);
    assert!(stage.pipeline().is_quiescent());
    assert_eq!(stage.driver().shown, Some(ModelId::new("hoodie")));
    assert_eq!(stage.controller().displayed(), Some(&ModelId::new("hoodie")));
}

#[test]
fn failed_initial_model_can_be_selected_again() {
    let t0 = Instant::now();
    let mut stage = stage("pixel", FakeDriver::default(), t0);
    // The initial load never made it on screen.
    stage.driver_mut().shown = None;

    stage.select_model(ModelId::new("hoodie"), t0);
    assert_eq!(stage.phase(), Phase::TransitioningOut);
    run(&mut stage, t0, t0 + PHASE * 3);
    assert_eq!(stage.driver().requests.len(), 1);
    assert_eq!(stage.driver().shown, Some(ModelId::new("hoodie")));
    assert_eq!(stage.phase(), Phase::Idle);
    assert!(stage.pipeline().is_quiescent());
}

#[test]
fn displayed_model_selection_is_ignored() {
    let t0 = Instant::now();
    let mut stage = stage("pixel", FakeDriver::default(), t0);
    stage.select_model(ModelId::new("hoodie"), t0);
    run(&mut stage, t0, t0 + PHASE * 3);
    assert!(stage.driver().requests.is_empty());
    assert_eq!(stage.phase(), Phase::Idle);
}

#[test]
fn retry_after_failed_load_reaches_the_driver() {
    let t0 = Instant::now();
    let mut driver = FakeDriver::default();
    driver.failing.insert("tee".to_string());
    let mut stage = stage("pixel", driver, t0);

    stage.select_model(ModelId::new("tee"), t0);
    let now = run(&mut stage, t0, t0 + PHASE + FRAME);
    assert_eq!(stage.phase(), Phase::TransitioningIn);
    assert_eq!(stage.driver().requests.len(), 1);

    stage.driver_mut().failing.clear();
    stage.select_model(ModelId::new("tee"), now);
    assert_eq!(stage.phase(), Phase::TransitioningOut);
    run(&mut stage, now, now + PHASE * 4);
    assert_eq!(stage.driver().requests.len(), 2);
    assert_eq!(stage.driver().shown, Some(ModelId::new("tee")));
    assert_eq!(stage.controller().displayed(), Some(&ModelId::new("tee")));
    assert_eq!(stage.phase(), Phase::Idle);
    assert!(stage.pipeline().is_quiescent());
}

#[test]
fn quiescence_holds_after_many_transitions() {
    let t0 = Instant::now();
    let mut stage = stage("glitch", FakeDriver::default(), t0);
    let models = ["tee", "jacket", "hoodie", "tee", "cap"];
    let mut now = t0;
    for (index, model) in models.iter().enumerate() {
        stage.select_model(ModelId::new(*model), now);
        // Interrupt every other transition part-way through.
        let span = if index % 2 == 0 { PHASE / 3 } else { PHASE * 3 };
        now = run(&mut stage, now, now + span);
    }
    now = run(&mut stage, now, now + PHASE * 4);
    assert_eq!(stage.phase(), Phase::Idle, "at {now:?}");
    assert!(stage.pipeline().is_quiescent());
    assert_eq!(stage.controller().displayed(), Some(&ModelId::new("cap")));
}

#[test]
fn texture_selection_is_immediate() {
    let t0 = Instant::now();
    let mut stage = stage("still", FakeDriver::default(), t0);
    stage.select_texture(TextureId::new("chrome"));
    assert_eq!(stage.driver().texture, Some(TextureId::new("chrome")));
    assert_eq!(stage.phase(), Phase::Idle);
}

#[test]
fn steady_parameters_follow_inputs() {
    let t0 = Instant::now();
    let mut stage = stage("blinds", FakeDriver::default(), t0);
    stage.tick(
        t0 + Duration::from_secs(2),
        FrameInputs {
            pointer: Some([0.25, 0.5]),
            rotation_velocity: [0.01, 0.02],
        },
    );
    let blinds = stage.pipeline().pass(PassKind::Blinds).unwrap().params();
    assert_eq!(blinds.vec2("uMousePos"), [0.25, 0.5]);
    assert!((blinds.float("uTime") - 2.0).abs() < 1e-6);
    let chromatic = stage.pipeline().pass(PassKind::Chromatic).unwrap().params();
    assert_eq!(chromatic.vec2("rotationVelocity"), [0.01, 0.02]);
    assert!(stage.pipeline().is_quiescent());
}
