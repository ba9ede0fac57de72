use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use assets::{AssetLoader, Executor, FileFetcher, HttpFetcher, SourceFetcher};
use fxconfig::{Preset, ViewerConfig};
use postfx::{EffectPipeline, ParamValue, PassControl, PassKind, RenderSize};
use tracing::{debug, error, info, warn};
use transition::{FrameInputs, ModelId, SceneDriver, Stage, TextureId, TransitionController};
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowBuilder};

use crate::driver::CatalogDriver;
use crate::gpu::{GpuState, SceneUniforms};
use crate::scene::Camera;
use crate::types::{ViewerOptions, FETCH_TIMEOUT, RESIZE_DEBOUNCE};

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Index into `catalog.models`.
    Model(usize),
    /// Index into `catalog.textures`.
    Texture(usize),
    Quit,
}

/// Keys `1`-`9` pick models, `F1`-`F12` pick matcaps, `Escape` quits.
pub fn selection_for_key(code: KeyCode) -> Option<Selection> {
    const DIGITS: [KeyCode; 9] = [
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
        KeyCode::Digit6,
        KeyCode::Digit7,
        KeyCode::Digit8,
        KeyCode::Digit9,
    ];
    const FUNCTION_KEYS: [KeyCode; 12] = [
        KeyCode::F1,
        KeyCode::F2,
        KeyCode::F3,
        KeyCode::F4,
        KeyCode::F5,
        KeyCode::F6,
        KeyCode::F7,
        KeyCode::F8,
        KeyCode::F9,
        KeyCode::F10,
        KeyCode::F11,
        KeyCode::F12,
    ];
    if code == KeyCode::Escape {
        return Some(Selection::Quit);
    }
    if let Some(index) = DIGITS.iter().position(|key| *key == code) {
        return Some(Selection::Model(index));
    }
    FUNCTION_KEYS
        .iter()
        .position(|key| *key == code)
        .map(Selection::Texture)
}

/// Builds the pass chain for `preset` and applies the `[steady]` settings.
pub fn effect_pipeline(
    config: &ViewerConfig,
    preset: &Preset,
    size: RenderSize,
) -> Result<EffectPipeline> {
    let mut pipeline = EffectPipeline::new(&preset.layout(), size, config.steady.pass_options())
        .context("failed to build effect pipeline")?;
    if pipeline.contains(PassKind::Grain) {
        pipeline.set_pass_parameter(
            PassKind::Grain,
            "uAmount",
            ParamValue::Float(config.steady.grain),
        )?;
    }
    if pipeline.contains(PassKind::Diffuse) {
        pipeline.set_pass_parameter(
            PassKind::Diffuse,
            "xy",
            ParamValue::Vec2(config.steady.diffuse_spread),
        )?;
    }
    Ok(pipeline)
}

fn render_size(size: PhysicalSize<u32>, scale_factor: f64, max_pixel_ratio: f32) -> RenderSize {
    let logical: LogicalSize<u32> = size.to_logical(scale_factor);
    RenderSize::new(
        logical.width,
        logical.height,
        (scale_factor as f32).min(max_pixel_ratio),
    )
}

fn asset_loader(options: &ViewerOptions) -> AssetLoader {
    let files = FileFetcher::new(options.asset_root.clone());
    let fetcher = if options.offline {
        SourceFetcher::offline(files)
    } else {
        match HttpFetcher::new(FETCH_TIMEOUT) {
            Ok(http) => SourceFetcher::new(Some(http), files),
            Err(err) => {
                warn!(error = %err, "HTTP fetching unavailable; only local assets will load");
                SourceFetcher::offline(files)
            }
        }
    };
    AssetLoader::new(Arc::new(fetcher), Executor::Threaded)
}

struct Viewer {
    window: Arc<Window>,
    gpu: GpuState,
    stage: Stage<CatalogDriver>,
    cursor: Option<PhysicalPosition<f64>>,
    pending_resize: Option<Instant>,
    max_pixel_ratio: f32,
}

impl Viewer {
    fn new(window: Arc<Window>, options: &ViewerOptions) -> Result<Self> {
        let config = &options.config;
        let max_pixel_ratio = config.window.max_pixel_ratio;
        let size = render_size(window.inner_size(), window.scale_factor(), max_pixel_ratio);
        let pipeline = effect_pipeline(config, &options.preset, size)?;
        let gpu = GpuState::new(window.clone(), &pipeline)?;

        let mut driver = CatalogDriver::new(config.catalog.clone(), asset_loader(options));
        driver.prefetch();
        driver.scene_mut().resize(size.width, size.height);
        if let Some(model) = options.initial_model() {
            driver.preload(ModelId::new(model));
        }
        if let Some(texture) = options.initial_texture() {
            driver.apply_texture(&TextureId::new(texture));
        }

        // Nothing is on screen until the preload resolves; the stage reads
        // the shown model back from the driver on every selection.
        let controller = TransitionController::new(options.preset.clone(), None);
        let stage = Stage::new(controller, pipeline, driver, Instant::now());

        Ok(Self {
            window,
            gpu,
            stage,
            cursor: None,
            pending_resize: None,
            max_pixel_ratio,
        })
    }

    fn handle_key(&mut self, event: &KeyEvent) -> bool {
        if event.state != ElementState::Pressed || event.repeat {
            return true;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return true;
        };
        let catalog = self.stage.driver().catalog();
        match selection_for_key(code) {
            Some(Selection::Quit) => return false,
            Some(Selection::Model(index)) => {
                match catalog.models.get(index).map(|entry| ModelId::new(entry.id.clone())) {
                    Some(model) => {
                        info!(model = %model, "model selected");
                        self.stage.select_model(model, Instant::now());
                    }
                    None => debug!(index, "no catalog model on this key"),
                }
            }
            Some(Selection::Texture(index)) => {
                match catalog.textures.get(index).map(|entry| TextureId::new(entry.id.clone())) {
                    Some(texture) => {
                        info!(texture = %texture, "texture selected");
                        self.stage.select_texture(texture);
                    }
                    None => debug!(index, "no catalog texture on this key"),
                }
            }
            None => {}
        }
        true
    }

    fn handle_cursor(&mut self, position: PhysicalPosition<f64>) {
        self.cursor = Some(position);
        let size = self.window.inner_size();
        self.stage.driver_mut().scene_mut().set_pointer_from_window(
            position.x as f32,
            position.y as f32,
            size.width,
            size.height,
        );
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize_surface(size);
        self.pending_resize = Some(Instant::now());
    }

    fn apply_pending_resize(&mut self, now: Instant) {
        let Some(requested) = self.pending_resize else {
            return;
        };
        if now.saturating_duration_since(requested) < RESIZE_DEBOUNCE {
            return;
        }
        self.pending_resize = None;
        let target = render_size(
            self.window.inner_size(),
            self.window.scale_factor(),
            self.max_pixel_ratio,
        );
        let size = self.stage.resize(target.width, target.height, target.pixel_ratio);
        self.stage
            .driver_mut()
            .scene_mut()
            .resize(size.width, size.height);
        self.gpu.resize_targets(size.device_width(), size.device_height());
        debug!(
            width = size.width,
            height = size.height,
            pixel_ratio = size.pixel_ratio,
            "applied resize"
        );
    }

    /// Pointer in UV space for the pointer-following passes.
    fn pointer_uv(&self) -> Option<[f32; 2]> {
        let cursor = self.cursor?;
        let size = self.gpu.size();
        Some([
            (cursor.x as f32 / size.width.max(1) as f32).clamp(0.0, 1.0),
            (cursor.y as f32 / size.height.max(1) as f32).clamp(0.0, 1.0),
        ])
    }

    fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let now = Instant::now();
        let scene = self.stage.driver_mut().scene_mut();
        scene.update();
        let inputs = FrameInputs {
            pointer: self.pointer_uv(),
            rotation_velocity: self.stage.driver().scene().rotation_velocity(),
        };
        self.stage.tick(now, inputs);

        let updates = self.stage.driver_mut().take_updates();
        if let Some(mesh) = updates.mesh {
            self.gpu.upload_mesh(&mesh);
        }
        if let Some(texture) = updates.texture {
            self.gpu.upload_matcap(&texture);
        }

        let driver = self.stage.driver();
        let camera = Camera::new(self.stage.pipeline().size().aspect());
        let uniforms = SceneUniforms::new(
            camera.view_projection(),
            camera.view,
            driver.scene().model_matrix(driver.mesh_center()),
        );
        self.gpu.render(self.stage.pipeline(), &uniforms)
    }
}

/// Opens the viewer window and runs until it is closed.
pub fn run(options: ViewerOptions) -> Result<()> {
    let event_loop = EventLoopBuilder::new()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let (width, height) = options.window_size();
    let window = WindowBuilder::new()
        .with_title(options.config.window.title.clone())
        .with_inner_size(LogicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create viewer window: {err}"))?;
    let window = Arc::new(window);

    let mut viewer = Viewer::new(window, &options).context("failed to initialise viewer")?;
    info!(
        passes = viewer.stage.pipeline().passes().len(),
        curve = %options.preset.curve,
        "viewer started"
    );
    viewer.window.request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == viewer.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                    WindowEvent::KeyboardInput { event, .. } => {
                        if !viewer.handle_key(&event) {
                            elwt.exit();
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => viewer.handle_cursor(position),
                    WindowEvent::Resized(size) => viewer.handle_resize(size),
                    WindowEvent::ScaleFactorChanged { .. } => {
                        viewer.pending_resize = Some(Instant::now());
                    }
                    WindowEvent::RedrawRequested => match viewer.render_frame() {
                        Ok(()) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            viewer.gpu.reconfigure();
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            error!("surface out of memory; closing viewer");
                            elwt.exit();
                        }
                        Err(err) => warn!(error = ?err, "surface error; retrying next frame"),
                    },
                    _ => {}
                }
            }
            Event::AboutToWait => {
                viewer.apply_pending_resize(Instant::now());
                viewer.window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

#[cfg(test)]
mod tests {
    use fxconfig::presets;

    use super::*;

    #[test]
    fn keys_map_to_catalog_slots() {
        assert_eq!(selection_for_key(KeyCode::Digit1), Some(Selection::Model(0)));
        assert_eq!(selection_for_key(KeyCode::Digit9), Some(Selection::Model(8)));
        assert_eq!(selection_for_key(KeyCode::F1), Some(Selection::Texture(0)));
        assert_eq!(selection_for_key(KeyCode::F12), Some(Selection::Texture(11)));
        assert_eq!(selection_for_key(KeyCode::Escape), Some(Selection::Quit));
        assert_eq!(selection_for_key(KeyCode::Digit0), None);
        assert_eq!(selection_for_key(KeyCode::KeyA), None);
    }

    #[test]
    fn steady_settings_reach_the_pipeline() {
        let mut config = ViewerConfig::default();
        config.steady.grain = 0.2;
        config.steady.diffuse_spread = [0.5, 2.0];
        let preset = presets::builtin("diffuse").unwrap();
        let pipeline = effect_pipeline(&config, &preset, RenderSize::new(800, 600, 1.0)).unwrap();

        let grain = pipeline.pass(PassKind::Grain).unwrap().params();
        assert!((grain.float("uAmount") - 0.2).abs() < 1e-6);
        let diffuse = pipeline.pass(PassKind::Diffuse).unwrap().params();
        assert_eq!(diffuse.vec2("xy"), [0.5, 2.0]);
        assert!(pipeline.is_quiescent());
    }

    #[test]
    fn pixel_ratio_is_capped() {
        let size = render_size(PhysicalSize::new(3000, 1500), 3.0, 2.0);
        assert_eq!((size.width, size.height), (1000, 500));
        assert_eq!(size.pixel_ratio, 2.0);
        assert_eq!(size.device_width(), 2000);
    }
}
