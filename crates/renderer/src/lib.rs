//! Windowed viewer for the garment configurator.
//!
//! The crate glues the asset loader, the transition controller and the
//! post-processing chain to a `winit` window rendered with `wgpu`:
//!
//! ```text
//!   drapeview CLI
//!          │ ViewerOptions
//!          ▼
//!   run() ──▶ Viewer ──▶ winit event loop ──▶ Stage::tick()
//!                │                                 │
//!                │                                 ├─▶ CatalogDriver (loads, scene state)
//!                │                                 └─▶ EffectPipeline (pass params)
//!                └─▶ GpuState::render() ─▶ scene target ─▶ passes ─▶ surface
//! ```
//!
//! Everything above `gpu` is GPU-free: `CatalogDriver`, `SceneState` and the
//! camera math are unit tested without an adapter.

mod compile;
mod driver;
mod gpu;
pub mod scene;
mod types;
mod window;

pub use driver::{CatalogDriver, SceneUpdates};
pub use scene::{model_scale, Camera, SceneState};
pub use types::{ViewerOptions, FETCH_TIMEOUT, RESIZE_DEBOUNCE};
pub use window::{effect_pipeline, run, selection_for_key, Selection};
