//! GPU execution of the viewer.
//!
//! - `context` owns the wgpu instance, device and surface and reconfigures
//!   the swapchain when the window resizes.
//! - `scene` draws the garment with a matcap into an offscreen target.
//! - `pipeline` compiles each post pass from its GLSL source into a
//!   full-screen render pipeline sharing one bind group layout.
//! - `targets` holds the scene and ping-pong textures passes read and write.
//! - `uniforms` mirrors the std140 parameter blocks.
//! - `state` glues everything together behind `GpuState`.

mod context;
mod pipeline;
mod scene;
mod state;
mod targets;
mod uniforms;

#[cfg(test)]
pub(crate) use scene::{SCENE_FRAGMENT, SCENE_VERTEX};
pub(crate) use state::GpuState;
pub(crate) use uniforms::SceneUniforms;
