use std::borrow::Cow;

use anyhow::{bail, Result};
use postfx::{PassKind, PassOptions};
use wgpu::naga::ShaderStage;

/// Compiles a GLSL 450 module, turning validation failures into errors
/// instead of device-lost panics.
pub(crate) fn compile_glsl(
    device: &wgpu::Device,
    label: &str,
    source: Cow<'_, str>,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: source,
            stage,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        bail!("failed to compile {label}: {err}");
    }
    Ok(module)
}

/// Full-screen triangle shared by every pass and the blit.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    compile_glsl(
        device,
        "fullscreen triangle vertex",
        Cow::Borrowed(postfx::shaders::VERTEX_SHADER),
        ShaderStage::Vertex,
    )
}

pub(crate) fn compile_pass_shader(
    device: &wgpu::Device,
    kind: PassKind,
    options: &PassOptions,
) -> Result<wgpu::ShaderModule> {
    let source = postfx::shaders::fragment_source(kind, options);
    tracing::trace!(pass = %kind, lines = source.lines().count(), "compiling pass shader");
    compile_glsl(
        device,
        &format!("{kind} fragment"),
        Cow::Owned(source),
        ShaderStage::Fragment,
    )
}

pub(crate) fn compile_blit_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    compile_glsl(
        device,
        "blit fragment",
        Cow::Borrowed(postfx::shaders::BLIT_FRAGMENT),
        ShaderStage::Fragment,
    )
}
