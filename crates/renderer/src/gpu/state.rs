use std::sync::Arc;

use anyhow::Result;
use assets::{MeshData, TextureData};
use postfx::EffectPipeline;
use tracing::debug;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::context::GpuContext;
use super::pipeline::{PassLayouts, PassPipeline};
use super::scene::MeshRenderer;
use super::targets::{FrameTargets, Source};
use super::uniforms::{PassUniforms, SceneUniforms};

/// Every GPU resource of the viewer: surface, matcap scene renderer, one
/// compiled program per pass in the layout, and the intermediate targets.
pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PassLayouts,
    scene: MeshRenderer,
    passes: Vec<PassPipeline>,
    blit: PassPipeline,
    targets: FrameTargets,
}

impl GpuState {
    pub(crate) fn new(window: Arc<Window>, pipeline: &EffectPipeline) -> Result<Self> {
        let context = GpuContext::new(window)?;
        let device = &context.device;
        let format = context.surface_format;
        let layouts = PassLayouts::new(device)?;
        let scene = MeshRenderer::new(device, &context.queue, format)?;

        let mut passes = pipeline
            .passes()
            .iter()
            .map(|pass| PassPipeline::pass(device, &layouts, format, pass.kind(), pipeline.options()))
            .collect::<Result<Vec<_>>>()?;
        let mut blit = PassPipeline::blit(device, &layouts, format)?;

        let size = pipeline.size();
        let targets = FrameTargets::new(device, format, size.device_width(), size.device_height());
        for program in passes.iter_mut().chain(std::iter::once(&mut blit)) {
            program.rebind(device, &layouts, targets.views());
        }
        debug!(
            adapter = %context.adapter_name,
            passes = passes.len(),
            width = targets.width,
            height = targets.height,
            "GPU state ready"
        );

        Ok(Self {
            context,
            layouts,
            scene,
            passes,
            blit,
            targets,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Resizes the swapchain. Offscreen targets follow separately through
    /// [`GpuState::resize_targets`].
    pub(crate) fn resize_surface(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    pub(crate) fn resize_targets(&mut self, width: u32, height: u32) {
        if self.targets.width == width.max(1) && self.targets.height == height.max(1) {
            return;
        }
        let device = &self.context.device;
        self.targets = FrameTargets::new(device, self.context.surface_format, width, height);
        for program in self.passes.iter_mut().chain(std::iter::once(&mut self.blit)) {
            program.rebind(device, &self.layouts, self.targets.views());
        }
        debug!(width, height, "resized offscreen targets");
    }

    pub(crate) fn upload_mesh(&mut self, mesh: &MeshData) {
        self.scene.upload_mesh(&self.context.device, mesh);
    }

    pub(crate) fn upload_matcap(&mut self, texture: &TextureData) {
        self.scene
            .upload_matcap(&self.context.device, &self.context.queue, texture);
    }

    /// Draws the scene, then every enabled pass in order. Intermediate passes
    /// ping-pong between offscreen targets; the pass holding
    /// `render_to_screen` writes the swapchain image.
    pub(crate) fn render(
        &mut self,
        pipeline: &EffectPipeline,
        scene_uniforms: &SceneUniforms,
    ) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let screen = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });

        self.scene.write_uniforms(&self.context.queue, scene_uniforms);
        self.scene
            .encode(&mut encoder, &self.targets.scene.view, &self.targets.depth.view);

        let mut input = Source::Scene;
        let mut presented = false;
        for pass in pipeline.enabled_passes() {
            let Some(program) = self
                .passes
                .iter()
                .find(|program| program.kind == Some(pass.kind()))
            else {
                continue;
            };
            program.write_uniforms(&self.context.queue, &PassUniforms::from_params(pass.params()));
            if pass.render_to_screen() {
                program.encode(&mut encoder, input, &screen);
                presented = true;
                break;
            }
            let output = input.next();
            program.encode(&mut encoder, input, self.targets.view(output));
            input = output;
        }
        if !presented {
            self.blit.encode(&mut encoder, input, &screen);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
