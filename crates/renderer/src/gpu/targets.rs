pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Offscreen colour texture that a pass renders into and the next pass samples.
pub(crate) struct RenderTarget {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    pub fn color(
        device: &wgpu::Device,
        label: &str,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        Self::new(
            device,
            label,
            format,
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }

    pub fn depth(device: &wgpu::Device, width: u32, height: u32) -> Self {
        Self::new(
            device,
            "scene depth",
            DEPTH_FORMAT,
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        )
    }

    fn new(
        device: &wgpu::Device,
        label: &str,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Where a pass reads its input from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Source {
    Scene = 0,
    Ping = 1,
    Pong = 2,
}

impl Source {
    pub const COUNT: usize = 3;

    /// The ping-pong target to write when reading from `self`.
    pub fn next(self) -> Source {
        match self {
            Source::Ping => Source::Pong,
            Source::Scene | Source::Pong => Source::Ping,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Scene colour and depth plus the two ping-pong targets between passes, all
/// at the pipeline's device pixel size.
pub(crate) struct FrameTargets {
    pub scene: RenderTarget,
    pub depth: RenderTarget,
    pub ping: RenderTarget,
    pub pong: RenderTarget,
    pub width: u32,
    pub height: u32,
}

impl FrameTargets {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        Self {
            scene: RenderTarget::color(device, "scene color", format, width, height),
            depth: RenderTarget::depth(device, width, height),
            ping: RenderTarget::color(device, "post ping", format, width, height),
            pong: RenderTarget::color(device, "post pong", format, width, height),
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn view(&self, source: Source) -> &wgpu::TextureView {
        match source {
            Source::Scene => &self.scene.view,
            Source::Ping => &self.ping.view,
            Source::Pong => &self.pong.view,
        }
    }

    pub fn views(&self) -> [&wgpu::TextureView; Source::COUNT] {
        [&self.scene.view, &self.ping.view, &self.pong.view]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_pong_never_reads_and_writes_the_same_target() {
        for source in [Source::Scene, Source::Ping, Source::Pong] {
            assert_ne!(source.next(), source);
            assert_ne!(source.next(), Source::Scene);
        }
        assert_eq!(Source::Scene.next().next(), Source::Pong);
    }
}
