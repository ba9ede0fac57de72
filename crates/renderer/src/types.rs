use std::path::PathBuf;
use std::time::Duration;

use fxconfig::{Preset, ViewerConfig};

/// Quiet period before a window resize reaches the effect pipeline.
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Timeout for a single HTTP asset download.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the viewer needs to start.
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub config: ViewerConfig,
    /// Transition preset, already resolved against the config.
    pub preset: Preset,
    /// Catalog id overriding `catalog.initial_model`.
    pub initial_model: Option<String>,
    pub initial_texture: Option<String>,
    /// Logical window size overriding `[window]`.
    pub size: Option<(u32, u32)>,
    /// Directory relative asset paths resolve against.
    pub asset_root: Option<PathBuf>,
    /// Skip HTTP sources entirely.
    pub offline: bool,
}

impl ViewerOptions {
    pub fn new(config: ViewerConfig, preset: Preset) -> Self {
        Self {
            config,
            preset,
            initial_model: None,
            initial_texture: None,
            size: None,
            asset_root: None,
            offline: false,
        }
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.size
            .unwrap_or((self.config.window.width, self.config.window.height))
    }

    pub fn initial_model(&self) -> Option<String> {
        self.initial_model.clone().or_else(|| {
            self.config
                .catalog
                .initial_model()
                .map(|entry| entry.id.clone())
        })
    }

    pub fn initial_texture(&self) -> Option<String> {
        self.initial_texture.clone().or_else(|| {
            self.config
                .catalog
                .initial_texture()
                .map(|entry| entry.id.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use fxconfig::presets;

    use super::*;

    #[test]
    fn overrides_win_over_config() {
        let config = ViewerConfig::default();
        let preset = presets::builtin("pixel").unwrap();
        let mut options = ViewerOptions::new(config, preset);
        assert_eq!(options.window_size(), (1280, 800));
        assert_eq!(options.initial_model().as_deref(), Some("hoodie"));

        options.size = Some((640, 480));
        options.initial_model = Some("tee".into());
        assert_eq!(options.window_size(), (640, 480));
        assert_eq!(options.initial_model().as_deref(), Some("tee"));
        assert_eq!(options.initial_texture().as_deref(), Some("holographic"));
    }
}
