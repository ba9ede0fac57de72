use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fxconfig::ViewerConfig;
use renderer::ViewerOptions;
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::{locate_config, ConfigLocation};

pub struct LoadedConfig {
    pub config: ViewerConfig,
    pub location: ConfigLocation,
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let location = locate_config(explicit);
    let config = match location.path() {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    tracing::debug!(location = ?location, preset = %config.preset, "configuration resolved");
    Ok(LoadedConfig { config, location })
}

pub fn run(args: RunArgs) -> Result<()> {
    let LoadedConfig { config, location } = load_config(args.config.as_deref())?;
    let options = build_options(&args, config, &location)?;
    let (width, height) = options.window_size();
    tracing::info!(
        preset = args.preset.as_deref().unwrap_or(options.config.preset.as_str()),
        model = ?options.initial_model(),
        texture = ?options.initial_texture(),
        width,
        height,
        offline = options.offline,
        "starting drapeview"
    );
    renderer::run(options)
}

fn build_options(
    args: &RunArgs,
    config: ViewerConfig,
    location: &ConfigLocation,
) -> Result<ViewerOptions> {
    let preset_name = args.preset.as_deref().unwrap_or(config.preset.as_str());
    let preset = config.resolve_preset(preset_name)?;

    if let Some(model) = &args.model {
        if config.catalog.model(model).is_none() {
            bail!(
                "unknown model '{model}'; catalog has: {}",
                join_ids(config.catalog.models.iter().map(|entry| entry.id.as_str()))
            );
        }
    }
    if let Some(texture) = &args.texture {
        if config.catalog.texture(texture).is_none() {
            bail!(
                "unknown texture '{texture}'; catalog has: {}",
                join_ids(config.catalog.textures.iter().map(|entry| entry.id.as_str()))
            );
        }
    }

    let asset_root = args.asset_root.clone().or_else(|| config_dir(location));
    let mut options = ViewerOptions::new(config, preset);
    options.initial_model = args.model.clone();
    options.initial_texture = args.texture.clone();
    options.size = args.size;
    options.asset_root = asset_root;
    options.offline = args.offline;
    Ok(options)
}

fn config_dir(location: &ConfigLocation) -> Option<PathBuf> {
    location
        .path()
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

fn join_ids<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    let joined = ids.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "(none)".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn cli_overrides_reach_viewer_options() {
        let args = RunArgs {
            preset: Some("glitch".into()),
            model: Some("hoodie".into()),
            size: Some((640, 480)),
            offline: true,
            ..RunArgs::default()
        };
        let location = ConfigLocation::Discovered(PathBuf::from("/etc/drapeview/drapeview.toml"));
        let options = build_options(&args, ViewerConfig::default(), &location).unwrap();
        assert_eq!(options.preset, fxconfig::presets::builtin("glitch").unwrap());
        assert_eq!(options.window_size(), (640, 480));
        assert_eq!(options.asset_root, Some(PathBuf::from("/etc/drapeview")));
        assert!(options.offline);
    }

    #[test]
    fn unknown_catalog_ids_are_rejected() {
        let args = RunArgs {
            model: Some("parka".into()),
            ..RunArgs::default()
        };
        let err = build_options(&args, ViewerConfig::default(), &ConfigLocation::Defaults)
            .unwrap_err();
        assert!(err.to_string().contains("hoodie"));

        let args = RunArgs {
            texture: Some("velvet".into()),
            ..RunArgs::default()
        };
        assert!(build_options(&args, ViewerConfig::default(), &ConfigLocation::Defaults).is_err());
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let options =
            build_options(&RunArgs::default(), ViewerConfig::default(), &ConfigLocation::Defaults)
                .unwrap();
        assert_eq!(options.preset.out_duration, Duration::from_millis(350));
        assert_eq!(options.asset_root, None);
    }
}
