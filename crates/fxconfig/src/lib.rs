//! Viewer configuration: transition presets, the asset catalog and window
//! options, loaded from `drapeview.toml`.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use postfx::PassOptions;
use serde::{Deserialize, Serialize};

mod duration;
pub mod presets;

pub use presets::{EffectPeak, Preset, BUILTIN_PRESETS, DEFAULT_PRESET};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("unknown preset '{name}'; available: {available}")]
    UnknownPreset { name: String, available: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

const HOODIE_URL: &str = "https://uploads-ssl.webflow.com/6665a67f8e924fdecb7b36e5/6675c8cc5cc9e9c9c8156f5d_holographic_hodie.gltf.txt";
const HOLOGRAPHIC_URL: &str = "https://uploads-ssl.webflow.com/6665a67f8e924fdecb7b36e5/6675a742ad653905eaedaea8_holographic-texture.webp";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ViewerConfig {
    pub version: u32,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default)]
    pub presets: BTreeMap<String, Preset>,
    #[serde(default)]
    pub steady: SteadyConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub catalog: Catalog,
}

/// Parameters of the always-on passes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SteadyConfig {
    /// Grain overlay strength.
    pub grain: f32,
    pub blinds_bands: u32,
    pub diffuse_samples: u32,
    /// Scatter scale of the diffuse pass along each axis.
    pub diffuse_spread: [f32; 2],
}

impl Default for SteadyConfig {
    fn default() -> Self {
        let options = PassOptions::default();
        Self {
            grain: 0.08,
            blinds_bands: options.blinds_bands,
            diffuse_samples: options.diffuse_samples,
            diffuse_spread: [1.0, 1.0],
        }
    }
}

impl SteadyConfig {
    pub fn pass_options(&self) -> PassOptions {
        PassOptions {
            blinds_bands: self.blinds_bands,
            diffuse_samples: self.diffuse_samples,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub max_pixel_ratio: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "drapeview".to_string(),
            width: 1280,
            height: 800,
            max_pixel_ratio: postfx::MAX_PIXEL_RATIO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub url: String,
}

impl CatalogEntry {
    pub fn new(id: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
        }
    }
}

/// Selectable garment meshes and matcap textures.
///
/// Omitting `[catalog]` entirely selects the built-in hoodie; a partial
/// table starts from an empty catalog.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Catalog {
    #[serde(default)]
    pub initial_model: Option<String>,
    #[serde(default)]
    pub initial_texture: Option<String>,
    #[serde(default)]
    pub models: Vec<CatalogEntry>,
    #[serde(default)]
    pub textures: Vec<CatalogEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            initial_model: Some("hoodie".to_string()),
            initial_texture: Some("holographic".to_string()),
            models: vec![CatalogEntry::new("hoodie", HOODIE_URL)],
            textures: vec![CatalogEntry::new("holographic", HOLOGRAPHIC_URL)],
        }
    }
}

impl Catalog {
    pub fn model(&self, id: &str) -> Option<&CatalogEntry> {
        self.models.iter().find(|entry| entry.id == id)
    }

    pub fn texture(&self, id: &str) -> Option<&CatalogEntry> {
        self.textures.iter().find(|entry| entry.id == id)
    }

    /// Initial model id, falling back to the first entry.
    pub fn initial_model(&self) -> Option<&CatalogEntry> {
        match &self.initial_model {
            Some(id) => self.model(id),
            None => self.models.first(),
        }
    }

    pub fn initial_texture(&self) -> Option<&CatalogEntry> {
        match &self.initial_texture {
            Some(id) => self.texture(id),
            None => self.textures.first(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (kind, entries) in [("model", &self.models), ("texture", &self.textures)] {
            let mut seen = HashSet::new();
            for entry in entries {
                if entry.id.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "catalog {kind} ids may not be empty"
                    )));
                }
                if entry.url.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "catalog {kind} '{}' has an empty url",
                        entry.id
                    )));
                }
                if !seen.insert(entry.id.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "catalog {kind} id '{}' is listed twice",
                        entry.id
                    )));
                }
            }
        }
        if let Some(id) = &self.initial_model {
            if self.model(id).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "catalog.initial_model references unknown model '{id}'"
                )));
            }
        }
        if let Some(id) = &self.initial_texture {
            if self.texture(id).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "catalog.initial_texture references unknown texture '{id}'"
                )));
            }
        }
        Ok(())
    }
}

fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            preset: default_preset(),
            presets: BTreeMap::new(),
            steady: SteadyConfig::default(),
            window: WindowConfig::default(),
            catalog: Catalog::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: ViewerConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Every preset name this configuration can resolve, built-ins first.
    pub fn preset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_PRESETS.iter().map(|name| name.to_string()).collect();
        for name in self.presets.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Resolves a preset by name. Presets defined in the file shadow
    /// built-ins of the same name.
    pub fn resolve_preset(&self, name: &str) -> Result<Preset, ConfigError> {
        if let Some(preset) = self.presets.get(name) {
            return Ok(preset.clone());
        }
        presets::builtin(name).ok_or_else(|| ConfigError::UnknownPreset {
            name: name.to_string(),
            available: self.preset_names().join(", "),
        })
    }

    pub fn active_preset(&self) -> Result<Preset, ConfigError> {
        self.resolve_preset(&self.preset)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        for (name, preset) in &self.presets {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("preset names may not be empty".into()));
            }
            preset.validate(name)?;
        }
        self.active_preset()?;

        let steady = &self.steady;
        if !steady.grain.is_finite() || !(0.0..=1.0).contains(&steady.grain) {
            return Err(ConfigError::Invalid(format!(
                "steady.grain must be within 0..=1, got {}",
                steady.grain
            )));
        }
        if steady.pass_options().sanitized() != steady.pass_options() {
            return Err(ConfigError::Invalid(format!(
                "steady.blinds_bands must be 1..=64 and steady.diffuse_samples 1..=24, got {} and {}",
                steady.blinds_bands, steady.diffuse_samples
            )));
        }
        if steady
            .diffuse_spread
            .iter()
            .any(|value| !value.is_finite() || !(0.0..=4.0).contains(value))
        {
            return Err(ConfigError::Invalid(
                "steady.diffuse_spread components must be within 0..=4".into(),
            ));
        }

        let window = &self.window;
        if window.width == 0 || window.height == 0 {
            return Err(ConfigError::Invalid(
                "window width and height must be greater than zero".into(),
            ));
        }
        if !window.max_pixel_ratio.is_finite() || window.max_pixel_ratio <= 0.0 {
            return Err(ConfigError::Invalid(
                "window.max_pixel_ratio must be a positive number".into(),
            ));
        }

        self.catalog.validate()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use postfx::{EasingCurve, PassKind};

    use super::*;

    const SAMPLE: &str = r#"
version = 1
preset = "custom"

[presets.custom]
passes = ["grain", "chromatic", "pixelation"]
out = "400ms"
in = "300ms"
curve = "smoothstep"
effects = [{ pass = "pixelation", param = "pixelSize", peak = 0.01 }]

[steady]
grain = 0.05
blinds_bands = 8

[window]
width = 900
height = 700

[catalog]
initial_model = "tee"
models = [
    { id = "hoodie", url = "https://example.com/hoodie.gltf" },
    { id = "tee", url = "models/tee.glb" },
]
textures = [{ id = "chrome", url = "textures/chrome.png" }]
"#;

    #[test]
    fn parses_sample_config() {
        let config = ViewerConfig::from_toml_str(SAMPLE).expect("parse config");
        let preset = config.active_preset().unwrap();
        assert_eq!(preset.out_duration, Duration::from_millis(400));
        assert_eq!(preset.in_duration, Duration::from_millis(300));
        assert_eq!(preset.curve, EasingCurve::Smoothstep);
        assert_eq!(
            preset.layout().kinds(),
            &[PassKind::Chromatic, PassKind::Pixelation, PassKind::Grain]
        );
        assert_eq!(config.steady.grain, 0.05);
        assert_eq!(config.steady.pass_options().blinds_bands, 8);
        assert_eq!(config.window.max_pixel_ratio, 2.0);
        assert_eq!(config.catalog.initial_model().unwrap().url, "models/tee.glb");
        assert_eq!(config.catalog.initial_texture().unwrap().id, "chrome");
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = ViewerConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config.preset, DEFAULT_PRESET);
        assert_eq!(config.catalog, Catalog::default());
        let preset = config.active_preset().unwrap();
        assert_eq!(preset.out_duration, Duration::from_millis(350));
    }

    #[test]
    fn rejects_unknown_preset() {
        let err = ViewerConfig::from_toml_str("version = 1\npreset = \"bloom\"").unwrap_err();
        match err {
            ConfigError::UnknownPreset { name, available } => {
                assert_eq!(name, "bloom");
                assert!(available.contains("glitch"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_wrong_version() {
        let err = ViewerConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_duplicate_catalog_ids() {
        let config = r#"
version = 1
[catalog]
initial_model = "a"
initial_texture = "t"
models = [{ id = "a", url = "a.glb" }, { id = "a", url = "b.glb" }]
textures = [{ id = "t", url = "t.png" }]
"#;
        let err = ViewerConfig::from_toml_str(config).unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn rejects_dangling_initial_model() {
        let config = r#"
version = 1
[catalog]
initial_model = "missing"
initial_texture = "t"
models = [{ id = "a", url = "a.glb" }]
textures = [{ id = "t", url = "t.png" }]
"#;
        assert!(ViewerConfig::from_toml_str(config).is_err());
    }

    #[test]
    fn custom_preset_shadows_builtin() {
        let config = r#"
version = 1
preset = "pixel"
[presets.pixel]
passes = ["chromatic", "pixelation"]
effects = [{ pass = "pixelation", param = "pixelSize", peak = 0.02 }]
"#;
        let config = ViewerConfig::from_toml_str(config).unwrap();
        let preset = config.active_preset().unwrap();
        assert_eq!(preset.effects[0].peak, 0.02);
        assert_eq!(config.preset_names().iter().filter(|n| *n == "pixel").count(), 1);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = ViewerConfig::from_toml_str("version = 1\nshaders = []").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drapeview.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.preset, "custom");

        let missing = ViewerConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
