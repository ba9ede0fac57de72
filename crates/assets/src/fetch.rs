use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::error::AssetError;

/// Retrieves raw asset bytes for a source string.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, source: &str) -> Result<Vec<u8>, AssetError>;
}

/// Where an asset source string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Http(String),
    File(PathBuf),
}

impl AssetSource {
    pub fn parse(source: &str) -> Result<Self, AssetError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(AssetError::UnsupportedSource(source.to_string()));
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(AssetSource::Http(trimmed.to_string()));
        }
        if let Some(path) = trimmed.strip_prefix("file://") {
            return Ok(AssetSource::File(PathBuf::from(path)));
        }
        if trimmed.contains("://") {
            return Err(AssetError::UnsupportedSource(source.to_string()));
        }
        Ok(AssetSource::File(PathBuf::from(trimmed)))
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, AssetError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("drapeview/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AssetError::fetch("http client", err))?;
        Ok(Self { http })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, source: &str) -> Result<Vec<u8>, AssetError> {
        debug!(url = %source, "downloading asset");
        let response = self
            .http
            .get(source)
            .send()
            .map_err(|err| AssetError::fetch(source, err))?
            .error_for_status()
            .map_err(|err| AssetError::fetch(source, err))?;
        let bytes = response
            .bytes()
            .map_err(|err| AssetError::fetch(source, err))?;
        Ok(bytes.to_vec())
    }
}

/// Reads plain paths and `file://` URLs. Relative paths resolve against `root`.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, source: &str) -> Result<Vec<u8>, AssetError> {
        let AssetSource::File(path) = AssetSource::parse(source)? else {
            return Err(AssetError::UnsupportedSource(source.to_string()));
        };
        let path = self.resolve(&path);
        debug!(path = %path.display(), "reading asset");
        fs::read(&path).map_err(|err| AssetError::fetch(source, err))
    }
}

/// Dispatches on the source scheme.
pub struct SourceFetcher {
    http: Option<HttpFetcher>,
    files: FileFetcher,
}

impl SourceFetcher {
    pub fn new(http: Option<HttpFetcher>, files: FileFetcher) -> Self {
        Self { http, files }
    }

    /// Local files only; HTTP sources are rejected.
    pub fn offline(files: FileFetcher) -> Self {
        Self { http: None, files }
    }
}

impl Fetcher for SourceFetcher {
    fn fetch(&self, source: &str) -> Result<Vec<u8>, AssetError> {
        match AssetSource::parse(source)? {
            AssetSource::Http(_) => match &self.http {
                Some(http) => http.fetch(source),
                None => Err(AssetError::UnsupportedSource(source.to_string())),
            },
            AssetSource::File(_) => self.files.fetch(source),
        }
    }
}
