use std::sync::Arc;

use tracing::info;

use crate::cache::{AssetCache, Executor, SharedLoad};
use crate::error::AssetError;
use crate::fetch::Fetcher;
use crate::mesh::{decode_gltf, MeshData};
use crate::texture::TextureData;

/// Fetches and decodes models and textures, each URL at most once.
#[derive(Clone)]
pub struct AssetLoader {
    fetcher: Arc<dyn Fetcher>,
    models: AssetCache<MeshData>,
    textures: AssetCache<TextureData>,
}

impl AssetLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, executor: Executor) -> Self {
        Self {
            fetcher,
            models: AssetCache::new(executor),
            textures: AssetCache::new(executor),
        }
    }

    pub fn request_model(&self, url: &str) -> SharedLoad<MeshData> {
        let fetcher = Arc::clone(&self.fetcher);
        let source = url.to_string();
        self.models.request(url, move || {
            let bytes = fetcher.fetch(&source)?;
            let mesh = decode_gltf(&bytes).map_err(|reason| AssetError::decode(&source, reason))?;
            info!(
                url = %source,
                vertices = mesh.vertex_count(),
                triangles = mesh.triangle_count(),
                "model decoded"
            );
            Ok(mesh)
        })
    }

    pub fn request_texture(&self, url: &str) -> SharedLoad<TextureData> {
        let fetcher = Arc::clone(&self.fetcher);
        let source = url.to_string();
        self.textures.request(url, move || {
            let bytes = fetcher.fetch(&source)?;
            let texture =
                TextureData::decode(&bytes).map_err(|reason| AssetError::decode(&source, reason))?;
            info!(url = %source, width = texture.width, height = texture.height, "texture decoded");
            Ok(texture)
        })
    }

    /// Starts loads for every URL without waiting on them.
    pub fn prefetch<'a>(
        &self,
        models: impl IntoIterator<Item = &'a str>,
        textures: impl IntoIterator<Item = &'a str>,
    ) {
        for url in models {
            self.request_model(url);
        }
        for url in textures {
            self.request_texture(url);
        }
    }

    pub fn cached_models(&self) -> usize {
        self.models.len()
    }

    pub fn cached_textures(&self) -> usize {
        self.textures.len()
    }
}
