use std::sync::Arc;

use assets::{AssetLoader, MeshData, SharedLoad, TextureData};
use crossbeam_channel::Sender;
use fxconfig::Catalog;
use tracing::{debug, info, warn};
use transition::{LoadCompletion, LoadFailure, LoadRequest, ModelId, SceneDriver, TextureId};

use crate::scene::SceneState;

/// GPU uploads produced since the previous frame.
#[derive(Default)]
pub struct SceneUpdates {
    pub mesh: Option<Arc<MeshData>>,
    pub texture: Option<Arc<TextureData>>,
}

/// Scene driver backed by the asset catalog.
///
/// Holds no GPU resources: shown meshes and resolved textures are queued and
/// collected once per frame with [`CatalogDriver::take_updates`].
pub struct CatalogDriver {
    catalog: Catalog,
    loader: AssetLoader,
    scene: SceneState,
    mesh: Option<Arc<MeshData>>,
    mesh_center: [f32; 3],
    pending_mesh: Option<Arc<MeshData>>,
    initial: Option<(ModelId, SharedLoad<MeshData>)>,
    pending_texture: Option<(TextureId, SharedLoad<TextureData>)>,
    texture: Option<Arc<TextureData>>,
    texture_dirty: bool,
}

impl CatalogDriver {
    pub fn new(catalog: Catalog, loader: AssetLoader) -> Self {
        Self {
            catalog,
            loader,
            scene: SceneState::default(),
            mesh: None,
            mesh_center: [0.0; 3],
            pending_mesh: None,
            initial: None,
            pending_texture: None,
            texture: None,
            texture_dirty: false,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneState {
        &mut self.scene
    }

    pub fn mesh(&self) -> Option<&Arc<MeshData>> {
        self.mesh.as_ref()
    }

    /// Centre of the shown mesh's bounds.
    pub fn mesh_center(&self) -> [f32; 3] {
        self.mesh_center
    }

    /// Requests every catalog model and texture in the background.
    pub fn prefetch(&self) {
        self.loader.prefetch(
            self.catalog.models.iter().map(|entry| entry.url.as_str()),
            self.catalog.textures.iter().map(|entry| entry.url.as_str()),
        );
    }

    /// Starts loading the first model. It is shown without a transition as
    /// soon as it resolves.
    pub fn preload(&mut self, model: ModelId) {
        let Some(entry) = self.catalog.model(model.as_str()) else {
            warn!(model = %model, "initial model is not in the catalog");
            return;
        };
        let handle = self.loader.request_model(&entry.url);
        self.initial = Some((model, handle));
    }

    /// Collects resolved assets that need uploading. Call once per frame.
    pub fn take_updates(&mut self) -> SceneUpdates {
        self.poll_initial();
        self.poll_texture();
        let texture = if std::mem::take(&mut self.texture_dirty) {
            self.texture.clone()
        } else {
            None
        };
        SceneUpdates {
            mesh: self.pending_mesh.take(),
            texture,
        }
    }

    fn poll_initial(&mut self) {
        let Some((model, handle)) = self.initial.take() else {
            return;
        };
        match handle.try_get() {
            None => self.initial = Some((model, handle)),
            // A transition already replaced the model.
            Some(_) if self.scene.model().is_some() => {}
            Some(Ok(mesh)) => {
                info!(model = %model, "initial model ready");
                self.display(model, mesh);
            }
            Some(Err(err)) => warn!(model = %model, error = %err, "initial model failed to load"),
        }
    }

    fn poll_texture(&mut self) {
        let Some((texture, handle)) = self.pending_texture.take() else {
            return;
        };
        match handle.try_get() {
            None => self.pending_texture = Some((texture, handle)),
            Some(Ok(data)) => {
                debug!(texture = %texture, "matcap ready");
                self.texture = Some(data);
                self.texture_dirty = true;
            }
            Some(Err(err)) => warn!(texture = %texture, error = %err, "matcap failed to load"),
        }
    }

    fn display(&mut self, model: ModelId, mesh: Arc<MeshData>) {
        self.mesh_center = mesh
            .bounds()
            .map(|(min, max)| std::array::from_fn(|axis| (min[axis] + max[axis]) * 0.5))
            .unwrap_or([0.0; 3]);
        self.mesh = Some(Arc::clone(&mesh));
        self.pending_mesh = Some(mesh);
        self.scene.set_model(model);
        // The new mesh gets the current matcap.
        if self.texture.is_some() {
            self.texture_dirty = true;
        }
    }
}

impl SceneDriver for CatalogDriver {
    fn load_model(&mut self, request: LoadRequest, completions: Sender<LoadCompletion>) {
        let Some(entry) = self.catalog.model(request.model.as_str()) else {
            let reason = format!("model '{}' is not in the catalog", request.model);
            let _ = completions.send(LoadCompletion::failed(&request, reason));
            return;
        };
        debug!(ticket = %request.ticket, model = %request.model, url = %entry.url, "loading model");
        self.loader
            .request_model(&entry.url)
            .on_ready(move |result| {
                let completion = match result {
                    Ok(_) => LoadCompletion::succeeded(&request),
                    Err(err) => LoadCompletion::failed(&request, err.to_string()),
                };
                // The stage may already be gone during shutdown.
                let _ = completions.send(completion);
            });
    }

    fn show_model(&mut self, model: &ModelId) -> Result<(), LoadFailure> {
        let entry = self
            .catalog
            .model(model.as_str())
            .ok_or_else(|| LoadFailure(format!("model '{model}' is not in the catalog")))?;
        match self.loader.request_model(&entry.url).try_get() {
            Some(Ok(mesh)) => {
                self.initial = None;
                self.display(model.clone(), mesh);
                Ok(())
            }
            Some(Err(err)) => Err(LoadFailure(err.to_string())),
            None => Err(LoadFailure(format!("model '{model}' has not finished loading"))),
        }
    }

    fn apply_texture(&mut self, texture: &TextureId) {
        let Some(entry) = self.catalog.texture(texture.as_str()) else {
            warn!(texture = %texture, "texture is not in the catalog");
            return;
        };
        let handle = self.loader.request_texture(&entry.url);
        self.scene.set_texture(texture.clone());
        self.pending_texture = Some((texture.clone(), handle));
    }

    fn current_model(&self) -> Option<ModelId> {
        self.scene.model().cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use assets::{Executor, FileFetcher, SourceFetcher};
    use fxconfig::CatalogEntry;
    use image::{ImageFormat, Rgba, RgbaImage};
    use tempfile::TempDir;
    use transition::LoadTicket;

    use super::*;

    const TRIANGLE: &str = r#"{
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
        }]
    }"#;

    fn fixture() -> (TempDir, CatalogDriver) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tee.gltf"), TRIANGLE).unwrap();
        std::fs::write(dir.path().join("broken.gltf"), "{").unwrap();
        let mut png = Cursor::new(Vec::new());
        RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]))
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();
        std::fs::write(dir.path().join("chrome.png"), png.into_inner()).unwrap();

        let catalog = Catalog {
            initial_model: Some("tee".into()),
            initial_texture: Some("chrome".into()),
            models: vec![
                CatalogEntry::new("tee", "tee.gltf"),
                CatalogEntry::new("broken", "broken.gltf"),
            ],
            textures: vec![CatalogEntry::new("chrome", "chrome.png")],
        };
        let fetcher = SourceFetcher::offline(FileFetcher::new(Some(dir.path().to_path_buf())));
        let loader = AssetLoader::new(Arc::new(fetcher), Executor::Inline);
        (dir, CatalogDriver::new(catalog, loader))
    }

    fn request(model: &str) -> LoadRequest {
        LoadRequest {
            ticket: LoadTicket(1),
            model: ModelId::new(model),
        }
    }

    #[test]
    fn load_then_show_queues_a_mesh_upload() {
        let (_dir, mut driver) = fixture();
        let (tx, rx) = crossbeam_channel::unbounded();
        driver.load_model(request("tee"), tx);
        let completion = rx.try_recv().unwrap();
        assert_eq!(completion.result, Ok(()));

        driver.show_model(&ModelId::new("tee")).unwrap();
        assert_eq!(driver.current_model(), Some(ModelId::new("tee")));
        assert_eq!(driver.mesh_center(), [0.5, 0.5, 0.0]);
        let updates = driver.take_updates();
        assert_eq!(updates.mesh.unwrap().vertex_count(), 3);
        assert!(driver.take_updates().mesh.is_none());
    }

    #[test]
    fn unknown_and_broken_models_fail() {
        let (_dir, mut driver) = fixture();
        let (tx, rx) = crossbeam_channel::unbounded();
        driver.load_model(request("cap"), tx.clone());
        assert!(rx.try_recv().unwrap().result.is_err());
        driver.load_model(request("broken"), tx);
        assert!(rx.try_recv().unwrap().result.is_err());
        assert!(driver.show_model(&ModelId::new("broken")).is_err());
        assert_eq!(driver.current_model(), None);
    }

    #[test]
    fn model_swap_reapplies_matcap() {
        let (_dir, mut driver) = fixture();
        driver.apply_texture(&TextureId::new("chrome"));
        let first = driver.take_updates();
        assert_eq!(first.texture.unwrap().pixels[..3], [1, 2, 3]);
        assert!(driver.take_updates().texture.is_none());

        driver.preload(ModelId::new("tee"));
        let updates = driver.take_updates();
        assert!(updates.mesh.is_some());
        assert!(updates.texture.is_some());
        assert_eq!(driver.scene().texture(), Some(&TextureId::new("chrome")));
    }

    #[test]
    fn unknown_texture_keeps_current() {
        let (_dir, mut driver) = fixture();
        driver.apply_texture(&TextureId::new("chrome"));
        driver.apply_texture(&TextureId::new("velvet"));
        assert_eq!(driver.scene().texture(), Some(&TextureId::new("chrome")));
    }
}
