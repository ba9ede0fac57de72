//! Garment meshes and matcap textures: fetching over HTTP or from disk,
//! decoding, and a load-once cache shared by every caller.

mod cache;
mod error;
mod fetch;
mod loader;
mod mesh;
mod texture;

pub use cache::{AssetCache, Executor, LoadResult, SharedLoad};
pub use error::AssetError;
pub use fetch::{AssetSource, FileFetcher, Fetcher, HttpFetcher, SourceFetcher};
pub use loader::AssetLoader;
pub use mesh::{decode_gltf, MeshData};
pub use texture::TextureData;
