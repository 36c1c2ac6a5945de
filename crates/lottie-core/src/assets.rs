//! Lazily fetched bitmap assets.

use crate::error::{AssetError, LottieError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Image asset declared by a composition.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageAsset {
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Directory prefix (`u`) relative to the images folder.
    pub directory: String,
    /// File name (`p`), or a full data URI for embedded images.
    pub file_name: String,
}

impl ImageAsset {
    pub fn is_embedded(&self) -> bool {
        self.file_name.starts_with("data:")
    }
}

/// Encoded image bytes, shared between the table and backends.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    pub id: String,
    pub bytes: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
}

impl ImageData {
    pub fn new(id: impl Into<String>, bytes: impl Into<Arc<[u8]>>, width: u32, height: u32) -> Self {
        ImageData {
            id: id.into(),
            bytes: bytes.into(),
            width,
            height,
        }
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("id", &self.id)
            .field("bytes", &self.bytes.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Host-provided image source, consulted before the images folder.
///
/// `Ok(None)` defers to the images folder.
pub trait ImageAssetResolver: Send + Sync {
    fn fetch_image(&self, asset: &ImageAsset) -> Result<Option<Vec<u8>>, AssetError>;
}

/// Cache of fetched images keyed by asset id.
///
/// Shared across threads: a resolver may store or clear entries while a
/// render pass reads them. The lock is never held while fetching.
#[derive(Default)]
pub struct ImageAssetTable {
    images_folder: Option<PathBuf>,
    resolver: Option<Arc<dyn ImageAssetResolver>>,
    entries: Mutex<HashMap<String, Option<Arc<ImageData>>>>,
}

impl ImageAssetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.images_folder = Some(folder.into());
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ImageAssetResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn set_images_folder(&mut self, folder: Option<PathBuf>) {
        self.images_folder = folder;
    }

    pub fn set_resolver(&mut self, resolver: Option<Arc<dyn ImageAssetResolver>>) {
        self.resolver = resolver;
    }

    pub fn images_folder(&self) -> Option<&Path> {
        self.images_folder.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Option<Arc<ImageData>>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Image for `asset`, fetching it on first use.
    ///
    /// `Ok(None)` means the asset is known to be unavailable and is cached
    /// as such. A failed fetch is reported once and then remembered as
    /// unavailable until [`ImageAssetTable::clear`] or
    /// [`ImageAssetTable::update_image`] drops the entry. A missing images
    /// folder is never cached.
    pub fn image(&self, asset: &ImageAsset) -> Result<Option<Arc<ImageData>>> {
        if let Some(cached) = self.lock().get(&asset.id) {
            return Ok(cached.clone());
        }

        let fetched = match self.fetch(asset) {
            Ok(fetched) => fetched,
            Err(LottieError::Asset(err)) => {
                warn!(id = %asset.id, %err, "Image unavailable until invalidated");
                self.lock().entry(asset.id.clone()).or_insert(None);
                return Err(err.into());
            }
            Err(err) => return Err(err),
        };
        let mut entries = self.lock();
        Ok(entries.entry(asset.id.clone()).or_insert(fetched).clone())
    }

    fn fetch(&self, asset: &ImageAsset) -> Result<Option<Arc<ImageData>>> {
        let wrap = |bytes: Vec<u8>| Arc::new(ImageData::new(asset.id.as_str(), bytes, asset.width, asset.height));

        if asset.is_embedded() {
            return Ok(match decode_data_uri(&asset.id, &asset.file_name) {
                Ok(bytes) => Some(wrap(bytes)),
                Err(err) => {
                    warn!(%err, "Malformed embedded image, skipping");
                    None
                }
            });
        }

        if let Some(resolver) = &self.resolver {
            if let Some(bytes) = resolver.fetch_image(asset)? {
                debug!(id = %asset.id, len = bytes.len(), "Image provided by resolver");
                return Ok(Some(wrap(bytes)));
            }
        }

        let folder = self
            .images_folder
            .as_ref()
            .ok_or_else(|| LottieError::MissingImagesFolder {
                id: asset.id.clone(),
            })?;
        let path = folder.join(&asset.directory).join(&asset.file_name);
        let bytes = std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound(path.display().to_string())
            } else {
                AssetError::Io { path, source }
            }
        })?;
        Ok(Some(wrap(bytes)))
    }

    /// Stores (`Some`) or clears (`None`) the image for `id`, returning the
    /// previous entry.
    pub fn update_image(&self, id: &str, image: Option<ImageData>) -> Option<Arc<ImageData>> {
        let mut entries = self.lock();
        let previous = match image {
            Some(image) => entries.insert(id.to_string(), Some(Arc::new(image))),
            None => entries.remove(id),
        };
        previous.flatten()
    }

    /// Cached image without fetching.
    pub fn cached(&self, id: &str) -> Option<Arc<ImageData>> {
        self.lock().get(id).cloned().flatten()
    }

    /// Drops every cached entry; later lookups fetch again.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

fn decode_data_uri(id: &str, uri: &str) -> std::result::Result<Vec<u8>, AssetError> {
    let decode_error = |reason: String| AssetError::Decode {
        id: id.to_string(),
        reason,
    };
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| decode_error("data URI has no payload".into()))?;
    if !header.ends_with(";base64") {
        return Err(decode_error(format!("unsupported data URI encoding '{header}'")));
    }
    BASE64_STANDARD
        .decode(payload.trim())
        .map_err(|e| decode_error(e.to_string()))
}
