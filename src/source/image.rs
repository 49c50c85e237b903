use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use image::DynamicImage;

use crate::error::{Result, ViewerError};
use crate::fs::provider::{ByteStream, FileHandle};
use crate::notice::Notices;
use crate::query::StreamElement;
use crate::source::stream::PagedFileAggregator;

/// Turns file contents into an image.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path, bytes: &[u8]) -> Result<DynamicImage>;
}

/// Decoder backed by the `image` crate, guessing the format from content.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, path: &Path, bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| ViewerError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// A decoded page entry. `image` is `None` when the file could not be read
/// or decoded.
#[derive(Debug, Clone)]
pub struct ImageElement {
    pub index: usize,
    pub file: FileHandle,
    pub image: Option<Arc<DynamicImage>>,
}

impl ImageElement {
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|img| (img.width(), img.height()))
    }
}

/// Decodes the pages of a [`PagedFileAggregator`].
///
/// A file that fails to decode never fails its page: it comes back with no
/// image and a decode-failure notice is raised.
pub struct PagedImageDecoder {
    files: PagedFileAggregator,
    decoder: Arc<dyn ImageDecoder>,
    notices: Arc<Notices>,
    paths: Mutex<HashMap<usize, PathBuf>>,
    decoded: AtomicUsize,
}

impl PagedImageDecoder {
    pub fn new(
        files: PagedFileAggregator,
        decoder: Arc<dyn ImageDecoder>,
        notices: Arc<Notices>,
    ) -> Self {
        Self {
            files,
            decoder,
            notices,
            paths: Mutex::new(HashMap::new()),
            decoded: AtomicUsize::new(0),
        }
    }

    pub async fn get_paged_items(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<ImageElement>> {
        let elements = self.files.get_paged_items(page, page_size).await?;
        {
            let mut paths = self.paths.lock().unwrap_or_else(PoisonError::into_inner);
            for element in &elements {
                paths
                    .entry(element.index)
                    .or_insert_with(|| element.file.path().to_path_buf());
            }
        }
        Ok(join_all(elements.into_iter().map(|e| self.decode_element(e))).await)
    }

    /// Path of the file shown at `index`, once its page has been fetched.
    pub fn path_for_index(&self, index: usize) -> Option<PathBuf> {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&index)
            .cloned()
    }

    pub fn images_decoded(&self) -> usize {
        self.decoded.load(Ordering::Relaxed)
    }

    pub fn files_loaded(&self) -> usize {
        self.files.loaded_count()
    }

    pub fn folder_count(&self) -> usize {
        self.files.folder_count()
    }

    async fn decode_element(&self, element: StreamElement) -> ImageElement {
        let StreamElement { index, file, stream } = element;
        let image = match self.decode_stream(&file, stream).await {
            Ok(image) => {
                self.decoded.fetch_add(1, Ordering::Relaxed);
                Some(Arc::new(image))
            }
            Err(e) => {
                log::warn!("could not decode {}: {}", file.path().display(), e);
                match e {
                    ViewerError::Decode { path, message } => {
                        self.notices.report_decode_failure(&path, message)
                    }
                    e if e.is_access_error() => self.notices.report_access_error(&e),
                    e => self.notices.report_decode_failure(file.path(), e.to_string()),
                }
                None
            }
        };
        ImageElement { index, file, image }
    }

    async fn decode_stream(&self, file: &FileHandle, stream: ByteStream) -> Result<DynamicImage> {
        let bytes = stream.read_all().await?;
        let decoder = self.decoder.clone();
        let path = file.path().to_path_buf();
        tokio::task::spawn_blocking(move || decoder.decode(&path, &bytes))
            .await
            .map_err(|e| ViewerError::Decode {
                path: file.path().to_path_buf(),
                message: e.to_string(),
            })?
    }
}
