// mandi/src/media.rs

//! Image storage collaborator. The core keeps only the returned references.

use crate::error::{MandiError, Result};
use async_trait::async_trait;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
  pub file_name: String,
  pub content_type: String,
  pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ImageStorage: Send + Sync {
  /// Stores the file and returns a durable URL for it.
  async fn upload(&self, file: &ImageFile) -> anyhow::Result<String>;
}

/// Uploads `files` in order and returns their references in the same order.
/// Stops at the first failure; nothing is written to the record store here.
#[instrument(skip_all, fields(count = files.len()), err(Display))]
pub async fn upload_images(storage: &dyn ImageStorage, files: &[ImageFile]) -> Result<Vec<String>> {
  let mut refs = Vec::with_capacity(files.len());
  for file in files {
    if !file.content_type.starts_with("image/") {
      return Err(MandiError::Validation(format!(
        "'{}' is not an image ({})",
        file.file_name, file.content_type
      )));
    }
    let url = storage.upload(file).await.map_err(|source| MandiError::Upload {
      file_name: file.file_name.clone(),
      source,
    })?;
    refs.push(url);
  }
  info!(uploaded = refs.len(), "Images uploaded.");
  Ok(refs)
}
