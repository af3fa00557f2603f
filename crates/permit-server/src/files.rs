//! Content-addressed document storage on the local filesystem.
//!
//! Documents are written under `<root>/<first two hex digits>/<sha256>`; the
//! returned reference is `sha256:<hex>`. Identical uploads share one file.

use std::{
  io,
  path::{Path, PathBuf},
};

use bytes::Bytes;
use permit_core::collaborator::FileStore;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

pub const REFERENCE_PREFIX: &str = "sha256:";

#[derive(Debug, Clone)]
pub struct DiskFileStore {
  root: PathBuf,
}

impl DiskFileStore {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  /// On-disk location of the document behind `reference`, if it names one.
  pub fn path_of(&self, reference: &str) -> Option<PathBuf> {
    let digest = reference.strip_prefix(REFERENCE_PREFIX)?;
    if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
      return None;
    }
    Some(self.root.join(&digest[..2]).join(digest))
  }
}

impl FileStore for DiskFileStore {
  type Error = io::Error;

  async fn put(&self, key: String, bytes: Bytes) -> Result<String, io::Error> {
    let digest = hex::encode(Sha256::digest(&bytes));
    let reference = format!("{REFERENCE_PREFIX}{digest}");
    let dir = self.root.join(&digest[..2]);
    let path = dir.join(&digest);

    if tokio::fs::try_exists(&path).await? {
      debug!(%key, %reference, "document already stored");
      return Ok(reference);
    }

    tokio::fs::create_dir_all(&dir).await?;
    // Write then rename so a reader never sees a partial file.
    let partial = dir.join(format!("{digest}.{}.partial", Uuid::new_v4()));
    tokio::fs::write(&partial, &bytes).await?;
    tokio::fs::rename(&partial, &path).await?;

    debug!(%key, %reference, size = bytes.len(), "document stored");
    Ok(reference)
  }
}
