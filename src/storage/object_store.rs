use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::{fs, io::AsyncWriteExt};
use url::Url;

use crate::storage::UrlSigner;

const OBJECTS_DIR: &str = "objects";
const OBJECT_META_DIR: &str = "object-meta";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub cache_control: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub metadata: ObjectMetadata,
}

/// Durable blob storage addressed by slash-separated paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes a new object. Fails if `path` already holds one.
    async fn put(&self, path: &str, bytes: &[u8], metadata: &ObjectMetadata) -> Result<()>;

    async fn get(&self, path: &str) -> Result<Option<StoredObject>>;

    /// Mints a read URL for `path` that stops working after `ttl`.
    fn signed_read_url(&self, path: &str, ttl: Duration) -> Result<String>;

    /// Checks a signature produced by [`ObjectStore::signed_read_url`].
    /// Stores that do not serve their own signed reads reject everything.
    fn verify_signed_read(&self, _path: &str, _expires: i64, _signature: &str) -> bool {
        false
    }
}

/// Filesystem object store whose signed URLs point at this server's
/// `/objects/{*path}` route.
#[derive(Clone)]
pub struct LocalObjectStore {
    base_dir: PathBuf,
    base_url: String,
    signer: UrlSigner,
}

impl LocalObjectStore {
    pub fn new(base_dir: PathBuf, base_url: String, signer: UrlSigner) -> Self {
        Self {
            base_dir,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
        }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.base_dir.join(OBJECTS_DIR).join(safe_relative_path(key)?))
    }

    fn meta_path(&self, key: &str) -> Result<PathBuf> {
        let relative = safe_relative_path(key)?;
        let mut path = self.base_dir.join(OBJECT_META_DIR).join(relative);
        let file_name = path
            .file_name()
            .map(|name| format!("{}.json", name.to_string_lossy()))
            .ok_or_else(|| anyhow!("object path has no file name: {key}"))?;
        path.set_file_name(file_name);
        Ok(path)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: &[u8], metadata: &ObjectMetadata) -> Result<()> {
        let path = self.object_path(key)?;
        let meta_path = self.meta_path(key)?;
        for dir in [path.parent(), meta_path.parent()].into_iter().flatten() {
            fs::create_dir_all(dir).await?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|err| anyhow!("create object {key} failed: {err}"))?;
        file.write_all(bytes).await?;
        file.flush().await?;

        fs::write(&meta_path, serde_json::to_vec(metadata)?).await?;
        tracing::debug!(key, size = bytes.len(), "Stored object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        let path = self.object_path(key)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let metadata = match fs::read(self.meta_path(key)?).await {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => ObjectMetadata {
                content_type: DEFAULT_CONTENT_TYPE.to_string(),
                cache_control: None,
            },
            Err(err) => return Err(err.into()),
        };
        Ok(Some(StoredObject { bytes, metadata }))
    }

    fn signed_read_url(&self, key: &str, ttl: Duration) -> Result<String> {
        safe_relative_path(key)?;
        let ttl = i64::try_from(ttl.as_secs())?;
        let expires = Utc::now().timestamp() + ttl;
        let signature = self.signer.sign(key, expires);

        let mut url = Url::parse(&format!("{}/objects/", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("base url cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(key.split('/'));
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &signature);
        Ok(url.to_string())
    }

    fn verify_signed_read(&self, key: &str, expires: i64, signature: &str) -> bool {
        self.signer
            .verify(key, expires, signature, Utc::now().timestamp())
    }
}

/// Rejects keys that would escape the store root.
fn safe_relative_path(key: &str) -> Result<&Path> {
    let path = Path::new(key);
    if key.is_empty() {
        bail!("object path must not be empty");
    }
    for component in path.components() {
        if !matches!(component, Component::Normal(_)) {
            bail!("object path must be relative without '..': {key}");
        }
    }
    Ok(path)
}
