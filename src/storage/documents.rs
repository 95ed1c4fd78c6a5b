use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use uuid::Uuid;

const DOCUMENTS_DIR: &str = "documents";

pub type Document = Map<String, Value>;

/// Hierarchical document database.
///
/// Paths alternate collection and document ids, e.g. `users/<uid>` is a
/// document and `users/<uid>/results` is a collection beneath it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Document>>;

    /// Creates or fully replaces the document at `path`.
    async fn set(&self, path: &str, fields: Document) -> Result<()>;

    /// Overlays `fields` on the document at `path`, creating it if needed.
    /// Fields not named in `fields` are left untouched.
    async fn merge(&self, path: &str, fields: Document) -> Result<()>;

    /// Returns `(id, document)` for every document directly in `collection`.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>>;
}

/// One JSON file per document under `<base_dir>/documents`.
#[derive(Clone, Debug)]
pub struct LocalDocumentStore {
    base_dir: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn document_file(&self, path: &str) -> Result<PathBuf> {
        let segments = segments(path)?;
        if segments.len() % 2 != 0 {
            bail!("not a document path: {path}");
        }
        let Some((last, parents)) = segments.split_last() else {
            bail!("not a document path: {path}");
        };
        let mut file = self.base_dir.join(DOCUMENTS_DIR);
        file.extend(parents);
        file.push(format!("{last}.json"));
        Ok(file)
    }

    fn collection_dir(&self, collection: &str) -> Result<PathBuf> {
        let segments = segments(collection)?;
        if segments.len() % 2 != 1 {
            bail!("not a collection path: {collection}");
        }
        let mut dir = self.base_dir.join(DOCUMENTS_DIR);
        dir.extend(segments);
        Ok(dir)
    }

    async fn read(file: &Path) -> Result<Option<Document>> {
        match fs::read(file).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Temp file plus rename so readers never see a partially written document.
    async fn write(file: &Path, document: &Document) -> Result<()> {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = file.with_extension(format!("json.tmp-{}", Uuid::new_v4()));
        fs::write(&tmp, serde_json::to_vec_pretty(document)?).await?;
        if let Err(err) = fs::rename(&tmp, file).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Document>> {
        Self::read(&self.document_file(path)?).await
    }

    async fn set(&self, path: &str, fields: Document) -> Result<()> {
        Self::write(&self.document_file(path)?, &fields).await
    }

    async fn merge(&self, path: &str, fields: Document) -> Result<()> {
        let file = self.document_file(path)?;
        let mut document = Self::read(&file).await?.unwrap_or_default();
        document.extend(fields);
        Self::write(&file, &document).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>> {
        let dir_path = self.collection_dir(collection)?;
        let mut dir = match fs::read_dir(&dir_path).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut documents = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let id = id.to_string();
            if let Some(document) = Self::read(&path).await? {
                documents.push((id, document));
            }
        }
        documents.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(documents)
    }
}

fn segments(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments {
        if segment.is_empty() || *segment == "." || *segment == ".." || segment.contains('\\') {
            bail!("invalid document path: {path}");
        }
    }
    Ok(segments)
}
