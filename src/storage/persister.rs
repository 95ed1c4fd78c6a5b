use std::time::Duration;

use anyhow::{Result, bail};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::storage::{
    Document, DocumentStore, ObjectMetadata, ObjectStore, ResultRecord, UserProfileSummary,
    generated_image_path, result_document_path, user_document_path,
};

pub const GENERATED_CONTENT_TYPE: &str = "image/jpeg";
pub const GENERATED_CACHE_CONTROL: &str = "public,max-age=3600";
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedResult {
    pub image_url: String,
    pub result_id: String,
}

/// Stores `bytes` under a fresh result id and records it in the user's history.
///
/// The object write and both document writes are independent. A failure after
/// the object write leaves the object in place without a history entry.
pub async fn save_generated_image(
    objects: &dyn ObjectStore,
    documents: &dyn DocumentStore,
    uid: &str,
    bytes: &[u8],
    prompt: &str,
) -> Result<PersistedResult> {
    let result_id = Uuid::new_v4().to_string();
    let path = generated_image_path(uid, &result_id);

    objects
        .put(
            &path,
            bytes,
            &ObjectMetadata {
                content_type: GENERATED_CONTENT_TYPE.to_string(),
                cache_control: Some(GENERATED_CACHE_CONTROL.to_string()),
            },
        )
        .await?;
    let signed_url = objects.signed_read_url(&path, SIGNED_URL_TTL)?;

    documents
        .merge(
            &user_document_path(uid),
            to_document(&UserProfileSummary {
                last_generated_at: Utc::now(),
            })?,
        )
        .await?;

    let record = ResultRecord {
        image_url: signed_url.clone(),
        image_path: path,
        prompt: prompt.to_string(),
        created_at: Utc::now(),
    };
    documents
        .set(&result_document_path(uid, &result_id), to_document(&record)?)
        .await?;

    tracing::info!(uid, result_id = %result_id, size = bytes.len(), "Saved generated image");
    Ok(PersistedResult {
        image_url: signed_url,
        result_id,
    })
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => bail!("expected a JSON object, got {other}"),
    }
}
