use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const USERS_COLLECTION: &str = "users";
pub const RESULTS_SUBCOLLECTION: &str = "results";

pub fn user_document_path(uid: &str) -> String {
    format!("{USERS_COLLECTION}/{uid}")
}

pub fn results_collection_path(uid: &str) -> String {
    format!("{USERS_COLLECTION}/{uid}/{RESULTS_SUBCOLLECTION}")
}

pub fn result_document_path(uid: &str, result_id: &str) -> String {
    format!("{}/{result_id}", results_collection_path(uid))
}

pub fn generated_image_path(uid: &str, result_id: &str) -> String {
    format!("{USERS_COLLECTION}/{uid}/generated/{result_id}.jpg")
}

/// Metadata for one generation, stored at `users/<uid>/results/<resultId>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// Signed read URL handed back to the caller.
    pub image_url: String,
    /// Internal object path. Not directly readable by clients.
    pub image_path: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

/// Fields this service writes into `users/<uid>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileSummary {
    pub last_generated_at: DateTime<Utc>,
}
