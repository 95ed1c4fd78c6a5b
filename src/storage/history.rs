use anyhow::Result;
use serde::Serialize;

use crate::storage::{DocumentStore, ResultRecord, results_collection_path};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub result_id: String,
    #[serde(flatten)]
    pub record: ResultRecord,
}

/// The user's results, newest first. Documents that do not parse as a
/// [`ResultRecord`] are skipped.
pub async fn list_results(
    documents: &dyn DocumentStore,
    uid: &str,
    limit: Option<usize>,
) -> Result<Vec<ResultEntry>> {
    let limit = limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let mut entries: Vec<ResultEntry> = documents
        .list(&results_collection_path(uid))
        .await?
        .into_iter()
        .filter_map(|(result_id, document)| {
            match serde_json::from_value::<ResultRecord>(document.into()) {
                Ok(record) => Some(ResultEntry { result_id, record }),
                Err(err) => {
                    tracing::warn!(
                        uid,
                        result_id = %result_id,
                        error = %err,
                        "Skipping malformed result document"
                    );
                    None
                }
            }
        })
        .collect();
    entries.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at));
    entries.truncate(limit);
    Ok(entries)
}
