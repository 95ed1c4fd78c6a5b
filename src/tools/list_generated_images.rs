use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars::JsonSchema,
};
use serde::Deserialize;

use crate::{
    auth::CallerIdentity,
    context::AppContext,
    error::GenerationError,
    pipeline::UNAUTHENTICATED_MESSAGE,
    storage::list_results,
};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListGeneratedImagesRequest {
    #[schemars(description = "Maximum number of results, newest first. Default 20, max 100")]
    pub limit: Option<u32>,
}

pub async fn list_generated_images(
    ctx: &AppContext,
    caller: Option<&CallerIdentity>,
    Parameters(request): Parameters<ListGeneratedImagesRequest>,
) -> Result<CallToolResult, McpError> {
    let caller = caller.ok_or_else(|| GenerationError::unauthenticated(UNAUTHENTICATED_MESSAGE))?;
    let limit = request.limit.map(|limit| limit as usize);
    let entries = list_results(ctx.documents.as_ref(), &caller.uid, limit)
        .await
        .map_err(|err| {
            tracing::error!(uid = %caller.uid, error = ?err, "List generated images failed");
            McpError::internal_error("list generated images failed", None)
        })?;
    let json = serde_json::to_string(&entries).map_err(|err| {
        McpError::internal_error(
            "serialize generated image history failed",
            Some(serde_json::Value::String(err.to_string())),
        )
    })?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
