use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
};

use crate::{
    auth::CallerIdentity,
    context::AppContext,
    pipeline::{self, GenerateProfilePictureRequest},
};

pub async fn generate_profile_picture(
    ctx: &AppContext,
    caller: Option<&CallerIdentity>,
    Parameters(request): Parameters<GenerateProfilePictureRequest>,
) -> Result<CallToolResult, McpError> {
    let response = pipeline::generate_profile_picture(ctx, caller, &request).await?;
    let json = serde_json::to_string(&response).map_err(|err| {
        McpError::internal_error(
            "serialize tool response failed",
            Some(serde_json::Value::String(err.to_string())),
        )
    })?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
