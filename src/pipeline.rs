//! `generateProfilePicture`: validate, fetch, generate, persist.
//!
//! Stages run strictly in order and the first failure ends the invocation.
//! Validation failures are typed. Anything raised after validation goes
//! through [`sanitize`] so only typed errors reach the caller verbatim.

use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    auth::CallerIdentity,
    context::AppContext,
    error::{GenerationError, sanitize},
    storage::save_generated_image,
    tools::{fetch_image::fetch_source_image, validate_http_url},
};

pub const DEFAULT_PROMPT: &str = "Create a professional profile headshot with even lighting.";
pub const UNAUTHENTICATED_MESSAGE: &str = "Authentication required.";
pub const MISSING_API_KEY_MESSAGE: &str = "GEMINI_API_KEY secret is not configured.";

#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateProfilePictureRequest {
    #[serde(default)]
    #[schemars(description = "HTTP(S) URL of the source photo")]
    pub image_url: String,
    #[schemars(description = "Editing instruction. Defaults to a professional headshot")]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateProfilePictureResponse {
    pub image_url: String,
    pub result_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub uid: String,
    pub image_url: Url,
    pub prompt: String,
    pub api_key: String,
}

/// Checks identity, then the URL, then the model credential.
pub fn validate_request(
    caller: Option<&CallerIdentity>,
    request: &GenerateProfilePictureRequest,
    api_key: Option<&str>,
) -> Result<ValidatedRequest, GenerationError> {
    let uid = caller
        .map(|caller| caller.uid.clone())
        .ok_or_else(|| GenerationError::unauthenticated(UNAUTHENTICATED_MESSAGE))?;
    let image_url = validate_http_url(&request.image_url)?;
    let prompt = request
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or(DEFAULT_PROMPT)
        .to_string();
    let api_key = api_key
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| GenerationError::failed_precondition(MISSING_API_KEY_MESSAGE))?
        .to_string();
    Ok(ValidatedRequest {
        uid,
        image_url,
        prompt,
        api_key,
    })
}

pub async fn generate_profile_picture(
    ctx: &AppContext,
    caller: Option<&CallerIdentity>,
    request: &GenerateProfilePictureRequest,
) -> Result<GenerateProfilePictureResponse, GenerationError> {
    let validated = validate_request(caller, request, ctx.gemini_api_key.as_deref())
        .inspect_err(|err| {
            tracing::warn!(status = err.status(), error = %err, "Rejected request")
        })?;
    tracing::info!(uid = %validated.uid, "Generating profile picture");
    run_stages(ctx, &validated).await.map_err(sanitize)
}

async fn run_stages(
    ctx: &AppContext,
    request: &ValidatedRequest,
) -> anyhow::Result<GenerateProfilePictureResponse> {
    let generated = {
        let source = fetch_source_image(&ctx.http, &request.image_url).await?;
        ctx.gemini
            .edit_portrait(&source, &request.prompt, &request.api_key)
            .await?
    };
    let saved = save_generated_image(
        ctx.objects.as_ref(),
        ctx.documents.as_ref(),
        &request.uid,
        &generated.bytes,
        &request.prompt,
    )
    .await?;
    Ok(GenerateProfilePictureResponse {
        image_url: saved.image_url,
        result_id: saved.result_id,
    })
}
