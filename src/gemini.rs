use anyhow::{Result, anyhow};
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::tools::fetch_image::SourceImage;

pub const GEMINI_MODEL: &str = "gemini-2.5-flash-image";
pub const GEMINI_TEMPERATURE: f32 = 0.65;
pub const PORTRAIT_EDITOR_PROMPT: &str = concat!(
    "You are an expert mobile-portrait editor who creates realistic images that look like ",
    "they were captured on a modern smartphone, keeping people natural and well-integrated ",
    "into their environments."
);
pub const NO_IMAGE_MESSAGE: &str = "Gemini did not return an image.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

impl GenerateContentRequest {
    fn new(source: &SourceImage, prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    RequestPart::Text {
                        text: PORTRAIT_EDITOR_PROMPT.to_string(),
                    },
                    RequestPart::Text {
                        text: prompt.to_string(),
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: source.mime_type.clone(),
                            data: base64::engine::general_purpose::STANDARD.encode(&source.bytes),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: GEMINI_TEMPERATURE,
            },
        }
    }
}

async fn assert_ok_response(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(anyhow!("Gemini request failed: {status} {text}"))
}

/// Client for the `generateContent` endpoint. One attempt per call.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_base: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{GEMINI_MODEL}:generateContent",
            self.api_base
        )
    }

    pub async fn edit_portrait(
        &self,
        source: &SourceImage,
        prompt: &str,
        api_key: &str,
    ) -> Result<GeneratedImage> {
        let body = GenerateContentRequest::new(source, prompt);
        tracing::debug!(
            model = GEMINI_MODEL,
            mime_type = %source.mime_type,
            size = source.bytes.len(),
            "Calling Gemini"
        );
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        let response = assert_ok_response(response).await?;
        let payload: GenerateContentResponse = response.json().await?;
        extract_image(payload)
    }
}

/// First candidate, first part carrying inline image data. Later image parts
/// are ignored.
fn extract_image(payload: GenerateContentResponse) -> Result<GeneratedImage> {
    let parts = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();

    let mut images = parts
        .into_iter()
        .filter_map(|part| part.inline_data)
        .filter(|inline| !inline.data.is_empty());
    let Some(inline) = images.next() else {
        return Err(GenerationError::internal(NO_IMAGE_MESSAGE).into());
    };
    let ignored = images.count();
    if ignored > 0 {
        tracing::debug!(ignored, "Gemini returned extra image parts");
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|err| anyhow!("decode Gemini image failed: {err}"))?;
    Ok(GeneratedImage { bytes })
}
