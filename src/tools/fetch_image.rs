use anyhow::Result;
use reqwest::{
    Client,
    header::{CONTENT_TYPE, HeaderMap},
};
use url::Url;

use crate::error::GenerationError;

pub const SUPPORTED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
];
const DEFAULT_MIME_TYPE: &str = "image/jpeg";
pub const DOWNLOAD_FAILED_MESSAGE: &str = "Unable to download image.";

/// Source image held only until the generation call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Lower-cases, drops media type parameters and maps `image/jpg` to
/// `image/jpeg`. A missing header means JPEG.
pub fn normalize_mime_type(header: Option<&str>) -> String {
    let Some(raw) = header else {
        return DEFAULT_MIME_TYPE.to_string();
    };
    let essence = raw.split(';').next().unwrap_or(raw).trim().to_lowercase();
    match essence.as_str() {
        "" => DEFAULT_MIME_TYPE.to_string(),
        "image/jpg" => "image/jpeg".to_string(),
        _ => essence,
    }
}

pub fn ensure_supported_mime_type(mime_type: &str) -> Result<(), GenerationError> {
    if SUPPORTED_MIME_TYPES.contains(&mime_type) {
        return Ok(());
    }
    Err(GenerationError::invalid_argument(format!(
        "Unsupported image mime type: {mime_type}. Allowed: {}",
        SUPPORTED_MIME_TYPES.join(", ")
    )))
}

/// Raw `Content-Type` value. Non-ASCII bytes are kept lossily so the value
/// still goes through the allow-list instead of reading as absent.
fn content_type_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

/// Downloads the image with a single GET. Transport errors are returned
/// untyped, HTTP and content type failures as `InvalidArgument`.
pub async fn fetch_source_image(client: &Client, url: &Url) -> Result<SourceImage> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        tracing::warn!(%status, "Source image download failed");
        return Err(GenerationError::invalid_argument(DOWNLOAD_FAILED_MESSAGE).into());
    }
    let mime_type = normalize_mime_type(content_type_header(response.headers()).as_deref());
    ensure_supported_mime_type(&mime_type)?;
    let bytes = response.bytes().await?;
    tracing::debug!(%mime_type, size = bytes.len(), "Fetched source image");
    Ok(SourceImage {
        bytes: bytes.to_vec(),
        mime_type,
    })
}
