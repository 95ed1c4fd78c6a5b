use url::Url;

use crate::error::GenerationError;

pub const INVALID_IMAGE_URL_MESSAGE: &str = "A valid HTTPS imageUrl is required.";

/// Accepts only absolute `http`/`https` URLs.
pub fn validate_http_url(raw: &str) -> Result<Url, GenerationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::invalid_argument(INVALID_IMAGE_URL_MESSAGE));
    }
    let parsed = Url::parse(trimmed).map_err(|err| {
        tracing::debug!(error = %err, "Rejected unparseable imageUrl");
        GenerationError::invalid_argument(INVALID_IMAGE_URL_MESSAGE)
    })?;
    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(parsed),
        scheme => {
            tracing::debug!(scheme, "Rejected imageUrl scheme");
            Err(GenerationError::invalid_argument(INVALID_IMAGE_URL_MESSAGE))
        }
    }
}
