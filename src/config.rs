use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_PORT: u16 = 3000;
const DATA_DIR_NAME: &str = "profile-picture-rmcp";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    /// Optional path segment that prefixes the MCP endpoint.
    pub secret_key: Option<String>,
    pub data_dir: PathBuf,
    /// Origin that signed object URLs are minted against, without trailing slash.
    pub public_base_url: String,
    /// `PUBLIC_BASE_URL` was unset and the bind address stands in for it.
    pub public_base_url_is_fallback: bool,
    /// Model credential. Absence is reported per request, not at startup.
    pub gemini_api_key: Option<String>,
    pub gemini_api_base: String,
    pub auth_token_secret: String,
    pub url_signing_key: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = env::var("MCP_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let bind_address = format!("0.0.0.0:{port}");
        let (public_base_url, public_base_url_is_fallback) =
            resolve_public_base_url(non_blank("PUBLIC_BASE_URL").as_deref(), &bind_address);

        Ok(Self {
            port,
            secret_key: non_blank("SECRET_KEY"),
            data_dir: resolve_data_dir(),
            public_base_url,
            public_base_url_is_fallback,
            gemini_api_key: non_blank("GEMINI_API_KEY"),
            gemini_api_base: non_blank("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            auth_token_secret: required("AUTH_TOKEN_SECRET")?,
            url_signing_key: required("URL_SIGNING_KEY")?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn mcp_path(&self) -> String {
        match self.secret_key.as_deref() {
            Some(value) => format!("/{value}/mcp"),
            None => "/mcp".to_string(),
        }
    }
}

fn non_blank(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(name: &str) -> Result<String> {
    non_blank(name).ok_or_else(|| anyhow!("{name} must be set"))
}

fn resolve_data_dir() -> PathBuf {
    if let Some(dir) = non_blank("DATA_DIR") {
        return PathBuf::from(dir);
    }
    let mut base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push(DATA_DIR_NAME);
    base
}

/// Returns the normalized origin and whether it fell back to `bind_address`.
fn resolve_public_base_url(explicit: Option<&str>, bind_address: &str) -> (String, bool) {
    match explicit {
        Some(raw) => (normalize_base_url(raw), false),
        None => (normalize_base_url(bind_address), true),
    }
}

/// Adds a scheme when missing and collapses doubled schemes such as
/// `http://https://host`.
pub fn normalize_base_url(raw: &str) -> String {
    let mut rest = raw.trim().trim_end_matches('/');
    let mut scheme = "http";
    loop {
        if let Some(stripped) = rest.strip_prefix("https://") {
            scheme = "https";
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("http://") {
            scheme = "http";
            rest = stripped;
        } else {
            break;
        }
    }
    format!("{scheme}://{rest}")
}
