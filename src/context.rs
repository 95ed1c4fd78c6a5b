use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;

use crate::{
    auth::IdTokenVerifier,
    config::AppConfig,
    gemini::GeminiClient,
    storage::{DocumentStore, LocalDocumentStore, LocalObjectStore, ObjectStore, UrlSigner},
};

/// Handles shared by every invocation. Built once at startup and passed
/// around behind an `Arc`.
pub struct AppContext {
    pub http: Client,
    pub gemini: GeminiClient,
    pub gemini_api_key: Option<String>,
    pub verifier: IdTokenVerifier,
    pub objects: Arc<dyn ObjectStore>,
    pub documents: Arc<dyn DocumentStore>,
}

impl AppContext {
    /// Wires the filesystem-backed stores rooted at `config.data_dir`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let http = Client::builder().build()?;
        let signer = UrlSigner::new(&config.url_signing_key)?;
        Ok(Self {
            gemini: GeminiClient::new(http.clone(), config.gemini_api_base.clone()),
            http,
            gemini_api_key: config.gemini_api_key.clone(),
            verifier: IdTokenVerifier::new(&config.auth_token_secret),
            objects: Arc::new(LocalObjectStore::new(
                config.data_dir.clone(),
                config.public_base_url.clone(),
                signer,
            )),
            documents: Arc::new(LocalDocumentStore::new(config.data_dir.clone())),
        })
    }
}
