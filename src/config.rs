// ⚙️ Configuration - Environment-driven settings
// Read once at startup; nothing here is re-evaluated per request

use crate::context::DEFAULT_CORPUS_PATH;
use crate::llm::{
    GeminiClient, TextGenerator, UnconfiguredGenerator, DEFAULT_ENDPOINT, DEFAULT_MODEL,
};
use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// API key variables, in lookup order
pub const API_KEY_VARS: [&str; 2] = ["API_KEY", "GENAI_API_KEY"];

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub llm_endpoint: String,
    pub corpus_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub enforce_schema: bool,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source (the process env, or a map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = API_KEY_VARS.iter().find_map(|name| var(*name));

        let bind = var("LOAN_RISK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid LOAN_RISK_BIND address: {}", bind))?;

        let enforce_schema = match var("LOAN_RISK_ENFORCE_SCHEMA") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("invalid LOAN_RISK_ENFORCE_SCHEMA value: {}", raw))?,
            None => true,
        };

        let max_upload_bytes = match var("LOAN_RISK_MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid LOAN_RISK_MAX_UPLOAD_BYTES value: {}", raw))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(AppConfig {
            api_key,
            model: var("LOAN_RISK_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_endpoint: var("LOAN_RISK_LLM_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            corpus_path: corpus_path_from(&lookup),
            bind_addr,
            enforce_schema,
            max_upload_bytes,
        })
    }

    pub fn llm_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Pick the generator variant: real client with a key, stand-in without
    pub fn text_generator(&self) -> Arc<dyn TextGenerator> {
        match &self.api_key {
            Some(key) => Arc::new(GeminiClient::new(&self.llm_endpoint, &self.model, key)),
            None => Arc::new(UnconfiguredGenerator::default()),
        }
    }
}

/// Corpus location alone, for callers that need nothing else from the env
pub fn corpus_path_from_env() -> PathBuf {
    corpus_path_from(&|name: &str| env::var(name).ok())
}

fn corpus_path_from<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup("LOAN_RISK_CORPUS")
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CORPUS_PATH))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
