use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cli::chat::assemble::ExcerptPolicy;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const SECRETS_FILE_ENV: &str = "VERTEX_SECRETS_FILE";

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are VERTEX, a logistics expert. Your answers are clear and structured.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "OpenAI API key not found. Locally: create a .env file with {}=... \
         Hosted: put {{\"openai\": {{\"api_key\": \"...\"}}}} in the secrets file \
         (see --secrets or {}).",
        API_KEY_ENV,
        SECRETS_FILE_ENV
    )]
    MissingApiKey,

    #[error("Failed to read secrets file {path}: {source}")]
    SecretsIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed secrets file {path}: {source}")]
    SecretsFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid base URL {url}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Everything needed to talk to the completion endpoint.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub excerpt: ExcerptPolicy,
}

impl Settings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            excerpt: ExcerptPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    openai: Option<OpenAiSecrets>,
}

#[derive(Debug, Deserialize)]
struct OpenAiSecrets {
    api_key: Option<String>,
}

/// `<config dir>/vertex/secrets.json`, e.g. `~/.config/vertex/secrets.json`.
pub fn default_secrets_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vertex").join("secrets.json"))
}

/// Read `openai.api_key` from a JSON secrets file. A missing file is not an
/// error.
pub fn read_secrets_api_key(path: &Path) -> Result<Option<String>, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::SecretsIo {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let secrets: SecretsFile =
        serde_json::from_str(&raw).map_err(|source| ConfigError::SecretsFormat {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(secrets
        .openai
        .and_then(|openai| openai.api_key)
        .filter(|key| !key.trim().is_empty()))
}

/// Resolve the API key: the secrets store first, then the environment.
///
/// A secrets file that exists but cannot be used is logged and skipped.
pub fn resolve_api_key<F>(secrets_path: Option<&Path>, env: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = secrets_path {
        match read_secrets_api_key(path) {
            Ok(Some(key)) => {
                debug!(path = %path.display(), "Using API key from secrets file");
                return Ok(key);
            }
            Ok(None) => debug!(path = %path.display(), "No API key in secrets file"),
            Err(e) => warn!("{}", e),
        }
    }

    env(API_KEY_ENV)
        .filter(|key| !key.trim().is_empty())
        .ok_or(ConfigError::MissingApiKey)
}
