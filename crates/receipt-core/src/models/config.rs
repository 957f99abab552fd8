//! Configuration structures for receipt extraction runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::batch::MAX_DOCUMENTS;
use crate::error::{ReceiptError, Result};
use crate::export::ExportFormat;

/// Main configuration for the receipt pipeline.
///
/// The API key is deliberately absent: it is read from the environment
/// variable named by [`ApiConfig::api_key_env`] or passed on the command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    /// Remote model API configuration.
    pub api: ApiConfig,

    /// Batch limits and accepted inputs.
    pub batch: BatchConfig,

    /// Instruction prompt configuration.
    pub prompt: PromptConfig,

    /// Export configuration.
    pub export: ExportConfig,
}

/// Remote chat-completion API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Chat-completion endpoint URL.
    pub endpoint: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.perplexity.ai/chat/completions".to_string(),
            model: "sonar-pro".to_string(),
            api_key_env: "PERPLEXITY_API_KEY".to_string(),
        }
    }
}

/// Batch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of documents per run, between 1 and 5.
    pub max_documents: usize,

    /// Accepted document file extensions (lowercase, without dot).
    pub allowed_extensions: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_documents: MAX_DOCUMENTS,
            allowed_extensions: vec!["pdf".to_string()],
        }
    }
}

impl BatchConfig {
    /// Check whether a path has one of the accepted extensions.
    pub fn accepts(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        self.allowed_extensions.iter().any(|allowed| *allowed == ext)
    }
}

/// Instruction prompt configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Edited instruction prompt; the built-in default is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_file: Option<PathBuf>,
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Export file format.
    pub format: ExportFormat,

    /// Directory for timestamped export files.
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ReceiptConfig {
    /// Load and validate configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ReceiptError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate and save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ReceiptError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that serde cannot constrain.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_DOCUMENTS).contains(&self.batch.max_documents) {
            return Err(ReceiptError::Config(format!(
                "batch.max_documents must be between 1 and {}, got {}",
                MAX_DOCUMENTS, self.batch.max_documents
            )));
        }
        if self.batch.allowed_extensions.is_empty() {
            return Err(ReceiptError::Config(
                "batch.allowed_extensions must not be empty".to_string(),
            ));
        }
        if self.api.endpoint.trim().is_empty() {
            return Err(ReceiptError::Config("api.endpoint must not be empty".to_string()));
        }
        Ok(())
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key_from_env(&self) -> Option<String> {
        std::env::var(&self.api.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
