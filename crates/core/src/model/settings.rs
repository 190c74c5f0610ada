use thiserror::Error;
use url::Url;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-09-2025";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Validated connection settings for the question-generation service.
#[derive(Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    api_key: String,
    model: String,
    base_url: String,
    timeout_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct GenerationSettingsDraft {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("generation service API key is not configured")]
    MissingApiKey,

    #[error("invalid base URL")]
    InvalidBaseUrl,

    #[error("request timeout must be greater than zero")]
    InvalidTimeout,
}

impl GenerationSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize the draft, filling in defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the API key is missing, the base URL is
    /// present but invalid, or the timeout is zero.
    pub fn validate(self) -> Result<GenerationSettings, SettingsError> {
        let api_key = normalize_optional(self.api_key).ok_or(SettingsError::MissingApiKey)?;
        let model = normalize_optional(self.model).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = normalize_optional(self.base_url)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        if Url::parse(&base_url).is_err() {
            return Err(SettingsError::InvalidBaseUrl);
        }

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(SettingsError::InvalidTimeout);
        }

        Ok(GenerationSettings {
            api_key,
            model,
            base_url,
            timeout_secs,
        })
    }
}

impl GenerationSettings {
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

// The key stays out of logs.
impl std::fmt::Debug for GenerationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
