use genai::adapter::AdapterKind;
use std::env;
use std::fmt;
use thiserror::Error;

const DEFAULT_PROVIDER: AdapterKind = AdapterKind::Groq;
const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5-coder:7b";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CACHE_ENABLED: bool = true;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;
const DEFAULT_ANALYSIS_EXCERPT_CHARS: usize = 1000;
const DEFAULT_DETECTION_EXCERPT_CHARS: usize = 800;
const DEFAULT_ROOT_MARKER: &str = "complex_project";
const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing credential: set the {0} environment variable")]
    MissingCredential(String),

    #[error("Invalid provider: {0}. Valid options: groq, openai, ollama, anthropic, gemini, xai, deepseek, cohere")]
    InvalidProvider(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone)]
pub struct ArchmapConfig {
    pub provider: AdapterKind,
    pub model: String,
    pub api_base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub log_level: String,
    pub cache_enabled: bool,
    pub confidence_threshold: f64,
    pub analysis_excerpt_chars: usize,
    pub detection_excerpt_chars: usize,
    pub root_marker: String,
    pub concurrency: usize,
}

pub fn parse_provider(s: &str) -> Result<AdapterKind, ConfigError> {
    match s.to_lowercase().as_str() {
        "claude" => Ok(AdapterKind::Anthropic),
        "grok" => Ok(AdapterKind::Xai),
        other => AdapterKind::from_lower_str(other)
            .ok_or_else(|| ConfigError::InvalidProvider(s.to_string())),
    }
}

pub fn default_model(provider: AdapterKind) -> String {
    match provider {
        AdapterKind::Groq => DEFAULT_GROQ_MODEL.to_string(),
        AdapterKind::Ollama => DEFAULT_OLLAMA_MODEL.to_string(),
        AdapterKind::OpenAI => "gpt-4o-mini".to_string(),
        AdapterKind::Anthropic => "claude-3-5-haiku-latest".to_string(),
        AdapterKind::Gemini => "gemini-2.0-flash".to_string(),
        _ => "default-model".to_string(),
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::ParseError {
                field: key.to_string(),
                error: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl Default for ArchmapConfig {
    fn default() -> Self {
        let provider = DEFAULT_PROVIDER;
        Self {
            provider,
            model: default_model(provider),
            api_base_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            cache_enabled: DEFAULT_CACHE_ENABLED,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            analysis_excerpt_chars: DEFAULT_ANALYSIS_EXCERPT_CHARS,
            detection_excerpt_chars: DEFAULT_DETECTION_EXCERPT_CHARS,
            root_marker: DEFAULT_ROOT_MARKER.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Loads `.env` from the working directory (or a parent) into the process
/// environment. Variables that are already set are kept.
pub fn load_dotenv() -> Option<std::path::PathBuf> {
    dotenvy::dotenv().ok()
}

impl ArchmapConfig {
    /// Reads `ARCHMAP_*` variables on top of the defaults. A `.env` file in
    /// the working directory is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();

        let mut config = Self::default();

        if let Ok(raw) = env::var("ARCHMAP_PROVIDER") {
            config.provider = parse_provider(&raw)?;
            config.model = default_model(config.provider);
        }
        if let Ok(model) = env::var("ARCHMAP_MODEL") {
            config.model = model;
        }
        config.api_base_url = env::var("ARCHMAP_API_BASE_URL").ok();
        if let Some(v) = env_parse("ARCHMAP_REQUEST_TIMEOUT")? {
            config.request_timeout_secs = v;
        }
        if let Ok(level) = env::var("ARCHMAP_LOG_LEVEL") {
            config.log_level = level.to_lowercase();
        }
        if let Some(v) = env_parse("ARCHMAP_CACHE_ENABLED")? {
            config.cache_enabled = v;
        }
        if let Some(v) = env_parse("ARCHMAP_CONFIDENCE_THRESHOLD")? {
            config.confidence_threshold = v;
        }
        if let Some(v) = env_parse("ARCHMAP_ANALYSIS_EXCERPT")? {
            config.analysis_excerpt_chars = v;
        }
        if let Some(v) = env_parse("ARCHMAP_DETECTION_EXCERPT")? {
            config.detection_excerpt_chars = v;
        }
        if let Ok(marker) = env::var("ARCHMAP_ROOT_MARKER") {
            config.root_marker = marker;
        }
        if let Some(v) = env_parse("ARCHMAP_CONCURRENCY")? {
            config.concurrency = v;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 3600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 1 hour".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::ValidationFailed(format!(
                "Confidence threshold must be within 0.0..=1.0, got {}",
                self.confidence_threshold
            )));
        }

        if self.analysis_excerpt_chars < 100 || self.detection_excerpt_chars < 100 {
            return Err(ConfigError::ValidationFailed(
                "Excerpt lengths must be at least 100 characters".to_string(),
            ));
        }
        if self.analysis_excerpt_chars > 32_000 || self.detection_excerpt_chars > 32_000 {
            return Err(ConfigError::ValidationFailed(
                "Excerpt lengths cannot exceed 32000 characters".to_string(),
            ));
        }

        if self.concurrency == 0 || self.concurrency > 64 {
            return Err(ConfigError::ValidationFailed(
                "Concurrency must be between 1 and 64".to_string(),
            ));
        }

        if self.root_marker.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Root marker cannot be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Name of the environment variable holding the provider's API key, if
    /// the provider needs one.
    pub fn credential_var(&self) -> Option<&'static str> {
        match self.provider {
            AdapterKind::Ollama => None,
            provider => provider.default_key_env_name(),
        }
    }

    /// Fails with `MissingCredential` when the provider needs a key that is
    /// not set.
    pub fn require_credential(&self) -> Result<Option<String>, ConfigError> {
        match self.credential_var() {
            None => Ok(None),
            Some(var) => match env::var(var) {
                Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
                _ => Err(ConfigError::MissingCredential(var.to_string())),
            },
        }
    }

    pub fn to_display_map(&self) -> std::collections::BTreeMap<String, String> {
        let mut map = std::collections::BTreeMap::new();

        map.insert("provider".to_string(), self.provider.as_str().to_string());
        map.insert("model".to_string(), self.model.clone());
        if let Some(ref url) = self.api_base_url {
            map.insert("api_base_url".to_string(), url.clone());
        }
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());
        map.insert("cache_enabled".to_string(), self.cache_enabled.to_string());
        map.insert(
            "confidence_threshold".to_string(),
            self.confidence_threshold.to_string(),
        );
        map.insert(
            "analysis_excerpt_chars".to_string(),
            self.analysis_excerpt_chars.to_string(),
        );
        map.insert(
            "detection_excerpt_chars".to_string(),
            self.detection_excerpt_chars.to_string(),
        );
        map.insert("root_marker".to_string(), self.root_marker.clone());
        map.insert("concurrency".to_string(), self.concurrency.to_string());

        map
    }
}

impl fmt::Display for ArchmapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Archmap Configuration:")?;
        writeln!(f, "  Provider: {}", self.provider.as_str())?;
        writeln!(f, "  Model: {}", self.model)?;
        if let Some(ref url) = self.api_base_url {
            writeln!(f, "  API Base URL: {}", url)?;
        }
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  Cache Enabled: {}", self.cache_enabled)?;
        writeln!(f, "  Confidence Threshold: {}", self.confidence_threshold)?;
        writeln!(
            f,
            "  Excerpts: analysis={} detection={} chars",
            self.analysis_excerpt_chars, self.detection_excerpt_chars
        )?;
        writeln!(f, "  Root Marker: {}", self.root_marker)?;
        writeln!(f, "  Concurrency: {}", self.concurrency)?;
        Ok(())
    }
}
