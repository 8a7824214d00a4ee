use crate::config::ArchmapConfig;
use crate::llm::openai_compatible::{GROQ_ENDPOINT, OLLAMA_ENDPOINT, OPENAI_ENDPOINT};
use crate::llm::{GenAIClient, LLMClient, OpenAICompatibleClient};
use anyhow::{Context, Result};
use genai::adapter::AdapterKind;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct SelectedClient {
    pub client: Arc<dyn LLMClient>,
    pub provider: AdapterKind,
    pub description: String,
}

/// Builds the classifier client for the configured provider.
///
/// Groq, OpenAI and Ollama are reached through the OpenAI-compatible HTTP
/// client so that the request seed is forwarded. Every other provider goes
/// through genai. A missing API key is an error.
pub fn select_llm_client(config: &ArchmapConfig) -> Result<SelectedClient> {
    let provider = config.provider;
    let api_key = config
        .require_credential()
        .context("Classifier credentials are not configured")?;
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let client: Arc<dyn LLMClient> = match openai_compatible_endpoint(provider) {
        Some(default_endpoint) => {
            let endpoint = config
                .api_base_url
                .clone()
                .unwrap_or(default_endpoint);
            debug!("Using OpenAI-compatible endpoint {} for {}", endpoint, provider);
            Arc::new(OpenAICompatibleClient::new(
                provider.as_str(),
                endpoint,
                config.model.clone(),
                api_key,
                timeout,
            )?)
        }
        None => Arc::new(GenAIClient::new(
            provider,
            config.model.clone(),
            timeout,
            config.api_base_url.clone(),
        )),
    };

    let description = format!("{} ({})", provider, config.model);
    info!("Using classifier: {}", description);

    Ok(SelectedClient {
        client,
        provider,
        description,
    })
}

fn openai_compatible_endpoint(provider: AdapterKind) -> Option<String> {
    match provider {
        AdapterKind::Groq => Some(GROQ_ENDPOINT.to_string()),
        AdapterKind::OpenAI => Some(OPENAI_ENDPOINT.to_string()),
        AdapterKind::Ollama => Some(
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| OLLAMA_ENDPOINT.to_string()),
        ),
        _ => None,
    }
}
