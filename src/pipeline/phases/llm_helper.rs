use crate::cache::Fingerprint;
use crate::extract::{extract_array, extract_object};
use crate::llm::LLMRequest;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::state::Stage;
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::{debug, warn};

/// Sends `request` to the classifier and returns the raw answer text.
///
/// Transport errors and timeouts are logged and turned into `None` so the
/// calling stage can fall back. Every exchange goes to the transcript.
pub async fn query_classifier(
    context: &PipelineContext,
    stage: Stage,
    fingerprint: &Fingerprint,
    request: LLMRequest,
) -> Option<String> {
    let prompt = request
        .messages
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();

    debug!(
        stage = stage.as_str(),
        fingerprint = fingerprint.as_str(),
        "Querying classifier"
    );

    let start = Instant::now();
    let result = context.llm_client.chat(request).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(response) => {
            debug!(
                stage = stage.as_str(),
                latency_ms,
                chars = response.content.len(),
                "Classifier answered"
            );
            context.transcript.log_exchange(
                stage.as_str(),
                fingerprint.as_str(),
                &prompt,
                Ok(&response.content),
                latency_ms,
            );
            Some(response.content)
        }
        Err(e) => {
            warn!("Classifier call failed during {} ({}): {}", stage, fingerprint, e);
            context.transcript.log_exchange(
                stage.as_str(),
                fingerprint.as_str(),
                &prompt,
                Err(e.to_string()),
                latency_ms,
            );
            None
        }
    }
}

/// Decodes the first JSON object found in `raw`.
pub fn decode_object<T: DeserializeOwned>(stage: Stage, raw: &str) -> Option<T> {
    let json = match extract_object(raw) {
        Ok(json) => json,
        Err(e) => {
            warn!("No usable object in {} response: {}", stage, e);
            return None;
        }
    };

    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to decode {} response: {}", stage, e);
            None
        }
    }
}

/// Decodes the first JSON array found in `raw` into loosely-typed elements,
/// so callers can drop malformed entries one at a time.
pub fn decode_array(stage: Stage, raw: &str) -> Option<Vec<serde_json::Value>> {
    let json = match extract_array(raw) {
        Ok(json) => json,
        Err(e) => {
            warn!("No usable array in {} response: {}", stage, e);
            return None;
        }
    };

    match serde_json::from_str(&json) {
        Ok(values) => Some(values),
        Err(e) => {
            warn!("Failed to decode {} response: {}", stage, e);
            None
        }
    }
}
