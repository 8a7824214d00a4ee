use super::llm_helper::{decode_object, query_classifier};
use crate::cache::Fingerprint;
use crate::extract::excerpt;
use crate::llm::LLMRequest;
use crate::model::{ComponentMap, ComponentRole, FileRecord};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::state::{PipelineState, Stage, StageOutput};
use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DETECTION_MAX_TOKENS: u32 = 200;

pub struct DetectPhase;

#[async_trait]
impl WorkflowPhase for DetectPhase {
    fn stage(&self) -> Stage {
        Stage::Detect
    }

    async fn execute(
        &self,
        context: &PipelineContext,
        state: &PipelineState,
    ) -> Result<StageOutput> {
        let root = scan_root(&context.project_path);
        let pending: Vec<_> = state
            .files
            .iter()
            .map(|record| detect_role(context, &root, record))
            .collect();
        let roles: Vec<ComponentRole> = stream::iter(pending)
            .buffered(context.config.concurrency.max(1))
            .collect()
            .await;

        let mut components = ComponentMap::new();
        for (record, role) in state.files.iter().zip(roles) {
            let Some(name) = component_name(&record.path, &context.config.root_marker) else {
                warn!("Cannot derive a component name from {}", record.path.display());
                continue;
            };
            if let Some(previous) = components.insert(name.clone(), role) {
                debug!(
                    component = %name,
                    previous = %previous,
                    role = %role,
                    "Component name collision, keeping the later file"
                );
            }
        }

        let required = context.config.baseline_layers_required(
            &context.project_path,
            state.files.iter().map(|r| r.path.as_path()),
        );
        if required {
            let added = add_baseline_layers(&mut components);
            if !added.is_empty() {
                info!(added = ?added, "Added baseline layers");
            }
        }

        info!(components = components.len(), "Detection complete");
        Ok(StageOutput::Components(components))
    }
}

fn build_prompt(record: &FileRecord, max_chars: usize) -> String {
    let directory = record
        .path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let analysis = serde_json::to_string(&record.analysis).unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"Analyze this code and determine its architectural component type.

File: {path}
Directory: {directory}
Previous Analysis: {analysis}
Code: {code}

Component Types:
- gateway: API gateways, routing
- auth: Authentication, authorization
- service: Business logic, microservices
- database: Data storage, repositories
- cache: Caching layers
- queue: Message queues, async processing
- frontend: UI, web interfaces

Return ONLY a JSON object:
{{
    "component": "gateway|auth|service|database|cache|queue|frontend",
    "confidence": 0.9
}}"#,
        path = record.path.display(),
        code = excerpt(&record.content, max_chars),
    )
}

/// Reads `{component, confidence}` from a decoded answer. Confidence may
/// arrive as a number or a numeric string.
fn accepted_role(answer: &serde_json::Value, threshold: f64) -> Option<ComponentRole> {
    let component = answer.get("component")?.as_str()?;
    let confidence = match answer.get("confidence")? {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };

    if confidence <= threshold {
        debug!(component, confidence, threshold, "Rejecting low-confidence role");
        return None;
    }

    match component.parse::<ComponentRole>() {
        Ok(role) => Some(role),
        Err(e) => {
            warn!("Classifier proposed {}", e);
            None
        }
    }
}

/// The scan stage records canonical paths, so directory rules must compare
/// against the canonical root as well.
fn scan_root(project_path: &Path) -> PathBuf {
    std::fs::canonicalize(project_path).unwrap_or_else(|_| project_path.to_path_buf())
}

/// Role for one file: the classifier's answer when confident enough,
/// otherwise the filename rules.
pub async fn detect_role(
    context: &PipelineContext,
    root: &Path,
    record: &FileRecord,
) -> ComponentRole {
    let config = &context.config;
    let fingerprint = Fingerprint::for_file(
        Stage::Detect.as_str(),
        &record.path,
        record.content.chars().count(),
    );

    let role = context
        .cache
        .get_or_compute(&fingerprint, || async {
            let request = LLMRequest::prompt(build_prompt(record, config.detection_excerpt_chars))
                .with_temperature(0.0)
                .with_max_tokens(DETECTION_MAX_TOKENS)
                .with_seed(config.seed);

            let raw = query_classifier(context, Stage::Detect, &fingerprint, request).await?;
            let answer: serde_json::Value = decode_object(Stage::Detect, &raw)?;
            accepted_role(&answer, config.confidence_threshold)
        })
        .await;

    role.unwrap_or_else(|| {
        let role = fallback_role(&record.path, root);
        debug!(path = %record.path.display(), role = %role, "Using filename rules");
        role
    })
}

/// Filename and path rules, first match wins. Directory names are only
/// considered below `root`.
pub fn fallback_role(path: &Path, root: &Path) -> ComponentRole {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if stem.contains("gateway") || stem.contains("api") {
        ComponentRole::Gateway
    } else if stem.contains("auth") {
        ComponentRole::Auth
    } else if ["database", "db", "repository"].iter().any(|k| stem.contains(k)) {
        ComponentRole::Database
    } else if stem.contains("cache") {
        ComponentRole::Cache
    } else if stem.contains("queue") {
        ComponentRole::Queue
    } else if path
        .strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| matches!(c.as_os_str().to_str(), Some("frontend") | Some("ui")))
    {
        ComponentRole::Frontend
    } else {
        ComponentRole::Service
    }
}

/// `{parent}_{stem}`, or just the stem when the parent directory is the root
/// marker or the path has no parent.
pub fn component_name(path: &Path, root_marker: &str) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let parent = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy());

    match parent {
        Some(parent) if parent != root_marker => Some(format!("{}_{}", parent, stem)),
        _ => Some(stem.into_owned()),
    }
}

/// Adds `{role}_layer` for every baseline role no component has yet.
/// Returns the names that were added.
pub fn add_baseline_layers(components: &mut ComponentMap) -> Vec<String> {
    let mut added = Vec::new();

    for role in ComponentRole::BASELINE {
        if components.values().any(|r| *r == role) {
            continue;
        }
        let name = format!("{}_layer", role);
        if components.contains_key(&name) {
            warn!("Cannot add baseline layer {}: name already taken", name);
            continue;
        }
        components.insert(name.clone(), role);
        added.push(name);
    }

    added
}
