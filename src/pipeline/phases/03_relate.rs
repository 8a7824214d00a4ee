use super::llm_helper::{decode_array, query_classifier};
use crate::cache::Fingerprint;
use crate::llm::LLMRequest;
use crate::model::{ComponentMap, ComponentRole, Relationship, RelationshipKind};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::state::{PipelineState, Stage, StageOutput};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

const RELATE_MAX_TOKENS: u32 = 800;

pub struct RelatePhase;

#[async_trait]
impl WorkflowPhase for RelatePhase {
    fn stage(&self) -> Stage {
        Stage::Relate
    }

    async fn execute(
        &self,
        context: &PipelineContext,
        state: &PipelineState,
    ) -> Result<StageOutput> {
        let relationships = infer_relationships(context, &state.components).await;
        info!(relationships = relationships.len(), "Relationship inference complete");
        Ok(StageOutput::Relationships(relationships))
    }
}

fn build_prompt(components: &ComponentMap) -> String {
    let listing = serde_json::to_string_pretty(components).unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"Analyze these architectural components and find their relationships.

Components: {listing}

Return ONLY a JSON array of relationships:
[
    {{
        "from": "component_name",
        "to": "component_name",
        "type": "routes|calls|uses|publishes|authenticates"
    }}
]

Rules:
- Gateways route to services
- Frontends call services
- Services use databases/caches
- Services publish to queues
- Services authenticate via auth services"#
    )
}

/// Keeps the well-formed edges whose endpoints are both known components.
pub fn validate_edges(candidates: &[Value], components: &ComponentMap) -> Vec<Relationship> {
    let mut valid = Vec::new();

    for candidate in candidates {
        let Some(relationship) = parse_edge(candidate) else {
            debug!(edge = %candidate, "Dropping malformed edge");
            continue;
        };
        if !relationship.endpoints_known(components) {
            debug!(
                from = %relationship.from,
                to = %relationship.to,
                "Dropping edge with unknown endpoint"
            );
            continue;
        }
        valid.push(relationship);
    }

    valid
}

fn parse_edge(candidate: &Value) -> Option<Relationship> {
    let from = candidate.get("from")?.as_str()?;
    let to = candidate.get("to")?.as_str()?;
    let kind = candidate.get("type")?.as_str()?.trim().to_lowercase();
    let kind: RelationshipKind = serde_json::from_value(Value::String(kind)).ok()?;
    Some(Relationship::new(from, to, kind))
}

/// Typed edges between `components`: the classifier's proposal when at least
/// one edge survives validation, otherwise the rule table.
pub async fn infer_relationships(
    context: &PipelineContext,
    components: &ComponentMap,
) -> Vec<Relationship> {
    if components.is_empty() {
        return Vec::new();
    }

    let fingerprint = Fingerprint::for_components(Stage::Relate.as_str(), components);

    let proposed = context
        .cache
        .get_or_compute(&fingerprint, || async {
            let request = LLMRequest::prompt(build_prompt(components))
                .with_temperature(0.0)
                .with_max_tokens(RELATE_MAX_TOKENS);

            let raw = query_classifier(context, Stage::Relate, &fingerprint, request).await?;
            let candidates = decode_array(Stage::Relate, &raw)?;
            let valid = validate_edges(&candidates, components);
            if valid.is_empty() {
                warn!(
                    proposed = candidates.len(),
                    "No proposed relationship survived validation"
                );
                return None;
            }
            Some(valid)
        })
        .await;

    proposed.unwrap_or_else(|| {
        let edges = fallback_relationships(components);
        debug!(edges = edges.len(), "Using relationship rules");
        edges
    })
}

fn names_with(components: &ComponentMap, roles: &[ComponentRole]) -> Vec<String> {
    components
        .iter()
        .filter(|(_, role)| roles.contains(role))
        .map(|(name, _)| name.clone())
        .collect()
}

/// Rule table over the roles:
/// gateway routes to service and auth, frontend calls service and auth,
/// service and auth use databases and caches and publish to queues,
/// services authenticate via auth.
pub fn fallback_relationships(components: &ComponentMap) -> Vec<Relationship> {
    let gateways = names_with(components, &[ComponentRole::Gateway]);
    let frontends = names_with(components, &[ComponentRole::Frontend]);
    let services = names_with(components, &[ComponentRole::Service]);
    let auths = names_with(components, &[ComponentRole::Auth]);
    let databases = names_with(components, &[ComponentRole::Database]);
    let caches = names_with(components, &[ComponentRole::Cache]);
    let queues = names_with(components, &[ComponentRole::Queue]);

    let backends: Vec<&String> = services.iter().chain(auths.iter()).collect();
    let mut edges = Vec::new();

    for gateway in &gateways {
        for target in &backends {
            edges.push(Relationship::new(gateway.as_str(), target.as_str(), RelationshipKind::Routes));
        }
    }

    for frontend in &frontends {
        for target in &backends {
            edges.push(Relationship::new(frontend.as_str(), target.as_str(), RelationshipKind::Calls));
        }
    }

    for backend in &backends {
        for store in databases.iter().chain(caches.iter()) {
            edges.push(Relationship::new(backend.as_str(), store.as_str(), RelationshipKind::Uses));
        }
        for queue in &queues {
            edges.push(Relationship::new(backend.as_str(), queue.as_str(), RelationshipKind::Publishes));
        }
    }

    for auth in &auths {
        for service in services.iter().filter(|s| *s != auth) {
            edges.push(Relationship::new(
                service.as_str(),
                auth.as_str(),
                RelationshipKind::Authenticates,
            ));
        }
    }

    edges
}
