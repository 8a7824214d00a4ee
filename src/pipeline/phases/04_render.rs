use super::llm_helper::query_classifier;
use crate::cache::Fingerprint;
use crate::extract::strip_code_fences;
use crate::llm::LLMRequest;
use crate::model::{ComponentMap, Layer, Relationship};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::state::{PipelineState, Stage, StageOutput};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

const RENDER_MAX_TOKENS: u32 = 1000;
const DIAGRAM_HEADER: &str = "flowchart TB";

pub struct RenderPhase;

#[async_trait]
impl WorkflowPhase for RenderPhase {
    fn stage(&self) -> Stage {
        Stage::Render
    }

    async fn execute(
        &self,
        context: &PipelineContext,
        state: &PipelineState,
    ) -> Result<StageOutput> {
        let diagram = render_diagram(context, &state.components, &state.relationships).await;
        info!(lines = diagram.lines().count(), "Diagram rendered");
        Ok(StageOutput::Diagram(diagram))
    }
}

fn build_prompt(components: &ComponentMap, relationships: &[Relationship]) -> String {
    let components = serde_json::to_string_pretty(components).unwrap_or_else(|_| "{}".to_string());
    let relationships =
        serde_json::to_string_pretty(relationships).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Generate a clean Mermaid flowchart diagram for this architecture.

Components: {components}
Relationships: {relationships}

Requirements:
- Use "flowchart TB" direction
- Group components into subgraphs by layer (Gateway_Layer, Frontend_Layer, Service_Layer, Data_Layer)
- Use simple arrows: -->
- Clean node names with quotes

Return ONLY the Mermaid code, no explanations."#
    )
}

/// Mermaid node identifier for a component name: every character outside
/// `[A-Za-z0-9_]` becomes `_`.
pub fn node_id(name: &str) -> String {
    let id: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if id.is_empty() {
        "_".to_string()
    } else {
        id
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// True when `token` occurs in `text` with no identifier character directly
/// before or after it.
fn contains_token(text: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    text.match_indices(token).any(|(start, _)| {
        let end = start + token.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

fn mentions(diagram: &str, name: &str) -> bool {
    contains_token(diagram, name) || contains_token(diagram, &node_id(name))
}

/// One distinct node id per component. Names that sanitise to the same id
/// get `_2`, `_3`, ... in name order.
pub fn assign_node_ids(components: &ComponentMap) -> BTreeMap<&str, String> {
    let mut taken = HashSet::new();
    let mut ids = BTreeMap::new();

    for name in components.keys() {
        let base = node_id(name);
        let mut id = base.clone();
        let mut suffix = 2;
        while !taken.insert(id.clone()) {
            id = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        ids.insert(name.as_str(), id);
    }

    ids
}

/// A classifier diagram is usable when it is a flowchart of reasonable
/// length that mentions every relationship endpoint.
pub fn accept_diagram(diagram: &str, relationships: &[Relationship], min_chars: usize) -> bool {
    if !diagram.starts_with("flowchart") {
        debug!("Rejecting diagram without a flowchart header");
        return false;
    }
    if diagram.chars().count() < min_chars {
        debug!("Rejecting diagram shorter than {} chars", min_chars);
        return false;
    }
    let missing = relationships
        .iter()
        .flat_map(|r| [r.from.as_str(), r.to.as_str()])
        .find(|name| !mentions(diagram, name));
    if let Some(name) = missing {
        debug!(component = name, "Rejecting diagram missing a relationship endpoint");
        return false;
    }
    true
}

/// Mermaid source for the architecture: the classifier's diagram when it
/// passes validation, otherwise the layered template.
pub async fn render_diagram(
    context: &PipelineContext,
    components: &ComponentMap,
    relationships: &[Relationship],
) -> String {
    if components.is_empty() {
        return fallback_diagram(components, relationships);
    }

    let min_chars = context.config.min_diagram_chars;
    let fingerprint = Fingerprint::for_graph(Stage::Render.as_str(), components, relationships);

    let generated = context
        .cache
        .get_or_compute(&fingerprint, || async {
            let request = LLMRequest::prompt(build_prompt(components, relationships))
                .with_temperature(0.0)
                .with_max_tokens(RENDER_MAX_TOKENS);

            let raw = query_classifier(context, Stage::Render, &fingerprint, request).await?;
            let diagram = strip_code_fences(&raw);
            if accept_diagram(diagram, relationships, min_chars) {
                Some(diagram.to_string())
            } else {
                warn!("Generated diagram failed validation, using the template");
                None
            }
        })
        .await;

    generated.unwrap_or_else(|| fallback_diagram(components, relationships))
}

/// Layered template: one subgraph per non-empty layer, nodes in name order,
/// then one edge per relationship in input order.
pub fn fallback_diagram(components: &ComponentMap, relationships: &[Relationship]) -> String {
    let ids = assign_node_ids(components);
    let id_of = |name: &str| ids.get(name).cloned().unwrap_or_else(|| node_id(name));
    let mut lines = vec![DIAGRAM_HEADER.to_string()];

    for layer in Layer::ORDER {
        let members: Vec<&String> = components
            .iter()
            .filter(|(_, role)| role.layer() == layer)
            .map(|(name, _)| name)
            .collect();
        if members.is_empty() {
            continue;
        }

        lines.push(format!("    subgraph {}", layer.subgraph_name()));
        for name in members {
            lines.push(format!(
                "        {}[\"{}\"]",
                id_of(name),
                name.replace('"', "#quot;")
            ));
        }
        lines.push("    end".to_string());
    }

    for relationship in relationships {
        lines.push(format!(
            "    {} --> {}",
            id_of(&relationship.from),
            id_of(&relationship.to)
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLLMClient, MockResponse};
    use crate::model::{ComponentRole, RelationshipKind};
    use crate::pipeline::config::PipelineConfig;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn components(pairs: &[(&str, ComponentRole)]) -> ComponentMap {
        pairs.iter().map(|(n, r)| (n.to_string(), *r)).collect()
    }

    fn context(mock: Arc<MockLLMClient>) -> PipelineContext {
        PipelineContext::with_defaults(mock, PipelineConfig::default(), PathBuf::from("."))
    }

    fn sample() -> (ComponentMap, Vec<Relationship>) {
        let comps = components(&[
            ("api_gateway", ComponentRole::Gateway),
            ("user_service", ComponentRole::Service),
            ("auth_service", ComponentRole::Auth),
            ("cache_layer", ComponentRole::Cache),
        ]);
        let rels = vec![
            Relationship::new("api_gateway", "user_service", RelationshipKind::Routes),
            Relationship::new("user_service", "cache_layer", RelationshipKind::Uses),
        ];
        (comps, rels)
    }

    #[test]
    fn test_fallback_layout() {
        let (comps, rels) = sample();
        let diagram = fallback_diagram(&comps, &rels);

        let expected = [
            "flowchart TB",
            "    subgraph Gateway_Layer",
            "        api_gateway[\"api_gateway\"]",
            "    end",
            "    subgraph Service_Layer",
            "        auth_service[\"auth_service\"]",
            "        user_service[\"user_service\"]",
            "    end",
            "    subgraph Data_Layer",
            "        cache_layer[\"cache_layer\"]",
            "    end",
            "    api_gateway --> user_service",
            "    user_service --> cache_layer",
        ]
        .join("\n");

        assert_eq!(diagram, expected);
    }

    #[test]
    fn test_fallback_declares_every_endpoint() {
        let (comps, rels) = sample();
        let diagram = fallback_diagram(&comps, &rels);

        assert!(diagram.starts_with("flowchart"));
        for rel in &rels {
            assert!(diagram.contains(&format!("{}[", node_id(&rel.from))));
            assert!(diagram.contains(&format!("{}[", node_id(&rel.to))));
        }
    }

    #[test]
    fn test_node_ids_are_sanitised() {
        assert_eq!(node_id("web-app.v2"), "web_app_v2");
        assert_eq!(node_id("user_service"), "user_service");
        assert_eq!(node_id(""), "_");

        let comps = components(&[("my-ui", ComponentRole::Frontend)]);
        let diagram = fallback_diagram(&comps, &[]);
        assert!(diagram.contains("        my_ui[\"my-ui\"]"));
    }

    #[test]
    fn test_empty_graph_is_header_only() {
        assert_eq!(fallback_diagram(&ComponentMap::new(), &[]), "flowchart TB");
    }

    #[test]
    fn test_accept_diagram_rules() {
        let (_, rels) = sample();
        let good = "flowchart TB\n  api_gateway --> user_service\n  user_service --> cache_layer";

        assert!(accept_diagram(good, &rels, 20));
        assert!(!accept_diagram("graph TD\n  a --> b and more text", &[], 20));
        assert!(!accept_diagram("flowchart TB", &[], 20));
        assert!(!accept_diagram(
            "flowchart TB\n  api_gateway --> user_service",
            &rels,
            20
        ));
    }

    #[test]
    fn test_endpoints_must_appear_as_whole_identifiers() {
        let rels = vec![Relationship::new("svc", "svc_user", RelationshipKind::Calls)];

        assert!(!accept_diagram(
            "flowchart TB\n    gateway --> svc_user\n    svc_user --> db",
            &rels,
            20
        ));
        assert!(accept_diagram(
            "flowchart TB\n    svc[\"svc\"] --> svc_user",
            &rels,
            20
        ));
    }

    #[test]
    fn test_colliding_node_ids_stay_distinct() {
        let comps = components(&[
            ("svc_api_gateway", ComponentRole::Gateway),
            ("svc_user-service", ComponentRole::Service),
            ("svc_user_service", ComponentRole::Service),
        ]);
        let rels = vec![
            Relationship::new("svc_api_gateway", "svc_user-service", RelationshipKind::Routes),
            Relationship::new("svc_api_gateway", "svc_user_service", RelationshipKind::Routes),
        ];

        let diagram = fallback_diagram(&comps, &rels);

        assert!(diagram.contains("        svc_user_service[\"svc_user-service\"]"));
        assert!(diagram.contains("        svc_user_service_2[\"svc_user_service\"]"));
        assert!(diagram.contains("    svc_api_gateway --> svc_user_service\n"));
        assert!(diagram.ends_with("    svc_api_gateway --> svc_user_service_2"));
    }

    #[tokio::test]
    async fn test_fenced_diagram_is_accepted_and_cached() {
        let (comps, rels) = sample();
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text(
            "```mermaid\nflowchart TB\n    api_gateway --> user_service\n    user_service --> cache_layer\n```",
        ));
        let ctx = context(mock.clone());

        let first = render_diagram(&ctx, &comps, &rels).await;
        let second = render_diagram(&ctx, &comps, &rels).await;

        assert!(first.starts_with("flowchart TB"));
        assert!(!first.contains("```"));
        assert_eq!(first, second);
        assert_eq!(mock.call_count(), 1);

        let request = &mock.requests()[0];
        assert_eq!(request.max_tokens, Some(1000));
        assert_eq!(request.seed, None);
    }

    #[tokio::test]
    async fn test_invalid_diagram_falls_back() {
        let (comps, rels) = sample();
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text("Here is your diagram: A -> B"));
        let ctx = context(mock);

        let diagram = render_diagram(&ctx, &comps, &rels).await;
        assert_eq!(diagram, fallback_diagram(&comps, &rels));
        assert!(ctx.cache.is_empty());
    }
}
