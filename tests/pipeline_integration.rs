//! End-to-end pipeline tests driven by MockLLMClient
//!
//! No network access: an exhausted mock answers every request with an error,
//! which exercises the deterministic fallbacks.

use archmap::llm::{MockLLMClient, MockResponse};
use archmap::output::{write_artifacts, DIAGRAM_FILE, REPORT_FILE};
use archmap::pipeline::PipelineConfig;
use archmap::{
    AnalysisService, ArchitectureReport, BackendError, ComponentRole, PipelineError, Relationship,
    RelationshipKind,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use yare::parameterized;

const GATEWAY_SRC: &str = r#"from flask import Flask, request
import requests

app = Flask(__name__)

@app.route('/api/users/<user_id>')
def get_user(user_id):
    token = request.headers.get('Authorization')
    auth_response = requests.get('http://auth-service/validate', headers={'Authorization': token})
    if auth_response.status_code != 200:
        return {'error': 'Unauthorized'}, 401
    return requests.get(f'http://user-service/users/{user_id}').json()
"#;

const AUTH_SRC: &str = r#"import jwt
from flask import Flask, request

app = Flask(__name__)
SECRET_KEY = "your-secret-key"

@app.route('/validate')
def validate_token():
    token = request.headers.get('Authorization')
    try:
        jwt.decode(token, SECRET_KEY, algorithms=['HS256'])
        return {'valid': True}
    except jwt.InvalidTokenError:
        return {'valid': False}, 401
"#;

const QUEUE_SRC: &str = r#"import pika

connection = pika.BlockingConnection(pika.ConnectionParameters('localhost'))
channel = connection.channel()
channel.queue_declare(queue='notifications')
"#;

const USER_SRC: &str = r#"from flask import Flask
import psycopg2

app = Flask(__name__)
db = psycopg2.connect("dbname=users")

@app.route('/users/<user_id>')
def get_user(user_id):
    cursor = db.cursor()
    cursor.execute("SELECT * FROM users WHERE id = %s", (user_id,))
    return {'user': cursor.fetchone()}
"#;

/// Writes the four-service sample under `<tmp>/<root_name>/`.
fn create_project(root_name: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join(root_name);
    fs::create_dir_all(&root).unwrap();

    fs::write(root.join("api_gateway.py"), GATEWAY_SRC).unwrap();
    fs::write(root.join("auth_service.py"), AUTH_SRC).unwrap();
    fs::write(root.join("notification_queue.py"), QUEUE_SRC).unwrap();
    fs::write(root.join("user_service.py"), USER_SRC).unwrap();

    (temp_dir, root)
}

fn service(mock: Arc<MockLLMClient>, config: PipelineConfig) -> AnalysisService {
    AnalysisService::new(mock, config.with_concurrency(1))
}

fn has_edge(report: &ArchitectureReport, from: &str, to: &str, kind: RelationshipKind) -> bool {
    report
        .relationships
        .contains(&Relationship::new(from, to, kind))
}

#[tokio::test]
async fn test_fallback_pipeline_over_sample_project() {
    let (_temp, root) = create_project("complex_project");
    let mock = Arc::new(MockLLMClient::new());

    let report = service(mock.clone(), PipelineConfig::default())
        .analyze(&root)
        .await
        .unwrap();

    let roles: Vec<(&str, ComponentRole)> = report
        .components
        .iter()
        .map(|(name, role)| (name.as_str(), *role))
        .collect();
    assert_eq!(
        roles,
        vec![
            ("api_gateway", ComponentRole::Gateway),
            ("auth_service", ComponentRole::Auth),
            ("cache_layer", ComponentRole::Cache),
            ("database_layer", ComponentRole::Database),
            ("frontend_layer", ComponentRole::Frontend),
            ("notification_queue", ComponentRole::Queue),
            ("user_service", ComponentRole::Service),
        ]
    );

    assert_eq!(report.relationships.len(), 11);
    assert!(has_edge(&report, "api_gateway", "user_service", RelationshipKind::Routes));
    assert!(has_edge(&report, "api_gateway", "auth_service", RelationshipKind::Routes));
    assert!(has_edge(&report, "frontend_layer", "user_service", RelationshipKind::Calls));
    assert!(has_edge(&report, "user_service", "database_layer", RelationshipKind::Uses));
    assert!(has_edge(&report, "auth_service", "cache_layer", RelationshipKind::Uses));
    assert!(has_edge(
        &report,
        "user_service",
        "notification_queue",
        RelationshipKind::Publishes
    ));
    assert!(has_edge(
        &report,
        "user_service",
        "auth_service",
        RelationshipKind::Authenticates
    ));
    for rel in &report.relationships {
        assert!(report.components.contains_key(&rel.from));
        assert!(report.components.contains_key(&rel.to));
    }

    assert!(report.diagram.starts_with("flowchart TB"));
    assert!(report.diagram.contains("    subgraph Gateway_Layer"));
    assert!(report.diagram.contains("        user_service[\"user_service\"]"));
    assert!(report.diagram.contains("    api_gateway --> user_service"));

    // 4 scan + 4 detect + relate + render, every one failed over
    assert_eq!(mock.call_count(), 10);
}

#[tokio::test]
async fn test_classifier_answers_are_used_when_valid() {
    let (_temp, root) = create_project("shop");
    let mock = Arc::new(MockLLMClient::new());

    let scan = json!({"type": "web", "framework": "flask", "patterns": ["rest"]});
    mock.add_responses([
        MockResponse::json(scan.clone()),
        MockResponse::json(scan.clone()),
        MockResponse::json(scan.clone()),
        MockResponse::json(scan),
        MockResponse::text(r#"{"component": "gateway", "confidence": 0.95}"#),
        MockResponse::text(r#"Sure! {"component": "Auth", "confidence": "0.9"}"#),
        MockResponse::text(r#"{"component": "queue", "confidence": 0.8}"#),
        // Below the threshold: filename rules decide
        MockResponse::text(r#"{"component": "database", "confidence": 0.3}"#),
        MockResponse::json(json!([
            {"from": "shop_api_gateway", "to": "shop_user_service", "type": "ROUTES"},
            {"from": "shop_user_service", "to": "shop_notification_queue", "type": "publishes"},
            {"from": "shop_user_service", "to": "ghost", "type": "uses"}
        ])),
        MockResponse::text(
            "```mermaid\nflowchart LR\n    shop_api_gateway --> shop_user_service\n    shop_user_service --> shop_notification_queue\n```",
        ),
    ]);

    let report = service(mock.clone(), PipelineConfig::default())
        .analyze(&root)
        .await
        .unwrap();

    assert_eq!(report.components["shop_api_gateway"], ComponentRole::Gateway);
    assert_eq!(report.components["shop_auth_service"], ComponentRole::Auth);
    assert_eq!(report.components["shop_notification_queue"], ComponentRole::Queue);
    assert_eq!(report.components["shop_user_service"], ComponentRole::Service);
    assert_eq!(report.components.len(), 4);

    assert_eq!(
        report.relationships,
        vec![
            Relationship::new("shop_api_gateway", "shop_user_service", RelationshipKind::Routes),
            Relationship::new(
                "shop_user_service",
                "shop_notification_queue",
                RelationshipKind::Publishes
            ),
        ]
    );

    assert!(report.diagram.starts_with("flowchart LR"));
    assert!(!report.diagram.contains("```"));
    assert_eq!(mock.remaining_responses(), 0);

    let requests = mock.requests();
    assert_eq!(requests.len(), 10);
    assert_eq!(requests[0].max_tokens, Some(300));
    assert_eq!(requests[0].seed, Some(42));
    assert_eq!(requests[4].max_tokens, Some(200));
    assert_eq!(requests[8].max_tokens, Some(800));
    assert_eq!(requests[8].seed, None);
    assert_eq!(requests[9].max_tokens, Some(1000));
    assert!(requests.iter().all(|r| r.temperature == Some(0.0)));
}

#[tokio::test]
async fn test_unusable_diagram_falls_back_to_template() {
    let (_temp, root) = create_project("shop");
    let mock = Arc::new(MockLLMClient::new());

    let mut responses: Vec<MockResponse> = (0..8)
        .map(|_| MockResponse::error(BackendError::NetworkError {
                message: "offline".to_string(),
            }))
        .collect();
    responses.push(MockResponse::json(json!([
        {"from": "shop_api_gateway", "to": "shop_auth_service", "type": "routes"}
    ])));
    responses.push(MockResponse::text("graph TD\n  A --> B\n  B --> C"));
    mock.add_responses(responses);

    let report = service(mock, PipelineConfig::default())
        .analyze(&root)
        .await
        .unwrap();

    assert_eq!(report.relationships.len(), 1);
    assert_eq!(
        report.diagram,
        [
            "flowchart TB",
            "    subgraph Gateway_Layer",
            "        shop_api_gateway[\"shop_api_gateway\"]",
            "    end",
            "    subgraph Service_Layer",
            "        shop_auth_service[\"shop_auth_service\"]",
            "        shop_user_service[\"shop_user_service\"]",
            "    end",
            "    subgraph Data_Layer",
            "        shop_notification_queue[\"shop_notification_queue\"]",
            "    end",
            "    shop_api_gateway --> shop_auth_service",
        ]
        .join("\n")
    );
}

#[parameterized(
    gateway = { "api_gateway.py", ComponentRole::Gateway },
    api_prefix = { "apiserver.py", ComponentRole::Gateway },
    auth = { "auth_service.py", ComponentRole::Auth },
    repository = { "user_repository.py", ComponentRole::Database },
    cache = { "session_cache.py", ComponentRole::Cache },
    queue = { "notification_queue.py", ComponentRole::Queue },
    plain = { "billing.py", ComponentRole::Service },
)]
fn test_fallback_role_for_filename(file: &str, expected: ComponentRole) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("complex_project");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join(file), "print('hello from a component')\n").unwrap();

    let report = runtime
        .block_on(service(Arc::new(MockLLMClient::new()), PipelineConfig::default()).analyze(&root))
        .unwrap();

    let stem = Path::new(file).file_stem().unwrap().to_str().unwrap();
    assert_eq!(report.components[stem], expected);
}

#[tokio::test]
async fn test_frontend_directory_and_baseline_flag() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("webshop");
    fs::create_dir_all(root.join("frontend")).unwrap();
    fs::write(root.join("frontend/app.js"), "export const render = () => 'hello';\n").unwrap();
    fs::write(root.join("orders.go"), "package main\n\nfunc main() {}\n").unwrap();

    let without = service(Arc::new(MockLLMClient::new()), PipelineConfig::default())
        .analyze(&root)
        .await
        .unwrap();
    assert_eq!(without.components.len(), 2);
    assert_eq!(without.components["frontend_app"], ComponentRole::Frontend);
    assert_eq!(without.components["webshop_orders"], ComponentRole::Service);

    let with = service(
        Arc::new(MockLLMClient::new()),
        PipelineConfig::default().with_baseline_layers(true),
    )
    .analyze(&root)
    .await
    .unwrap();
    assert!(with.components.contains_key("cache_layer"));
    assert!(with.components.contains_key("database_layer"));
    assert!(with.components.contains_key("queue_layer"));
    assert!(!with.components.contains_key("frontend_layer"));
}

#[tokio::test]
async fn test_directories_above_the_root_do_not_affect_roles() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("ui").join("shop");
    fs::create_dir_all(root.join("orders")).unwrap();
    fs::write(
        root.join("orders/order_service.py"),
        "class OrderService:\n    pass\n",
    )
    .unwrap();

    let report = service(Arc::new(MockLLMClient::new()), PipelineConfig::default())
        .analyze(&root)
        .await
        .unwrap();

    assert_eq!(
        report.components.get("orders_order_service"),
        Some(&ComponentRole::Service)
    );
}

#[tokio::test]
async fn test_tiny_and_foreign_files_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("complex_project");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("empty.py"), "x = 1").unwrap();
    fs::write(root.join("notes.md"), "# A long enough markdown file\n").unwrap();

    let err = service(Arc::new(MockLLMClient::new()), PipelineConfig::default())
        .analyze(&root)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NoFiles(_))
    ));
}

#[tokio::test]
async fn test_missing_root_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let err = service(Arc::new(MockLLMClient::new()), PipelineConfig::default())
        .analyze(&temp_dir.path().join("nope"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::InvalidRoot(_))
    ));
}

#[tokio::test]
async fn test_artifacts_round_trip_through_disk() {
    let (_temp, root) = create_project("complex_project");
    let out = TempDir::new().unwrap();

    let report = service(Arc::new(MockLLMClient::new()), PipelineConfig::default())
        .analyze(&root)
        .await
        .unwrap();
    write_artifacts(&report, out.path()).unwrap();

    let diagram = fs::read_to_string(out.path().join(DIAGRAM_FILE)).unwrap();
    assert_eq!(diagram, report.diagram);

    let stored: ArchitectureReport =
        serde_json::from_str(&fs::read_to_string(out.path().join(REPORT_FILE)).unwrap()).unwrap();
    assert_eq!(stored, report);
}
