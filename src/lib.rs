//! archmap - AI-assisted architecture mapping for source trees
//!
//! Classifies the files of a project into architectural roles, infers typed
//! relationships between the resulting components and renders a Mermaid
//! flowchart. Every classifier-backed step has a deterministic fallback, so a
//! run always produces a complete report even when the model is unreachable
//! or answers nonsense.
//!
//! # Project Structure
//!
//! - [`pipeline`]: the Scan, Detect, Relate and Render stages and their orchestrator
//! - [`llm`]: classifier client trait, HTTP backends and the test double
//! - [`extract`]: recovery of JSON payloads from free-form model output
//! - [`cache`]: run-scoped response cache keyed by stage fingerprints
//! - [`model`]: components, roles, relationships and the report
//! - [`output`]: artifact writing and PNG rendering
//! - [`cli`]: command-line parsing and output formatting

pub mod cache;
pub mod cli;
pub mod config;
pub mod extract;
pub mod llm;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod service;
pub mod util;

pub use cache::{Fingerprint, ResponseCache};
pub use config::{ArchmapConfig, ConfigError};
pub use extract::ExtractError;
pub use llm::{BackendError, LLMClient, MockLLMClient, MockResponse};
pub use model::{
    ArchitectureReport, ComponentMap, ComponentRole, FileAnalysis, Relationship, RelationshipKind,
};
pub use pipeline::{PipelineConfig, PipelineContext, PipelineError, PipelineOrchestrator};
pub use service::AnalysisService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
