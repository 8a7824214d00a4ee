//! Architecture model shared by every pipeline stage

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Architectural role of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentRole {
    Gateway,
    Auth,
    Service,
    Database,
    Cache,
    Queue,
    Frontend,
}

impl ComponentRole {
    pub const ALL: [ComponentRole; 7] = [
        ComponentRole::Gateway,
        ComponentRole::Auth,
        ComponentRole::Service,
        ComponentRole::Database,
        ComponentRole::Cache,
        ComponentRole::Queue,
        ComponentRole::Frontend,
    ];

    /// Infrastructure roles a complete reference architecture always shows
    pub const BASELINE: [ComponentRole; 4] = [
        ComponentRole::Cache,
        ComponentRole::Database,
        ComponentRole::Queue,
        ComponentRole::Frontend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentRole::Gateway => "gateway",
            ComponentRole::Auth => "auth",
            ComponentRole::Service => "service",
            ComponentRole::Database => "database",
            ComponentRole::Cache => "cache",
            ComponentRole::Queue => "queue",
            ComponentRole::Frontend => "frontend",
        }
    }

    pub fn layer(&self) -> Layer {
        match self {
            ComponentRole::Gateway => Layer::Gateway,
            ComponentRole::Frontend => Layer::Frontend,
            ComponentRole::Service | ComponentRole::Auth => Layer::Service,
            ComponentRole::Database | ComponentRole::Cache | ComponentRole::Queue => Layer::Data,
        }
    }
}

impl fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        ComponentRole::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| format!("unknown component role: {}", s))
    }
}

/// Diagram grouping of roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Gateway,
    Frontend,
    Service,
    Data,
}

impl Layer {
    /// Render order of the subgraphs
    pub const ORDER: [Layer; 4] = [Layer::Gateway, Layer::Frontend, Layer::Service, Layer::Data];

    pub fn subgraph_name(&self) -> &'static str {
        match self {
            Layer::Gateway => "Gateway_Layer",
            Layer::Frontend => "Frontend_Layer",
            Layer::Service => "Service_Layer",
            Layer::Data => "Data_Layer",
        }
    }
}

/// Component name to role. Ordered by name so that everything derived from it
/// (fallback edges, fingerprints, diagrams) is reproducible.
pub type ComponentMap = BTreeMap<String, ComponentRole>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Routes,
    Calls,
    Uses,
    Publishes,
    Authenticates,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Routes => "routes",
            RelationshipKind::Calls => "calls",
            RelationshipKind::Uses => "uses",
            RelationshipKind::Publishes => "publishes",
            RelationshipKind::Authenticates => "authenticates",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed, typed edge between two components
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
}

impl Relationship {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: RelationshipKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
        }
    }

    pub fn endpoints_known(&self, components: &ComponentMap) -> bool {
        components.contains_key(&self.from) && components.contains_key(&self.to)
    }
}

/// Coarse, best-effort description of one file. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub patterns: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl FileAnalysis {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.framework.is_none() && self.patterns.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub content: String,
    pub analysis: FileAnalysis,
}

/// The structured result of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureReport {
    pub components: ComponentMap,
    pub relationships: Vec<Relationship>,
    pub diagram: String,
}
