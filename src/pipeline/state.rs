use crate::model::{ArchitectureReport, ComponentMap, FileRecord, Relationship};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Scan,
    Detect,
    Relate,
    Render,
}

impl Stage {
    pub const ORDER: [Stage; 4] = [Stage::Scan, Stage::Detect, Stage::Relate, Stage::Render];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Scan => "scan",
            Stage::Detect => "detect",
            Stage::Relate => "relate",
            Stage::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial update produced by one stage
#[derive(Debug, Clone)]
pub enum StageOutput {
    Files(Vec<FileRecord>),
    Components(ComponentMap),
    Relationships(Vec<Relationship>),
    Diagram(String),
}

/// Data threaded through the stages
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub files: Vec<FileRecord>,
    pub components: ComponentMap,
    pub relationships: Vec<Relationship>,
    pub diagram: String,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, output: StageOutput) {
        match output {
            StageOutput::Files(files) => self.files = files,
            StageOutput::Components(components) => {
                self.components = components;
                // File contents are only needed up to detection.
                self.files.clear();
            }
            StageOutput::Relationships(relationships) => self.relationships = relationships,
            StageOutput::Diagram(diagram) => self.diagram = diagram,
        }
    }

    pub fn into_report(self) -> ArchitectureReport {
        ArchitectureReport {
            components: self.components,
            relationships: self.relationships,
            diagram: self.diagram,
        }
    }
}
