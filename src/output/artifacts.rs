use crate::model::ArchitectureReport;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DIAGRAM_FILE: &str = "architecture.mmd";
pub const REPORT_FILE: &str = "architecture.json";
pub const IMAGE_FILE: &str = "architecture.png";

/// Paths of the artifacts written for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub diagram: PathBuf,
    pub report: PathBuf,
}

/// Writes the Mermaid source and the structured report into `output_dir`,
/// creating the directory if needed.
pub fn write_artifacts(report: &ArchitectureReport, output_dir: &Path) -> Result<WrittenArtifacts> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let diagram = output_dir.join(DIAGRAM_FILE);
    fs::write(&diagram, &report.diagram)
        .with_context(|| format!("Failed to write {}", diagram.display()))?;

    let report_path = output_dir.join(REPORT_FILE);
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(&report_path, json)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    info!(
        diagram = %diagram.display(),
        report = %report_path.display(),
        "Artifacts written"
    );

    Ok(WrittenArtifacts {
        diagram,
        report: report_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComponentMap, ComponentRole};
    use tempfile::TempDir;

    #[test]
    fn test_writes_both_artifacts() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("nested/out");
        let mut components = ComponentMap::new();
        components.insert("gw".to_string(), ComponentRole::Gateway);
        let report = ArchitectureReport {
            components,
            relationships: vec![],
            diagram: "flowchart TB\n    subgraph Gateway_Layer".to_string(),
        };

        let written = write_artifacts(&report, &out).unwrap();

        assert_eq!(fs::read_to_string(&written.diagram).unwrap(), report.diagram);
        let parsed: ArchitectureReport =
            serde_json::from_str(&fs::read_to_string(&written.report).unwrap()).unwrap();
        assert_eq!(parsed, report);
    }
}
