//! Output formatting for multiple formats
//!
//! Formatters for the analysis report and the effective configuration:
//! JSON, YAML, raw Mermaid source, and human-readable text.
//!
//! # Example
//!
//! ```ignore
//! use archmap::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! let output = formatter.format(&report)?;
//! println!("{}", output);
//! ```

use anyhow::{Context, Result};

use crate::config::ArchmapConfig;
use crate::model::{ArchitectureReport, ComponentRole};

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Raw Mermaid diagram source
    Mermaid,
    /// Human-readable formatted text
    Human,
}

/// Output formatter for analysis reports
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, report: &ArchitectureReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize report to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize report to YAML")
            }
            OutputFormat::Mermaid => Ok(report.diagram.clone()),
            OutputFormat::Human => Ok(self.format_human(report)),
        }
    }

    /// Formats configuration display. Mermaid has no meaning here and falls
    /// back to the human form.
    pub fn format_config(&self, config: &ArchmapConfig) -> Result<String> {
        let config_map = config.to_display_map();
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&config_map)
                .context("Failed to serialize config to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&config_map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Mermaid | OutputFormat::Human => Ok(config.to_string()),
        }
    }

    fn format_human(&self, report: &ArchitectureReport) -> String {
        let mut output = String::new();

        output.push_str("\u{2713} Architecture Analysis\n");
        output.push_str(&"\u{2501}".repeat(42));
        output.push_str("\n\n");

        output.push_str(&format!("Components ({}):\n", report.components.len()));
        for role in ComponentRole::ALL {
            let names: Vec<&str> = report
                .components
                .iter()
                .filter(|(_, r)| **r == role)
                .map(|(name, _)| name.as_str())
                .collect();
            if names.is_empty() {
                continue;
            }
            output.push_str(&format!("\u{251C}\u{2500} {:<9} {}\n", role, names.join(", ")));
        }
        output.push('\n');

        output.push_str(&format!("Relationships ({}):\n", report.relationships.len()));
        for (i, rel) in report.relationships.iter().enumerate() {
            let connector = if i + 1 == report.relationships.len() {
                "\u{2514}"
            } else {
                "\u{251C}"
            };
            output.push_str(&format!(
                "{}\u{2500} {} \u{2192} {} ({})\n",
                connector, rel.from, rel.to, rel.kind
            ));
        }
        if report.relationships.is_empty() {
            output.push_str("\u{2514}\u{2500} (none)\n");
        }
        output.push('\n');

        output.push_str(&format!(
            "Diagram: {} line(s) of Mermaid\n",
            report.diagram.lines().count()
        ));

        output
    }
}
