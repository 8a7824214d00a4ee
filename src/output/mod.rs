//! Persisted run artifacts

pub mod artifacts;
pub mod png;

pub use artifacts::{write_artifacts, WrittenArtifacts, DIAGRAM_FILE, IMAGE_FILE, REPORT_FILE};
pub use png::PngRenderer;
