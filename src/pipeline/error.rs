use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No analyzable source files found under {}", .0.display())]
    NoFiles(PathBuf),

    #[error("Project path is not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("Failed to scan {}: {message}", path.display())]
    Scan { path: PathBuf, message: String },
}
