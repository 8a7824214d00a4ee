//! High-level entry point that wires a classifier client into a pipeline run
//!
//! # Example
//!
//! ```no_run
//! use archmap::service::AnalysisService;
//! use archmap::llm::MockLLMClient;
//! use archmap::pipeline::PipelineConfig;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let service = AnalysisService::new(Arc::new(MockLLMClient::new()), PipelineConfig::default());
//! let report = service.analyze(Path::new("sample_project")).await?;
//! println!("{}", report.diagram);
//! # Ok(())
//! # }
//! ```

use crate::cache::ResponseCache;
use crate::llm::{LLMClient, TranscriptLogger};
use crate::model::ArchitectureReport;
use crate::pipeline::{PipelineConfig, PipelineContext, PipelineOrchestrator};
use crate::progress::ProgressHandler;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub struct AnalysisService {
    client: Arc<dyn LLMClient>,
    config: PipelineConfig,
    cache_enabled: bool,
    transcript_path: Option<PathBuf>,
    progress_handler: Option<Arc<dyn ProgressHandler>>,
}

impl AnalysisService {
    pub fn new(client: Arc<dyn LLMClient>, config: PipelineConfig) -> Self {
        Self {
            client,
            config,
            cache_enabled: true,
            transcript_path: None,
            progress_handler: None,
        }
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_transcript(mut self, path: Option<PathBuf>) -> Self {
        self.transcript_path = path;
        self
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress_handler = Some(handler);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.client.name()
    }

    pub fn backend_model_info(&self) -> Option<String> {
        self.client.model_info()
    }

    /// Runs the full pipeline over `project_path`. Each call gets a fresh
    /// response cache.
    pub async fn analyze(&self, project_path: &Path) -> Result<ArchitectureReport> {
        let cache = if self.cache_enabled {
            ResponseCache::new()
        } else {
            ResponseCache::disabled()
        };

        let context = PipelineContext::new(
            self.client.clone(),
            Arc::new(cache),
            Arc::new(TranscriptLogger::new(self.transcript_path.clone())),
            self.config.clone(),
            project_path.to_path_buf(),
        );

        info!(
            "Analyzing {} with {}",
            project_path.display(),
            self.backend_name()
        );

        PipelineOrchestrator::new(self.progress_handler.clone())
            .execute(&context)
            .await
    }
}
