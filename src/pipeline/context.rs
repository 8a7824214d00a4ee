//! Pipeline context for managing dependencies

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::ResponseCache;
use crate::llm::{LLMClient, TranscriptLogger};

use super::config::PipelineConfig;

/// Context that owns all long-lived pipeline dependencies
pub struct PipelineContext {
    /// Classifier client shared by every stage
    pub llm_client: Arc<dyn LLMClient>,

    /// Run-scoped cache of accepted classifier results
    pub cache: Arc<ResponseCache>,

    /// Optional JSON-lines log of classifier exchanges
    pub transcript: Arc<TranscriptLogger>,

    pub config: PipelineConfig,

    /// Root of the source tree being analyzed
    pub project_path: PathBuf,
}

impl PipelineContext {
    pub fn new(
        llm_client: Arc<dyn LLMClient>,
        cache: Arc<ResponseCache>,
        transcript: Arc<TranscriptLogger>,
        config: PipelineConfig,
        project_path: PathBuf,
    ) -> Self {
        Self {
            llm_client,
            cache,
            transcript,
            config,
            project_path,
        }
    }

    /// Context with a fresh cache and no transcript
    pub fn with_defaults(
        llm_client: Arc<dyn LLMClient>,
        config: PipelineConfig,
        project_path: PathBuf,
    ) -> Self {
        Self::new(
            llm_client,
            Arc::new(ResponseCache::new()),
            Arc::new(TranscriptLogger::disabled()),
            config,
            project_path,
        )
    }
}
