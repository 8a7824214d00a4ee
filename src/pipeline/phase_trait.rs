use super::context::PipelineContext;
use super::state::{PipelineState, Stage, StageOutput};
use anyhow::Result;
use async_trait::async_trait;

/// One step of the pipeline. A phase reads the accumulated state and
/// returns the partial update it produced; the orchestrator merges it.
#[async_trait]
pub trait WorkflowPhase: Send + Sync {
    fn stage(&self) -> Stage;

    async fn execute(&self, context: &PipelineContext, state: &PipelineState)
        -> Result<StageOutput>;
}
