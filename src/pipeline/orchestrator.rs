use super::context::PipelineContext;
use super::phase_trait::WorkflowPhase;
use super::phases::{detect::DetectPhase, relate::RelatePhase, render::RenderPhase, scan::ScanPhase};
use super::state::PipelineState;
use crate::model::ArchitectureReport;
use crate::progress::{ProgressEvent, ProgressHandler};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct PipelineOrchestrator {
    progress_handler: Option<Arc<dyn ProgressHandler>>,
}

impl PipelineOrchestrator {
    pub fn new(progress_handler: Option<Arc<dyn ProgressHandler>>) -> Self {
        Self { progress_handler }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(&event);
        }
    }

    /// Runs Scan, Detect, Relate and Render once each, in order.
    pub async fn execute(&self, context: &PipelineContext) -> Result<ArchitectureReport> {
        let result = self.run_phases(context).await;
        if let Err(e) = &result {
            self.emit(ProgressEvent::Failed {
                error: format!("{:#}", e),
            });
        }
        result
    }

    async fn run_phases(&self, context: &PipelineContext) -> Result<ArchitectureReport> {
        let start = Instant::now();
        info!(
            "Starting pipeline orchestration for: {}",
            context.project_path.display()
        );
        self.emit(ProgressEvent::Started {
            project_path: context.project_path.display().to_string(),
        });

        let workflow_phases: Vec<Box<dyn WorkflowPhase>> = vec![
            Box::new(ScanPhase),
            Box::new(DetectPhase),
            Box::new(RelatePhase),
            Box::new(RenderPhase),
        ];

        let mut state = PipelineState::new();

        for phase in workflow_phases {
            let stage = phase.stage();
            info!("Phase: {}", stage);
            self.emit(ProgressEvent::StageStarted {
                stage: stage.to_string(),
            });

            let phase_start = Instant::now();
            let output = phase
                .execute(context, &state)
                .await
                .with_context(|| format!("Phase {} failed", stage))?;
            state.merge(output);

            self.emit(ProgressEvent::StageComplete {
                stage: stage.to_string(),
                duration: phase_start.elapsed(),
            });
            debug!("Phase {} complete", stage);
        }

        let stats = context.cache.stats();
        debug!(
            hits = stats.hits,
            misses = stats.misses,
            entries = stats.entries,
            "Response cache"
        );

        let report = state.into_report();
        info!(
            "Pipeline complete: {} component(s), {} relationship(s)",
            report.components.len(),
            report.relationships.len()
        );
        self.emit(ProgressEvent::Completed {
            components: report.components.len(),
            relationships: report.relationships.len(),
            total_time: start.elapsed(),
        });

        Ok(report)
    }
}
