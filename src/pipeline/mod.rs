pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod phase_trait;
pub mod phases;
pub mod state;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::PipelineError;
pub use orchestrator::PipelineOrchestrator;
pub use state::{PipelineState, Stage, StageOutput};
