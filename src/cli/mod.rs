pub mod commands;
pub mod output;

pub use commands::{AnalyzeArgs, CliArgs, Commands, ConfigArgs};
pub use output::{OutputFormat, OutputFormatter};
