use clap::{Parser, Subcommand, ValueEnum};
use genai::adapter::AdapterKind;
use std::path::PathBuf;

use crate::config::parse_provider;

/// AI-assisted architecture mapping for source trees
#[derive(Parser, Debug)]
#[command(
    name = "archmap",
    about = "AI-assisted architecture mapping for source trees",
    version,
    author,
    long_about = "archmap classifies the files of a source tree into architectural roles \
                  (gateway, auth, service, database, cache, queue, frontend), infers how \
                  the resulting components relate, and renders a Mermaid flowchart. Every \
                  step asks an LLM first and falls back to deterministic rules."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Analyze a source tree and render its architecture",
        long_about = "Scans the source tree, detects components, infers relationships and \
                      writes architecture.mmd and architecture.json to the output directory.\n\n\
                      Examples:\n  \
                      archmap analyze\n  \
                      archmap analyze /path/to/project --format json\n  \
                      archmap analyze --provider ollama --model llama3.1 --png"
    )]
    Analyze(AnalyzeArgs),

    #[command(
        about = "Show the effective configuration",
        long_about = "Prints the configuration resolved from ARCHMAP_* environment variables \
                      and .env, and whether the provider's credential is present."
    )]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(
        value_name = "PATH",
        default_value = "sample_project",
        help = "Path to the source tree"
    )]
    pub path: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format printed to stdout"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        default_value = ".",
        help = "Directory for architecture.mmd / architecture.json"
    )]
    pub output_dir: PathBuf,

    #[arg(
        short = 'p',
        long,
        value_parser = parse_provider_arg,
        help = "Classifier provider (groq, openai, ollama, anthropic, gemini, ...)"
    )]
    pub provider: Option<AdapterKind>,

    #[arg(short = 'm', long, value_name = "MODEL", help = "Model name to use")]
    pub model: Option<String>,

    #[arg(long, value_name = "SECONDS", help = "Per-request timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Disable the response cache")]
    pub no_cache: bool,

    #[arg(long, help = "Also render architecture.png through mermaid.ink")]
    pub png: bool,

    #[arg(long, help = "Always add cache/database/queue/frontend layers when missing")]
    pub baseline_layers: bool,

    #[arg(
        long,
        value_name = "NAME",
        help = "Directory treated as the project root when naming components"
    )]
    pub root_marker: Option<String>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Append a JSON-lines transcript of classifier exchanges"
    )]
    pub transcript: Option<PathBuf>,

    #[arg(
        long,
        value_name = "EXT",
        value_delimiter = ',',
        help = "File extensions to scan (comma-separated, default: py,js,ts,java,go,rb)"
    )]
    pub extensions: Vec<String>,

    #[arg(long, value_name = "N", help = "Parallel classifier calls per stage")]
    pub concurrency: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
    Mermaid,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
            OutputFormatArg::Mermaid => super::output::OutputFormat::Mermaid,
        }
    }
}

fn parse_provider_arg(s: &str) -> Result<AdapterKind, String> {
    parse_provider(s).map_err(|e| e.to_string())
}
