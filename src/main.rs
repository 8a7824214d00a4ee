use archmap::cli::commands::{AnalyzeArgs, CliArgs, Commands, ConfigArgs};
use archmap::cli::{OutputFormat, OutputFormatter};
use archmap::config::{default_model, load_dotenv, ArchmapConfig};
use archmap::llm::select_llm_client;
use archmap::output::{write_artifacts, PngRenderer, IMAGE_FILE};
use archmap::pipeline::PipelineConfig;
use archmap::progress::LoggingHandler;
use archmap::service::AnalysisService;
use archmap::util::{init_logging, LoggingConfig};
use archmap::VERSION;

use clap::Parser;
use genai::adapter::AdapterKind;
use std::process;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const EXIT_OK: i32 = 0;
const EXIT_RUNTIME: i32 = 1;
const EXIT_CONFIG: i32 = 2;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    load_dotenv();
    init_logging(LoggingConfig::from_flags(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("archmap v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Analyze(analyze_args) => handle_analyze(analyze_args, args.quiet).await,
        Commands::Config(config_args) => handle_config(config_args),
    };

    process::exit(exit_code);
}

fn build_config(args: &AnalyzeArgs) -> Result<ArchmapConfig, archmap::ConfigError> {
    let mut config = ArchmapConfig::from_env()?;

    if let Some(provider) = args.provider {
        debug!("Provider explicitly set to: {:?}", provider);
        if provider != config.provider && args.model.is_none() {
            config.model = default_model(provider);
        }
        config.provider = provider;
    }
    if let Some(model) = &args.model {
        debug!("Model overridden to: {}", model);
        config.model = model.clone();
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }
    if args.no_cache {
        debug!("Caching disabled");
        config.cache_enabled = false;
    }
    if let Some(marker) = &args.root_marker {
        config.root_marker = marker.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }

    config.validate()?;
    Ok(config)
}

fn print_credential_hints(provider: AdapterKind) {
    eprintln!("\nPossible solutions:");
    match provider {
        AdapterKind::Groq => eprintln!("  - Set GROQ_API_KEY environment variable"),
        AdapterKind::OpenAI => eprintln!("  - Set OPENAI_API_KEY environment variable"),
        AdapterKind::Anthropic => eprintln!("  - Set ANTHROPIC_API_KEY environment variable"),
        AdapterKind::Gemini => eprintln!("  - Set GEMINI_API_KEY environment variable"),
        AdapterKind::Xai => eprintln!("  - Set XAI_API_KEY environment variable"),
        _ => eprintln!("  - Check provider-specific environment variables"),
    }
    eprintln!("  - Keys can also be placed in a .env file in the working directory");
    eprintln!("  - Or run a local model: --provider ollama");
}

async fn handle_analyze(args: &AnalyzeArgs, quiet: bool) -> i32 {
    info!("Starting architecture analysis");

    let config = match build_config(args) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            eprintln!("\nPlease check your environment variables and command-line arguments.");
            return EXIT_CONFIG;
        }
    };

    let selected = match select_llm_client(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to initialize classifier: {:#}", e);
            print_credential_hints(config.provider);
            return EXIT_CONFIG;
        }
    };
    debug!("Classifier ready: {}", selected.description);

    let mut pipeline_config =
        PipelineConfig::from_app_config(&config).with_baseline_layers(args.baseline_layers);
    if !args.extensions.is_empty() {
        pipeline_config = pipeline_config.with_extensions(args.extensions.iter().cloned());
    }

    let service = AnalysisService::new(selected.client, pipeline_config)
        .with_cache(config.cache_enabled)
        .with_transcript(args.transcript.clone())
        .with_progress(Arc::new(LoggingHandler));

    let report = match service.analyze(&args.path).await {
        Ok(r) => r,
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            return EXIT_RUNTIME;
        }
    };

    let written = match write_artifacts(&report, &args.output_dir) {
        Ok(w) => w,
        Err(e) => {
            error!("Failed to write artifacts: {:#}", e);
            return EXIT_RUNTIME;
        }
    };
    if !quiet {
        eprintln!("Diagram written to: {}", written.diagram.display());
        eprintln!("Report written to: {}", written.report.display());
    }

    if args.png {
        let target = args.output_dir.join(IMAGE_FILE);
        let rendered = match PngRenderer::new() {
            Ok(renderer) => renderer.render_to_file(&report.diagram, &target).await,
            Err(e) => Err(e),
        };
        match rendered {
            Ok(()) if !quiet => eprintln!("Image written to: {}", target.display()),
            Ok(()) => {}
            Err(e) => warn!("PNG rendering skipped: {:#}", e),
        }
    }

    let format: OutputFormat = args.format.into();
    match OutputFormatter::new(format).format(&report) {
        Ok(output) => {
            println!("{}", output);
            EXIT_OK
        }
        Err(e) => {
            error!("Failed to format output: {}", e);
            EXIT_RUNTIME
        }
    }
}

fn handle_config(args: &ConfigArgs) -> i32 {
    let config = match ArchmapConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            return EXIT_CONFIG;
        }
    };

    let format: OutputFormat = args.format.into();
    let output = match OutputFormatter::new(format).format_config(&config) {
        Ok(out) => out,
        Err(e) => {
            error!("Failed to format configuration: {}", e);
            return EXIT_RUNTIME;
        }
    };
    println!("{}", output);

    match (config.credential_var(), config.require_credential()) {
        (Some(var), Ok(_)) => eprintln!("Credential {} is set", var),
        (Some(var), Err(_)) => eprintln!("Credential {} is NOT set", var),
        (None, _) => eprintln!("Provider {} needs no credential", config.provider.as_str()),
    }

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return EXIT_CONFIG;
    }
    EXIT_OK
}
