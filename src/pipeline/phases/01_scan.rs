use super::llm_helper::{decode_object, query_classifier};
use crate::cache::Fingerprint;
use crate::extract::excerpt;
use crate::llm::LLMRequest;
use crate::model::{FileAnalysis, FileRecord};
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::state::{PipelineState, Stage, StageOutput};
use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

const ANALYSIS_MAX_TOKENS: u32 = 300;

pub struct ScanPhase;

#[async_trait]
impl WorkflowPhase for ScanPhase {
    fn stage(&self) -> Stage {
        Stage::Scan
    }

    async fn execute(
        &self,
        context: &PipelineContext,
        _state: &PipelineState,
    ) -> Result<StageOutput> {
        let start = Instant::now();
        let root = resolve_root(&context.project_path)?;

        let paths = discover_files(&root, &context.config);
        let sources = load_sources(&paths, context.config.min_content_chars);
        if sources.is_empty() {
            return Err(PipelineError::NoFiles(root).into());
        }

        info!(
            discovered = paths.len(),
            analyzable = sources.len(),
            "Classifying source files"
        );

        let pending: Vec<_> = sources
            .iter()
            .map(|(path, content)| classify_file(context, path, content))
            .collect();
        let analyses: Vec<FileAnalysis> = stream::iter(pending)
            .buffered(context.config.concurrency.max(1))
            .collect()
            .await;

        let records: Vec<FileRecord> = sources
            .into_iter()
            .zip(analyses)
            .map(|((path, content), analysis)| FileRecord {
                path,
                content,
                analysis,
            })
            .collect();

        let analyzed = records.iter().filter(|r| !r.analysis.is_empty()).count();
        info!(
            files = records.len(),
            analyzed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Scan complete"
        );

        Ok(StageOutput::Files(records))
    }
}

fn resolve_root(project_path: &Path) -> Result<PathBuf, PipelineError> {
    if !project_path.is_dir() {
        return Err(PipelineError::InvalidRoot(project_path.to_path_buf()));
    }
    std::fs::canonicalize(project_path).map_err(|e| PipelineError::Scan {
        path: project_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Files under `root` with a configured extension, sorted by path and capped
/// at `max_files`. Honours `.gitignore` and skips hidden entries.
pub fn discover_files(root: &Path, config: &PipelineConfig) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for result in WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .git_global(false)
        .build()
    {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "Failed to read directory entry");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        if config.accepts_extension(path) {
            trace!(path = %path.display(), "Discovered source file");
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    if files.len() > config.max_files {
        warn!(
            found = files.len(),
            max_files = config.max_files,
            "Reached file limit, ignoring the rest"
        );
        files.truncate(config.max_files);
    }

    files
}

/// Reads each file as UTF-8. Unreadable files and files whose trimmed content
/// is shorter than `min_content_chars` are skipped.
pub fn load_sources(paths: &[PathBuf], min_content_chars: usize) -> Vec<(PathBuf, String)> {
    paths
        .iter()
        .filter_map(|path| match std::fs::read_to_string(path) {
            Ok(content) if content.trim().chars().count() < min_content_chars => {
                debug!(path = %path.display(), "Skipping near-empty file");
                None
            }
            Ok(content) => Some((path.clone(), content)),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}

pub fn language_hint(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("py") => "Python",
        Some("js") => "JavaScript",
        Some("ts") => "TypeScript",
        Some("java") => "Java",
        Some("go") => "Go",
        Some("rb") => "Ruby",
        _ => "Unknown",
    }
}

fn build_prompt(path: &Path, content: &str, max_chars: usize) -> String {
    format!(
        r#"Analyze this {language} code file and return ONLY a JSON object:

File: {path}
Content: {content}

Return JSON:
{{
    "type": "frontend|backend|service|database|cache|queue|auth|gateway",
    "framework": "detected framework or null",
    "patterns": ["list of patterns found"]
}}"#,
        language = language_hint(path),
        path = path.display(),
        content = excerpt(content, max_chars),
    )
}

/// Coarse `{type, framework, patterns}` analysis of one file. Any failure
/// yields the empty analysis; only non-empty analyses are cached.
pub async fn classify_file(context: &PipelineContext, path: &Path, content: &str) -> FileAnalysis {
    let config = &context.config;
    let fingerprint =
        Fingerprint::for_file(Stage::Scan.as_str(), path, content.chars().count());

    let analysis = context
        .cache
        .get_or_compute(&fingerprint, || async {
            let request = LLMRequest::prompt(build_prompt(
                path,
                content,
                config.analysis_excerpt_chars,
            ))
            .with_temperature(0.0)
            .with_max_tokens(ANALYSIS_MAX_TOKENS)
            .with_seed(config.seed);

            let raw = query_classifier(context, Stage::Scan, &fingerprint, request).await?;
            let analysis: FileAnalysis = decode_object(Stage::Scan, &raw)?;
            (!analysis.is_empty()).then_some(analysis)
        })
        .await;

    match analysis {
        Some(analysis) => analysis,
        None => {
            warn!("No analysis for {}, continuing without one", path.display());
            FileAnalysis::default()
        }
    }
}
