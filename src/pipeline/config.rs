use crate::config::ArchmapConfig;
use std::path::Path;

pub const DEFAULT_EXTENSIONS: [&str; 6] = ["py", "js", "ts", "java", "go", "rb"];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Classifier roles are accepted only strictly above this confidence
    pub confidence_threshold: f64,
    /// Excerpt length sent to the file classifier
    pub analysis_excerpt_chars: usize,
    /// Excerpt length sent to the component detector
    pub detection_excerpt_chars: usize,
    /// Always add synthetic `{category}_layer` components for missing
    /// infrastructure roles
    pub ensure_baseline_layers: bool,
    /// Directory name treated as the project root for naming, and whose
    /// presence in the scanned paths implies `ensure_baseline_layers`
    pub root_marker: String,
    /// Parallel classifier calls within the scan and detect stages
    pub concurrency: usize,
    /// File extensions (without the dot) picked up by the scan
    pub extensions: Vec<String>,
    pub max_files: usize,
    /// Files whose trimmed content is shorter than this are skipped
    pub min_content_chars: usize,
    /// Classifier diagrams shorter than this are rejected
    pub min_diagram_chars: usize,
    /// Seed for the structured-extraction stages
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            analysis_excerpt_chars: 1000,
            detection_excerpt_chars: 800,
            ensure_baseline_layers: false,
            root_marker: "complex_project".to_string(),
            concurrency: 4,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            max_files: 1000,
            min_content_chars: 10,
            min_diagram_chars: 20,
            seed: 42,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_app_config(config: &ArchmapConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            analysis_excerpt_chars: config.analysis_excerpt_chars,
            detection_excerpt_chars: config.detection_excerpt_chars,
            root_marker: config.root_marker.clone(),
            concurrency: config.concurrency,
            ..Self::default()
        }
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_baseline_layers(mut self, ensure: bool) -> Self {
        self.ensure_baseline_layers = ensure;
        self
    }

    pub fn with_root_marker(mut self, marker: impl Into<String>) -> Self {
        self.root_marker = marker.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn accepts_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_lowercase();
                self.extensions.iter().any(|allowed| *allowed == e)
            })
            .unwrap_or(false)
    }

    /// Baseline layers are required when explicitly requested, or when the
    /// project path or any scanned file path mentions the root marker.
    pub fn baseline_layers_required<'a, I>(&self, project_path: &Path, file_paths: I) -> bool
    where
        I: IntoIterator<Item = &'a Path>,
    {
        if self.ensure_baseline_layers {
            return true;
        }
        let marker = self.root_marker.as_str();
        project_path.to_string_lossy().contains(marker)
            || file_paths
                .into_iter()
                .any(|p| p.to_string_lossy().contains(marker))
    }
}
