// JSON-lines transcript of classifier exchanges, one line per call
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

#[derive(Serialize)]
struct TranscriptEntry<'a> {
    stage: &'a str,
    fingerprint: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    latency_ms: u64,
    timestamp: u64,
}

pub struct TranscriptLogger {
    writer: Option<Mutex<BufWriter<File>>>,
}

impl TranscriptLogger {
    pub fn new(log_file: Option<PathBuf>) -> Self {
        let writer = log_file.and_then(|path| {
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => Some(Mutex::new(BufWriter::new(file))),
                Err(e) => {
                    warn!("Failed to open transcript file {:?}: {}", path, e);
                    None
                }
            }
        });

        Self { writer }
    }

    pub fn disabled() -> Self {
        Self { writer: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn log_exchange(
        &self,
        stage: &str,
        fingerprint: &str,
        prompt: &str,
        outcome: Result<&str, String>,
        latency_ms: u64,
    ) {
        let Some(writer) = &self.writer else {
            return;
        };

        let (response, error) = match outcome {
            Ok(text) => (Some(text), None),
            Err(e) => (None, Some(e)),
        };

        let entry = TranscriptEntry {
            stage,
            fingerprint,
            prompt,
            response,
            error,
            latency_ms,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        };

        if let Ok(mut writer) = writer.lock() {
            match serde_json::to_string(&entry) {
                Ok(json) => {
                    if let Err(e) = writeln!(writer, "{}", json) {
                        warn!("Failed to write transcript entry: {}", e);
                    }
                    if let Err(e) = writer.flush() {
                        warn!("Failed to flush transcript: {}", e);
                    }
                }
                Err(e) => {
                    warn!("Failed to serialize transcript entry for {}: {}", stage, e);
                }
            }
        }

        debug!("Transcript: stage={} latency_ms={}", stage, latency_ms);
    }
}

impl Default for TranscriptLogger {
    fn default() -> Self {
        Self::disabled()
    }
}
