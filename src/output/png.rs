//! Raster rendering through a Mermaid rendering endpoint
//!
//! Failures here never fail a run; callers log and move on.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const MERMAID_INK_ENDPOINT: &str = "https://mermaid.ink/img";
const RENDER_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PngRenderer {
    endpoint: String,
    http_client: Client,
}

impl PngRenderer {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(MERMAID_INK_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(RENDER_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn image_url(&self, diagram: &str) -> String {
        let encoded = URL_SAFE.encode(diagram.as_bytes());
        format!(
            "{}/{}?backgroundColor=white&theme=default",
            self.endpoint, encoded
        )
    }

    /// Fetches the rendered image for `diagram` and writes it to `target`.
    pub async fn render_to_file(&self, diagram: &str, target: &Path) -> Result<()> {
        let url = self.image_url(diagram);
        debug!(chars = url.len(), "Requesting diagram image");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .context("Image request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Image endpoint returned status {}", status);
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read image body")?;
        tokio::fs::write(target, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;

        info!(path = %target.display(), bytes = bytes.len(), "Diagram image written");
        Ok(())
    }
}
