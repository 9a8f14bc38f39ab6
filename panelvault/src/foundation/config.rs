use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::foundation::error::{PanelError, PanelResult};
use crate::net::transcode::TranscodeOpts;
use crate::offload::dispatcher::OffloadOpts;
use crate::view::preload::PreloadOpts;
use crate::view::visibility::VisibilityOpts;

/// Pipeline-wide settings, loadable from JSON.
///
/// Every section is optional; missing fields take their defaults, so `{}` is a valid config.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Visibility gate geometry.
    pub visibility: VisibilityOpts,
    /// Background execution.
    pub offload: OffloadOpts,
    /// Network-boundary transcoding.
    pub transcode: TranscodeOpts,
    /// Reader-side preloading.
    pub preload: PreloadOpts,
}

impl PipelineConfig {
    /// Parse a config from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> PanelResult<Self> {
        serde_json::from_reader(r).map_err(|e| PanelError::serde(format!("parse config JSON: {e}")))
    }

    /// Parse a config from a JSON string.
    pub fn from_json_str(s: &str) -> PanelResult<Self> {
        serde_json::from_str(s).map_err(|e| PanelError::serde(format!("parse config JSON: {e}")))
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> PanelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            PanelError::validation(format!("open config JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check value ranges and cross-field constraints.
    pub fn validate(&self) -> PanelResult<()> {
        let v = &self.visibility;
        if !v.margin_px.is_finite() || v.margin_px < 0.0 {
            return Err(PanelError::validation(format!(
                "visibility.margin_px must be finite and >= 0, got {}",
                v.margin_px
            )));
        }
        if !(0.0..=1.0).contains(&v.threshold) {
            return Err(PanelError::validation(format!(
                "visibility.threshold must be within 0..=1, got {}",
                v.threshold
            )));
        }

        let o = &self.offload;
        if o.thread_name.is_empty() || o.thread_name.contains('\0') {
            return Err(PanelError::validation(
                "offload.thread_name must be non-empty and contain no NUL bytes",
            ));
        }

        let t = &self.transcode;
        if !(1..=100).contains(&t.quality) {
            return Err(PanelError::validation(format!(
                "transcode.quality must be within 1..=100, got {}",
                t.quality
            )));
        }
        if t.source == t.target {
            return Err(PanelError::validation(format!(
                "transcode.source and transcode.target are both {}",
                t.source
            )));
        }
        if t.cache_control.trim().is_empty() {
            return Err(PanelError::validation("transcode.cache_control must be non-empty"));
        }
        http::HeaderValue::from_str(&t.cache_control).map_err(|e| {
            PanelError::validation(format!("transcode.cache_control is not a header value: {e}"))
        })?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
