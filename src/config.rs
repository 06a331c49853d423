//! Export configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::model::PageGeometry;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    pub geometry: PageGeometry,
    /// Upper bound on a single image fetch, in milliseconds. A timeout is
    /// handled like any other failed fetch.
    pub image_timeout_ms: u64,
    /// Responses larger than this are skipped instead of decoded.
    pub max_image_bytes: u64,
    /// Bounding box edge for requester and assignee photos.
    pub profile_photo_size: f64,
    /// Maximum height of an attachment image.
    pub attachment_image_max_height: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::default(),
            image_timeout_ms: 10_000,
            max_image_bytes: 10 * 1024 * 1024,
            profile_photo_size: 80.0,
            attachment_image_max_height: 220.0,
        }
    }
}

impl ExportConfig {
    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }

    /// Parse a config from JSON and validate its geometry.
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        let config: ExportConfig = serde_json::from_str(json)?;
        config.geometry.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
