//! Structured error types for the report engine.
//!
//! Only caller-visible failures live here. Missing optional fields and
//! unreachable images are recoverable inside the engine and never surface as
//! an `ExportError`.

use thiserror::Error;

/// The unified error type returned by every public export function.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Page geometry violates `margin < width / 2` or `margin < height / 2`,
    /// or contains a non-positive dimension.
    #[error("Invalid page geometry: {0}")]
    InvalidGeometry(String),

    /// The PDF serializer could not produce a document.
    #[error("Failed to serialize document: {0}")]
    Serialize(String),

    /// Writing the finished file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON input (records, statistics, or configuration) failed to parse.
    #[error("Failed to parse input: {source}{}", format_hint(.hint))]
    Json {
        source: serde_json::Error,
        hint: String,
    },
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected shape. Check field names (camelCase) and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        ExportError::Json { source: e, hint }
    }
}
