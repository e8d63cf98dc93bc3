//! JSON documents written by the CLI.

use serde::Serialize;
use std::path::Path;

use crate::clip::{zero_embedding, EMBEDDING_DIM};

/// Caption and embedding for one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageDescription {
    pub caption: String,
    pub embedding: Vec<f32>,
}

impl ImageDescription {
    /// Document emitted when no inference runtime is available.
    pub fn placeholder(path: &Path) -> Self {
        Self {
            caption: format!("Image: {}", path.display()),
            embedding: zero_embedding(),
        }
    }

    /// CLIP does not caption, so the caption only names the source.
    pub fn described(path: &Path, embedding: Vec<f32>) -> Self {
        Self {
            caption: format!("Image from {}", path.display()),
            embedding,
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            caption: format!("Error processing image: {}", message),
            embedding: zero_embedding(),
        }
    }

    /// Single-line JSON, without trailing newline.
    pub fn to_json_line(&self) -> String {
        match serde_json::to_string(self) {
            Ok(line) => line,
            // f32 NaN/inf serialize as null, so only a broken Serialize impl lands here
            Err(e) => fallback_json_line(&format!("Error processing image: {}", e)),
        }
    }
}

/// Hand-assembled error document with the zero embedding.
fn fallback_json_line(caption: &str) -> String {
    let zeros = vec!["0.0"; EMBEDDING_DIM].join(",");
    format!(
        r#"{{"caption":{},"embedding":[{}]}}"#,
        serde_json::Value::String(caption.to_string()),
        zeros
    )
}

/// Document written to stderr on invalid invocation.
#[derive(Debug, Clone, Serialize)]
pub struct UsageError {
    pub error: String,
}

impl UsageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"error":"usage error"}"#.to_string())
    }
}
