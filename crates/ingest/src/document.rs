use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{Blob, generate_doc_id};

/// Text handed to the language service, keyed by a stable ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub text: String,
}

impl Document {
    pub fn new(doc_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            text: text.into(),
        }
    }

    /// Decode a blob as UTF-8. Invalid bytes are rejected rather than replaced.
    pub fn from_blob(blob: &Blob) -> Result<Self> {
        let text = String::from_utf8(blob.content.clone())
            .context(format!("Blob is not valid UTF-8: {}", blob.name))?;

        Ok(Self {
            doc_id: generate_doc_id(&blob.name),
            text,
        })
    }
}
