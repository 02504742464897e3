use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// How vertex ids are minted for extracted entities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VertexIdScheme {
    /// `0..N-1` per document. Ids repeat across documents.
    #[default]
    Local,
    /// `{doc_id}-{seq}`, unique across documents
    Scoped,
}

impl VertexIdScheme {
    pub fn vertex_id(self, doc_id: &str, seq: usize) -> String {
        match self {
            Self::Local => seq.to_string(),
            Self::Scoped => format!("{doc_id}-{seq}"),
        }
    }
}

/// What to do with a relation whose roles cannot be resolved to one vertex each
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    #[default]
    Fail,
    Skip,
}

/// What to do when a vertex or edge write comes back with no element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyResultPolicy {
    #[default]
    Warn,
    Fail,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub id_scheme: VertexIdScheme,
    pub on_unresolved: UnresolvedPolicy,
    pub on_empty_write: EmptyResultPolicy,
}

impl FromStr for VertexIdScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "scoped" => Ok(Self::Scoped),
            other => Err(anyhow!("Unknown vertex id scheme: {other}")),
        }
    }
}

impl FromStr for UnresolvedPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            other => Err(anyhow!("Unknown unresolved-role policy: {other}")),
        }
    }
}

impl FromStr for EmptyResultPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            other => Err(anyhow!("Unknown empty-result policy: {other}")),
        }
    }
}
