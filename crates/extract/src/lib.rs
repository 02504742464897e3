pub mod language;
pub mod schema;
mod wire;

pub use language::{LanguageClient, LanguageConfig};
pub use schema::{
    AnalysisOutcome, DocumentResult, Entity, EntityRef, ExtractionResult, Relation, Role,
};

use anyhow::Result;
use async_trait::async_trait;
use ingest::Document;

/// External NLP service: one call per document batch.
///
/// Implementations return one result per input document, in input order.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn analyze(&self, documents: &[Document]) -> Result<Vec<DocumentResult>>;
}
