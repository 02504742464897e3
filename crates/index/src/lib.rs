pub mod config;
pub mod errors;
pub mod executor;
pub mod graph_index;
pub mod graphson;
pub mod gremlin_client;
pub mod memory;
pub mod traversal;

pub use config::{EmptyResultPolicy, PipelineConfig, UnresolvedPolicy, VertexIdScheme};
pub use errors::GraphError;
pub use executor::{SubmitOutcome, TraversalExecutor};
pub use graph_index::{GraphIndexer, GraphStats, LinkReport, UpsertReport};
pub use gremlin_client::{GremlinClient, GremlinConfig};
pub use memory::InMemoryGraph;
pub use traversal::Traversal;

use std::sync::Arc;

use anyhow::{Context, Result};
use extract::TextAnalyzer;
use ingest::Document;
use serde::Serialize;
use tracing::info;

/// Drives analysis and graph writes for one batch of documents
pub struct IngestionPipeline {
    analyzer: Arc<dyn TextAnalyzer>,
    indexer: GraphIndexer,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub documents_received: usize,
    pub documents_skipped: usize,
    pub vertices_created: usize,
    pub edges_created: usize,
    pub relations_skipped: usize,
    pub empty_writes: usize,
}

impl IngestionPipeline {
    pub fn new(
        analyzer: Arc<dyn TextAnalyzer>,
        executor: Arc<dyn TraversalExecutor>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            analyzer,
            indexer: GraphIndexer::new(executor, *config),
        }
    }

    pub fn indexer(&self) -> &GraphIndexer {
        &self.indexer
    }

    /// Analyze the batch, purge the graph, then write vertices and edges
    /// document by document.
    ///
    /// The first failure aborts the run; documents already written stay in
    /// the graph.
    pub async fn run(&self, documents: &[Document]) -> Result<RunReport> {
        let mut report = RunReport {
            documents_received: documents.len(),
            ..RunReport::default()
        };

        let results = self
            .analyzer
            .analyze(documents)
            .await
            .context("Text analysis failed")?;

        let analyzed: Vec<_> = results
            .iter()
            .filter_map(|r| r.extraction().map(|extraction| (r.doc_id.as_str(), extraction)))
            .collect();
        report.documents_skipped = results.len() - analyzed.len();

        self.indexer
            .reset()
            .await
            .context("Failed to purge the graph")?;

        for (doc_id, extraction) in analyzed {
            info!(
                doc_id,
                entities = extraction.entities.len(),
                relations = extraction.relations.len(),
                "Indexing document"
            );

            let upserted = self
                .indexer
                .upsert_entities(doc_id, &extraction.entities)
                .await
                .with_context(|| format!("Failed to insert vertices for document {doc_id}"))?;
            report.vertices_created += upserted.vertex_ids.len() - upserted.empty_writes;
            report.empty_writes += upserted.empty_writes;

            let linked = self
                .indexer
                .resolve_and_link(doc_id, &extraction.relations)
                .await
                .with_context(|| format!("Failed to insert edges for document {doc_id}"))?;
            report.edges_created += linked.edges_created;
            report.relations_skipped += linked.relations_skipped;
            report.empty_writes += linked.empty_writes;
        }

        info!(?report, "Process finished");
        Ok(report)
    }
}
