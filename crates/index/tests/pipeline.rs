//! End-to-end runs of the ingestion pipeline against the in-memory graph.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use extract::{
    AnalysisOutcome, DocumentResult, Entity, EntityRef, ExtractionResult, Relation, Role,
    TextAnalyzer,
};
use index::memory::{StoredEdge, StoredVertex};
use index::{
    GraphError, InMemoryGraph, IngestionPipeline, PipelineConfig, SubmitOutcome, Traversal,
    TraversalExecutor, UnresolvedPolicy, VertexIdScheme,
};
use ingest::Document;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Answers with canned outcomes keyed by document id
#[derive(Default)]
struct ScriptedAnalyzer {
    outcomes: HashMap<String, AnalysisOutcome>,
    unavailable: bool,
}

impl ScriptedAnalyzer {
    fn with(mut self, doc_id: &str, extraction: ExtractionResult) -> Self {
        self.outcomes
            .insert(doc_id.to_string(), AnalysisOutcome::Analyzed(extraction));
        self
    }

    fn with_error(mut self, doc_id: &str) -> Self {
        self.outcomes.insert(
            doc_id.to_string(),
            AnalysisOutcome::Errored {
                code: "InvalidDocument".to_string(),
                message: "Document text is empty.".to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl TextAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, documents: &[Document]) -> Result<Vec<DocumentResult>> {
        if self.unavailable {
            bail!("language service unavailable");
        }
        Ok(documents
            .iter()
            .map(|d| DocumentResult {
                doc_id: d.doc_id.clone(),
                outcome: self.outcomes[&d.doc_id].clone(),
            })
            .collect())
    }
}

/// Rejects the purge and forwards everything else
struct FailingReset {
    inner: Arc<InMemoryGraph>,
}

#[async_trait]
impl TraversalExecutor for FailingReset {
    async fn submit(&self, traversal: &Traversal) -> index::errors::Result<SubmitOutcome> {
        if *traversal == Traversal::DropAll {
            return Err(GraphError::Server {
                code: 500,
                message: "drop rejected".to_string(),
            });
        }
        self.inner.submit(traversal).await
    }
}

fn role(name: &str, entities: &[Entity], index: usize) -> Role {
    Role {
        name: name.to_string(),
        entity: EntityRef::to_entity(&entities[index], index),
    }
}

/// The aspirin/81mg note
fn aspirin_note() -> ExtractionResult {
    let entities = vec![
        Entity::new("Medication", "aspirin").with_normalized("aspirin"),
        Entity::new("Dosage", "81mg"),
    ];
    let relations = vec![Relation {
        relation_type: "DosageOfMedication".to_string(),
        roles: vec![role("Dosage", &entities, 1), role("Medication", &entities, 0)],
    }];
    ExtractionResult {
        entities,
        relations,
    }
}

fn ibuprofen_note() -> ExtractionResult {
    let entities = vec![
        Entity::new("Medication", "ibuprofen"),
        Entity::new("Frequency", "twice daily"),
    ];
    let relations = vec![Relation {
        relation_type: "FrequencyOfMedication".to_string(),
        roles: vec![role("Frequency", &entities, 1), role("Medication", &entities, 0)],
    }];
    ExtractionResult {
        entities,
        relations,
    }
}

fn pipeline(
    analyzer: ScriptedAnalyzer,
    graph: &Arc<InMemoryGraph>,
    config: PipelineConfig,
) -> IngestionPipeline {
    IngestionPipeline::new(Arc::new(analyzer), graph.clone(), &config)
}

fn docs(ids: &[&str]) -> Vec<Document> {
    ids.iter()
        .map(|id| Document::new(*id, format!("text of {id}")))
        .collect()
}

// ---------------------------------------------------------------------------
// Worked example
// ---------------------------------------------------------------------------

#[tokio::test]
async fn aspirin_note_becomes_two_vertices_and_one_edge() {
    let graph = Arc::new(InMemoryGraph::new());
    let analyzer = ScriptedAnalyzer::default().with("note", aspirin_note());

    let report = pipeline(analyzer, &graph, PipelineConfig::default())
        .run(&docs(&["note"]))
        .await
        .unwrap();

    assert_eq!(
        graph.vertices(),
        vec![
            StoredVertex {
                id: "0".to_string(),
                label: "Medication".to_string(),
                value: "aspirin".to_string(),
                entity: "Medication".to_string(),
            },
            StoredVertex {
                id: "1".to_string(),
                label: "Dosage".to_string(),
                value: "81mg".to_string(),
                entity: "Dosage".to_string(),
            },
        ]
    );
    assert_eq!(
        graph.edges(),
        vec![StoredEdge {
            label: "DosageOfMedication".to_string(),
            from: "1".to_string(),
            to: "0".to_string(),
        }]
    );
    assert_eq!(report.vertices_created, 2);
    assert_eq!(report.edges_created, 1);
}

// ---------------------------------------------------------------------------
// Reset and ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reset_leaves_no_vertices_or_edges() {
    let graph = Arc::new(InMemoryGraph::new());
    let analyzer = ScriptedAnalyzer::default().with("note", aspirin_note());
    let pipeline = pipeline(analyzer, &graph, PipelineConfig::default());
    pipeline.run(&docs(&["note"])).await.unwrap();

    pipeline.indexer().reset().await.unwrap();

    let stats = pipeline.indexer().get_stats().await.unwrap();
    assert_eq!(stats.vertex_count, 0);
    assert_eq!(stats.edge_count, 0);
}

#[tokio::test]
async fn reset_precedes_writes_and_lookups_precede_their_edge() {
    let graph = Arc::new(InMemoryGraph::new());
    let analyzer = ScriptedAnalyzer::default().with("note", aspirin_note());
    pipeline(analyzer, &graph, PipelineConfig::default())
        .run(&docs(&["note"]))
        .await
        .unwrap();

    let submitted = graph.submitted();
    assert_eq!(submitted.len(), 1 + 2 + 2 + 1);
    assert_eq!(submitted[0], Traversal::DropAll);
    assert!(matches!(submitted[1], Traversal::AddVertex { .. }));
    assert!(matches!(submitted[2], Traversal::AddVertex { .. }));
    assert!(matches!(submitted[3], Traversal::LookupVertexIds { .. }));
    assert!(matches!(submitted[4], Traversal::LookupVertexIds { .. }));
    assert!(matches!(submitted[5], Traversal::AddEdge { .. }));
}

#[tokio::test]
async fn rerunning_yields_identical_counts() {
    let graph = Arc::new(InMemoryGraph::new());
    let analyzer = ScriptedAnalyzer::default()
        .with("a", aspirin_note())
        .with("b", ibuprofen_note());
    let config = PipelineConfig {
        id_scheme: VertexIdScheme::Scoped,
        ..PipelineConfig::default()
    };
    let pipeline = pipeline(analyzer, &graph, config);
    let batch = docs(&["a", "b"]);

    let first = pipeline.run(&batch).await.unwrap();
    let first_stats = pipeline.indexer().get_stats().await.unwrap();
    let second = pipeline.run(&batch).await.unwrap();
    let second_stats = pipeline.indexer().get_stats().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first_stats, second_stats);
    assert_eq!(first_stats.vertex_count, 4);
    assert_eq!(first_stats.edge_count, 2);
}

// ---------------------------------------------------------------------------
// Vertex id collisions across documents
// ---------------------------------------------------------------------------

#[tokio::test]
async fn local_ids_collide_across_documents_in_one_batch() {
    let graph = Arc::new(InMemoryGraph::new());
    let analyzer = ScriptedAnalyzer::default()
        .with("a", aspirin_note())
        .with("b", ibuprofen_note());

    let err = pipeline(analyzer, &graph, PipelineConfig::default())
        .run(&docs(&["a", "b"]))
        .await
        .unwrap_err();

    // The second document restarts at id 0, which document "a" already owns
    match err.downcast_ref::<GraphError>() {
        Some(GraphError::Conflict(message)) => assert!(message.contains('0')),
        other => panic!("expected a vertex id conflict, got {other:?}"),
    }

    // Only the first document's effects are in the graph
    let values: Vec<String> = graph.vertices().into_iter().map(|v| v.value).collect();
    assert_eq!(values, vec!["aspirin", "81mg"]);
    assert_eq!(graph.edges().len(), 1);
}

#[tokio::test]
async fn scoped_ids_do_not_collide() {
    let graph = Arc::new(InMemoryGraph::new());
    let analyzer = ScriptedAnalyzer::default()
        .with("a", aspirin_note())
        .with("b", ibuprofen_note());
    let config = PipelineConfig {
        id_scheme: VertexIdScheme::Scoped,
        ..PipelineConfig::default()
    };

    let report = pipeline(analyzer, &graph, config)
        .run(&docs(&["a", "b"]))
        .await
        .unwrap();

    let ids: Vec<String> = graph.vertices().into_iter().map(|v| v.id).collect();
    assert_eq!(ids, vec!["a-0", "a-1", "b-0", "b-1"]);
    assert_eq!(
        graph.edges()[1],
        StoredEdge {
            label: "FrequencyOfMedication".to_string(),
            from: "b-1".to_string(),
            to: "b-0".to_string(),
        }
    );
    assert_eq!(report.edges_created, 2);
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

fn note_with_dangling_role() -> ExtractionResult {
    let mut note = aspirin_note();
    note.relations.push(Relation {
        relation_type: "RouteOfMedication".to_string(),
        roles: vec![
            Role {
                name: "Route".to_string(),
                entity: EntityRef {
                    category: "Route".to_string(),
                    text: "oral".to_string(),
                    index: None,
                },
            },
            role("Medication", &note.entities, 0),
        ],
    });
    note
}

#[tokio::test]
async fn unresolved_role_fails_the_run_by_default() {
    let graph = Arc::new(InMemoryGraph::new());
    let analyzer = ScriptedAnalyzer::default().with("note", note_with_dangling_role());

    let err = pipeline(analyzer, &graph, PipelineConfig::default())
        .run(&docs(&["note"]))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::UnresolvedRole { role, .. }) if role == "Route"
    ));
    // No malformed edge was attempted
    assert!(
        !graph
            .submitted()
            .iter()
            .any(|t| matches!(t, Traversal::AddEdge { label, .. } if label == "RouteOfMedication"))
    );
}

#[tokio::test]
async fn unresolved_role_can_be_skipped() {
    let graph = Arc::new(InMemoryGraph::new());
    let analyzer = ScriptedAnalyzer::default().with("note", note_with_dangling_role());
    let config = PipelineConfig {
        on_unresolved: UnresolvedPolicy::Skip,
        ..PipelineConfig::default()
    };

    let report = pipeline(analyzer, &graph, config)
        .run(&docs(&["note"]))
        .await
        .unwrap();

    assert_eq!(report.edges_created, 1);
    assert_eq!(report.relations_skipped, 1);
    assert_eq!(graph.edges().len(), 1);
}

#[tokio::test]
async fn errored_documents_are_skipped() {
    let graph = Arc::new(InMemoryGraph::new());
    let analyzer = ScriptedAnalyzer::default()
        .with_error("empty")
        .with("note", aspirin_note());

    let report = pipeline(analyzer, &graph, PipelineConfig::default())
        .run(&docs(&["empty", "note"]))
        .await
        .unwrap();

    assert_eq!(report.documents_received, 2);
    assert_eq!(report.documents_skipped, 1);
    assert_eq!(graph.vertices().len(), 2);
}

#[tokio::test]
async fn analysis_failure_leaves_the_graph_untouched() {
    let graph = Arc::new(InMemoryGraph::new());
    let analyzer = ScriptedAnalyzer {
        unavailable: true,
        ..ScriptedAnalyzer::default()
    };

    let err = pipeline(analyzer, &graph, PipelineConfig::default())
        .run(&docs(&["note"]))
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("language service unavailable"));
    assert!(graph.submitted().is_empty());
}

#[tokio::test]
async fn failed_reset_aborts_before_any_write() {
    let graph = Arc::new(InMemoryGraph::new());
    let executor = Arc::new(FailingReset {
        inner: graph.clone(),
    });
    let analyzer = ScriptedAnalyzer::default().with("note", aspirin_note());

    let err = IngestionPipeline::new(Arc::new(analyzer), executor, &PipelineConfig::default())
        .run(&docs(&["note"]))
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("Failed to purge the graph"));
    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::Server { code: 500, .. })
    ));
    assert!(graph.vertices().is_empty());
    assert!(
        !graph
            .submitted()
            .iter()
            .any(|t| matches!(t, Traversal::AddVertex { .. } | Traversal::AddEdge { .. }))
    );
}
