use std::sync::Arc;

use extract::{Entity, Relation, Role};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{EmptyResultPolicy, PipelineConfig, UnresolvedPolicy};
use crate::errors::{GraphError, Result};
use crate::executor::{SubmitOutcome, TraversalExecutor};
use crate::graphson;
use crate::traversal::Traversal;

/// Reset, vertex and edge operators over one graph session
pub struct GraphIndexer {
    executor: Arc<dyn TraversalExecutor>,
    config: PipelineConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpsertReport {
    /// Ids minted for the entities, in extraction order
    pub vertex_ids: Vec<String>,
    pub empty_writes: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkReport {
    pub edges_created: usize,
    pub relations_skipped: usize,
    pub empty_writes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub vertex_count: usize,
    pub edge_count: usize,
}

impl GraphIndexer {
    pub fn new(executor: Arc<dyn TraversalExecutor>, config: PipelineConfig) -> Self {
        Self { executor, config }
    }

    /// Purge the whole graph. Any error status aborts before a write happens.
    pub async fn reset(&self) -> Result<()> {
        self.executor.submit(&Traversal::DropAll).await?;
        info!("Cleaned up the graph");
        Ok(())
    }

    /// Create one vertex per entity, ids following extraction order
    pub async fn upsert_entities(&self, doc_id: &str, entities: &[Entity]) -> Result<UpsertReport> {
        let mut report = UpsertReport::default();

        for (seq, entity) in entities.iter().enumerate() {
            let id = self.config.id_scheme.vertex_id(doc_id, seq);
            info!(
                doc_id,
                vertex_id = %id,
                text = %entity.text,
                normalized_text = entity.normalized_text.as_deref().unwrap_or(""),
                category = %entity.category,
                "Entity"
            );

            let traversal = Traversal::AddVertex {
                id: id.clone(),
                label: entity.category.clone(),
                value: entity.text.clone(),
                entity: entity.category.clone(),
            };

            match self.executor.submit(&traversal).await? {
                SubmitOutcome::Rows(rows) => {
                    debug!(vertex = ?rows.first(), "Inserted vertex");
                }
                SubmitOutcome::Empty => {
                    self.empty_write(&traversal)?;
                    report.empty_writes += 1;
                }
            }
            report.vertex_ids.push(id);
        }

        Ok(report)
    }

    /// Create one edge per relation between the vertices of its first two roles
    pub async fn resolve_and_link(&self, doc_id: &str, relations: &[Relation]) -> Result<LinkReport> {
        let mut report = LinkReport::default();

        for relation in relations {
            info!(
                doc_id,
                relation_type = %relation.relation_type,
                roles = relation.roles.len(),
                "Relation"
            );

            match self.link(doc_id, relation).await {
                Ok(SubmitOutcome::Rows(_)) => report.edges_created += 1,
                Ok(SubmitOutcome::Empty) => report.empty_writes += 1,
                Err(err) if err.is_resolution() && self.config.on_unresolved == UnresolvedPolicy::Skip => {
                    warn!(doc_id, error = %err, "Skipping relation");
                    report.relations_skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(report)
    }

    async fn link(&self, doc_id: &str, relation: &Relation) -> Result<SubmitOutcome> {
        let [source, target, rest @ ..] = relation.roles.as_slice() else {
            return Err(GraphError::MissingRole {
                relation_type: relation.relation_type.clone(),
                found: relation.roles.len(),
            });
        };
        if !rest.is_empty() {
            debug!(
                relation_type = %relation.relation_type,
                ignored = rest.len(),
                "Only the first two roles become an edge"
            );
        }

        let from = self.resolve_role(doc_id, &relation.relation_type, source).await?;
        let to = self.resolve_role(doc_id, &relation.relation_type, target).await?;
        for role in [source, target] {
            info!(
                role = %role.name,
                category = %role.entity.category,
                text = %role.entity.text,
                "Role"
            );
        }

        let traversal = Traversal::AddEdge {
            label: relation.relation_type.clone(),
            from,
            to,
        };
        let outcome = self.executor.submit(&traversal).await?;
        match &outcome {
            SubmitOutcome::Rows(rows) => debug!(edge = ?rows.first(), "Inserted edge"),
            SubmitOutcome::Empty => self.empty_write(&traversal)?,
        }

        Ok(outcome)
    }

    /// Look up the single vertex standing for a role's entity
    pub async fn resolve_role(&self, doc_id: &str, relation_type: &str, role: &Role) -> Result<String> {
        let traversal = Traversal::LookupVertexIds {
            label: role.entity.category.clone(),
            value: role.entity.text.clone(),
            id: role
                .entity
                .index
                .map(|seq| self.config.id_scheme.vertex_id(doc_id, seq)),
        };

        let outcome = self.executor.submit(&traversal).await?;
        let ids: Vec<String> = outcome.rows().iter().filter_map(graphson::as_id).collect();

        match ids.as_slice() {
            [id] => Ok(id.clone()),
            [] => Err(GraphError::UnresolvedRole {
                relation_type: relation_type.to_string(),
                role: role.name.clone(),
                category: role.entity.category.clone(),
                text: role.entity.text.clone(),
            }),
            _ => Err(GraphError::AmbiguousRole {
                relation_type: relation_type.to_string(),
                role: role.name.clone(),
                category: role.entity.category.clone(),
                text: role.entity.text.clone(),
                matches: ids.len(),
            }),
        }
    }

    pub async fn get_stats(&self) -> Result<GraphStats> {
        let vertex_count = self.count(&Traversal::CountVertices).await?;
        let edge_count = self.count(&Traversal::CountEdges).await?;

        Ok(GraphStats {
            vertex_count,
            edge_count,
        })
    }

    async fn count(&self, traversal: &Traversal) -> Result<usize> {
        let outcome = self.executor.submit(traversal).await?;
        Ok(outcome.rows().first().and_then(graphson::as_count).unwrap_or(0))
    }

    fn empty_write(&self, traversal: &Traversal) -> Result<()> {
        match self.config.on_empty_write {
            EmptyResultPolicy::Warn => {
                warn!(query = %traversal, "Something went wrong with this query");
                Ok(())
            }
            EmptyResultPolicy::Fail => Err(GraphError::EmptyResult(traversal.to_string())),
        }
    }
}
