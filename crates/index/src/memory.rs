//! In-process graph store.
//!
//! Interprets [`Traversal`] values against a vertex/edge set the way the
//! remote store answers them: duplicate vertex ids conflict, an edge whose
//! endpoints are missing comes back empty, lookups return matching ids.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};

use crate::errors::{GraphError, Result};
use crate::executor::{SubmitOutcome, TraversalExecutor};
use crate::traversal::Traversal;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredVertex {
    pub id: String,
    pub label: String,
    pub value: String,
    pub entity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEdge {
    pub label: String,
    pub from: String,
    pub to: String,
}

#[derive(Default)]
struct GraphState {
    vertices: Vec<StoredVertex>,
    edges: Vec<StoredEdge>,
    submitted: Vec<Traversal>,
}

#[derive(Default)]
pub struct InMemoryGraph {
    state: Mutex<GraphState>,
    silent_writes: bool,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that applies writes but acknowledges them with no rows
    pub fn with_silent_writes() -> Self {
        Self {
            silent_writes: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn vertices(&self) -> Vec<StoredVertex> {
        self.lock().vertices.clone()
    }

    pub fn edges(&self) -> Vec<StoredEdge> {
        self.lock().edges.clone()
    }

    /// Every traversal received so far, in submission order
    pub fn submitted(&self) -> Vec<Traversal> {
        self.lock().submitted.clone()
    }

    fn written(&self, element: Value) -> SubmitOutcome {
        if self.silent_writes {
            SubmitOutcome::Empty
        } else {
            SubmitOutcome::Rows(vec![element])
        }
    }
}

#[async_trait]
impl TraversalExecutor for InMemoryGraph {
    async fn submit(&self, traversal: &Traversal) -> Result<SubmitOutcome> {
        let mut state = self.lock();
        state.submitted.push(traversal.clone());

        let outcome = match traversal {
            Traversal::DropAll => {
                state.vertices.clear();
                state.edges.clear();
                SubmitOutcome::Empty
            }
            Traversal::AddVertex {
                id,
                label,
                value,
                entity,
            } => {
                if state.vertices.iter().any(|v| &v.id == id) {
                    return Err(GraphError::Conflict(format!(
                        "Resource with specified id or name already exists: {id}"
                    )));
                }
                let vertex = StoredVertex {
                    id: id.clone(),
                    label: label.clone(),
                    value: value.clone(),
                    entity: entity.clone(),
                };
                let element = json!({
                    "id": vertex.id,
                    "label": vertex.label,
                    "type": "vertex",
                    "properties": {"value": vertex.value, "entity": vertex.entity},
                });
                state.vertices.push(vertex);
                self.written(element)
            }
            Traversal::LookupVertexIds { label, value, id } => {
                let ids = state
                    .vertices
                    .iter()
                    .filter(|v| &v.label == label && &v.value == value)
                    .filter(|v| id.as_ref().is_none_or(|id| &v.id == id))
                    .map(|v| json!(v.id))
                    .collect();
                SubmitOutcome::from_rows(ids)
            }
            Traversal::AddEdge { label, from, to } => {
                let has = |id: &String| state.vertices.iter().any(|v| &v.id == id);
                if !has(from) || !has(to) {
                    SubmitOutcome::Empty
                } else {
                    let edge = StoredEdge {
                        label: label.clone(),
                        from: from.clone(),
                        to: to.clone(),
                    };
                    let element = json!({
                        "label": edge.label,
                        "type": "edge",
                        "outV": edge.from,
                        "inV": edge.to,
                    });
                    state.edges.push(edge);
                    self.written(element)
                }
            }
            Traversal::CountVertices => SubmitOutcome::Rows(vec![json!(state.vertices.len())]),
            Traversal::CountEdges => SubmitOutcome::Rows(vec![json!(state.edges.len())]),
        };

        Ok(outcome)
    }
}
