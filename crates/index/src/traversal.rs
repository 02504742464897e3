//! Parameterized Gremlin traversals.
//!
//! Every traversal is a fixed script plus a bindings map. Entity text and
//! categories only ever travel as bound values.

use std::fmt;

use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Traversal {
    /// Purge every vertex (and with them every edge)
    DropAll,
    AddVertex {
        id: String,
        label: String,
        value: String,
        entity: String,
    },
    /// Ids of vertices with this label and `value`, optionally pinned to one id
    LookupVertexIds {
        label: String,
        value: String,
        id: Option<String>,
    },
    AddEdge {
        label: String,
        from: String,
        to: String,
    },
    CountVertices,
    CountEdges,
}

impl Traversal {
    pub fn script(&self) -> &'static str {
        match self {
            Self::DropAll => "g.V().drop()",
            Self::AddVertex { .. } => {
                "g.addV(vertexLabel).property('id', vertexId).property('value', vertexValue).property('entity', vertexEntity)"
            }
            Self::LookupVertexIds { id: None, .. } => {
                "g.V().hasLabel(lookupLabel).has('value', lookupValue).id()"
            }
            Self::LookupVertexIds { id: Some(_), .. } => {
                "g.V(lookupId).hasLabel(lookupLabel).has('value', lookupValue).id()"
            }
            Self::AddEdge { .. } => "g.V(fromId).addE(edgeLabel).to(g.V(toId))",
            Self::CountVertices => "g.V().count()",
            Self::CountEdges => "g.E().count()",
        }
    }

    pub fn bindings(&self) -> Map<String, Value> {
        let bound = match self {
            Self::DropAll | Self::CountVertices | Self::CountEdges => json!({}),
            Self::AddVertex {
                id,
                label,
                value,
                entity,
            } => json!({
                "vertexId": id,
                "vertexLabel": label,
                "vertexValue": value,
                "vertexEntity": entity,
            }),
            Self::LookupVertexIds { label, value, id } => {
                let mut bound = json!({
                    "lookupLabel": label,
                    "lookupValue": value,
                });
                if let Some(id) = id {
                    bound["lookupId"] = json!(id);
                }
                bound
            }
            Self::AddEdge { label, from, to } => json!({
                "edgeLabel": label,
                "fromId": from,
                "toId": to,
            }),
        };

        match bound {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Whether the traversal mutates the graph
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::DropAll | Self::AddVertex { .. } | Self::AddEdge { .. }
        )
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.script(), Value::Object(self.bindings()))
    }
}
