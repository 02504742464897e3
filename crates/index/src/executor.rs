use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;
use crate::traversal::Traversal;

/// What a successful submission produced
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Rows(Vec<Value>),
    /// The store accepted the traversal but returned nothing
    Empty,
}

impl SubmitOutcome {
    pub fn from_rows(rows: Vec<Value>) -> Self {
        if rows.is_empty() {
            Self::Empty
        } else {
            Self::Rows(rows)
        }
    }

    pub fn rows(&self) -> &[Value] {
        match self {
            Self::Rows(rows) => rows,
            Self::Empty => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Submits one traversal at a time to the graph store.
///
/// Callers await each submission before issuing the next one.
#[async_trait]
pub trait TraversalExecutor: Send + Sync {
    async fn submit(&self, traversal: &Traversal) -> Result<SubmitOutcome>;
}
