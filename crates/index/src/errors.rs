//! Error types for graph submissions and role resolution.

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Gremlin server error {code}: {message}")]
    Server { code: u16, message: String },

    #[error("Vertex already exists: {0}")]
    Conflict(String),

    #[error("Traversal returned no result: {0}")]
    EmptyResult(String),

    #[error("No vertex matches role '{role}' ({category} {text:?}) of relation {relation_type}")]
    UnresolvedRole {
        relation_type: String,
        role: String,
        category: String,
        text: String,
    },

    #[error("{matches} vertices match role '{role}' ({category} {text:?}) of relation {relation_type}")]
    AmbiguousRole {
        relation_type: String,
        role: String,
        category: String,
        text: String,
        matches: usize,
    },

    #[error("Relation {relation_type} has {found} role(s), an edge needs 2")]
    MissingRole { relation_type: String, found: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    /// Errors that concern one relation rather than the graph session
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedRole { .. } | Self::AmbiguousRole { .. } | Self::MissingRole { .. }
        )
    }
}
