use serde::{Deserialize, Serialize};

/// Raw payload delivered by the storage trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blob {
    pub name: String,
    pub content: Vec<u8>,
}

impl Blob {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// Size in bytes
    pub fn length(&self) -> usize {
        self.content.len()
    }
}
