pub mod blob;
pub mod document;

pub use blob::Blob;
pub use document::Document;

use sha2::{Digest, Sha256};

/// Generate a stable document ID from a blob name
pub fn generate_doc_id(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Turn one trigger payload into the document batch handed to the pipeline
pub fn batch_from_blob(blob: &Blob) -> anyhow::Result<Vec<Document>> {
    tracing::info!(
        name = %blob.name,
        length = blob.length(),
        "Blob trigger received"
    );

    Ok(vec![Document::from_blob(blob)?])
}
