use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::services::similarity::{ChromaClient, Metadata, UpsertBatch};

/// Records per upsert request; keeps requests under Chroma's size limits.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Offline export of pre-computed team vectors.
#[derive(Debug, Deserialize)]
pub struct VectorExport {
    pub ids: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub metadatas: Vec<Metadata>,
    pub documents: Vec<String>,
}

impl VectorExport {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The export must be non-empty, all four columns must line up and ids must be unique.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(anyhow!("export holds no vectors"));
        }
        let lengths = [
            self.ids.len(),
            self.embeddings.len(),
            self.metadatas.len(),
            self.documents.len(),
        ];
        if lengths.iter().any(|&n| n != lengths[0]) {
            return Err(anyhow!(
                "mismatched list lengths: ids {}, embeddings {}, metadatas {}, documents {}",
                lengths[0],
                lengths[1],
                lengths[2],
                lengths[3]
            ));
        }

        let unique: HashSet<&str> = self.ids.iter().map(String::as_str).collect();
        if unique.len() != self.ids.len() {
            return Err(anyhow!("{} duplicate ids in export", self.ids.len() - unique.len()));
        }
        Ok(())
    }
}

pub async fn load_export(path: &Path) -> Result<VectorExport> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let export: VectorExport = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid vectors export", path.display()))?;
    export.validate()?;
    Ok(export)
}

/// Upserts the export into `collection_name`, creating it if needed. Re-running is safe.
pub async fn import_vectors(
    chroma: &ChromaClient,
    collection_name: &str,
    export: &VectorExport,
    batch_size: usize,
) -> Result<usize> {
    let batch_size = batch_size.max(1);
    let collection = chroma.get_or_create_collection(collection_name).await?;
    tracing::info!("Using collection '{}' ({})", collection.name, collection.id);

    let total = export.len();
    let mut imported = 0usize;
    for start in (0..total).step_by(batch_size) {
        let end = (start + batch_size).min(total);
        chroma
            .upsert(
                &collection,
                &UpsertBatch {
                    ids: &export.ids[start..end],
                    embeddings: &export.embeddings[start..end],
                    metadatas: &export.metadatas[start..end],
                    documents: &export.documents[start..end],
                },
            )
            .await
            .with_context(|| format!("upsert of records {}..{} failed", start, end))?;
        imported = end;
        tracing::info!("Upserted {}/{} records", imported, total);
    }

    Ok(imported)
}
