//! Filesystem backend: one JSON file per entity id

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use strato_common::{EntityKind, Result, StratoError};
use tokio::fs;
use tracing::debug;

use crate::{check_id, EntityStore};

/// Persists records under `<root>/ec2/<kind>/<id>`. The directory tree
/// is not created up front; a write to a missing namespace creates the
/// ancestor levels and retries exactly once. A second failure is fatal
/// to the calling operation.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entity_path(&self, kind: EntityKind, id: &str) -> PathBuf {
        self.root.join("ec2").join(kind.dir_name()).join(id)
    }
}

#[async_trait]
impl EntityStore for FsStore {
    async fn read(&self, kind: EntityKind, id: &str) -> Result<Value> {
        check_id(id)?;
        let path = self.entity_path(kind, id);
        match fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StratoError::NotFound {
                kind,
                id: id.to_string(),
            }),
            Err(e) => Err(StratoError::Storage(format!(
                "failed to read {kind}/{id}: {e}"
            ))),
        }
    }

    async fn write(&self, kind: EntityKind, id: &str, record: &Value) -> Result<()> {
        check_id(id)?;
        let path = self.entity_path(kind, id);
        let bytes = serde_json::to_vec(record)?;

        match fs::write(&path, &bytes).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // The namespace directory does not exist yet. Create all
                // missing ancestor levels and retry the write once.
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).await.map_err(|e| {
                        StratoError::Storage(format!(
                            "failed to create namespace for {kind}/{id}: {e}"
                        ))
                    })?;
                }
                fs::write(&path, &bytes).await.map_err(|e| {
                    StratoError::Storage(format!("failed to write {kind}/{id}: {e}"))
                })?;
            }
            Err(e) => {
                return Err(StratoError::Storage(format!(
                    "failed to write {kind}/{id}: {e}"
                )));
            }
        }

        debug!(%kind, %id, bytes = bytes.len(), "stored entity record");
        Ok(())
    }
}
