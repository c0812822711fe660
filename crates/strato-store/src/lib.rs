//! Durable entity storage for the provisioning emulator
//!
//! One record per (kind, id), JSON-serialized. The filesystem backend
//! lays records out as `<root>/ec2/<kind>/<id>` and creates the
//! directory levels lazily on the first write. Handlers never touch
//! paths; they go through the [`EntityStore`] trait so the backend can
//! be swapped (filesystem for the server, in-memory for tests).

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use strato_common::{EntityKind, Result, StratoError};

/// Storage backend trait for entity records
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Read the record for an id. Fails with `NotFound` if the id has
    /// no record; the caller decides what that means.
    async fn read(&self, kind: EntityKind, id: &str) -> Result<Value>;

    /// Persist the record for an id, creating the namespace on demand.
    async fn write(&self, kind: EntityKind, id: &str, record: &Value) -> Result<()>;
}

/// Ids become single path components in the filesystem layout, so they
/// must not carry separators. Malformed ids are rejected, not crashed on.
pub(crate) fn check_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains('/') || id.contains('\\') || id == "." || id == ".." {
        return Err(StratoError::Malformed(format!("invalid entity id: {id:?}")));
    }
    Ok(())
}

/// Typed handle over a backend. This is what handlers hold.
#[derive(Clone)]
pub struct Store {
    inner: Arc<dyn EntityStore>,
}

impl Store {
    pub fn new(inner: Arc<dyn EntityStore>) -> Self {
        Self { inner }
    }

    pub async fn read<T: DeserializeOwned>(&self, kind: EntityKind, id: &str) -> Result<T> {
        let value = self.inner.read(kind, id).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Read, mapping `NotFound` to `None`. Used where a missing record
    /// means "start fresh" rather than "unknown entity".
    pub async fn read_opt<T: DeserializeOwned>(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<T>> {
        match self.inner.read(kind, id).await {
            Ok(value) => Ok(Some(serde_json::from_value(value)?)),
            Err(StratoError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn write<T: Serialize>(&self, kind: EntityKind, id: &str, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.inner.write(kind, id, &value).await
    }
}
