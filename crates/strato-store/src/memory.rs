//! In-memory backend for tests and embedded use

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use strato_common::{EntityKind, Result, StratoError};

use crate::{check_id, EntityStore};

#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<(EntityKind, String), Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn read(&self, kind: EntityKind, id: &str) -> Result<Value> {
        check_id(id)?;
        self.records
            .get(&(kind, id.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StratoError::NotFound {
                kind,
                id: id.to_string(),
            })
    }

    async fn write(&self, kind: EntityKind, id: &str, record: &Value) -> Result<()> {
        check_id(id)?;
        self.records.insert((kind, id.to_string()), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_round_trip() {
        let store = MemoryStore::new();
        let record = json!({"tags": {"env": "test"}});

        store
            .write(EntityKind::Resource, "r-1", &record)
            .await
            .unwrap();
        assert_eq!(store.read(EntityKind::Resource, "r-1").await.unwrap(), record);
        assert_eq!(store.len(), 1);

        let err = store.read(EntityKind::Resource, "r-2").await.unwrap_err();
        assert!(matches!(err, StratoError::NotFound { .. }));
    }
}
