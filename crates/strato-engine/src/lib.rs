//! Request dispatch and durable state-transition engine
//!
//! The core of the provisioning emulator: an inbound action name is
//! resolved against a closed routing table, the flat parameter bag is
//! normalized, and the matching handler reads, transforms, and writes
//! entity records through the store seam before building a plain
//! response tree for the markup encoder at the boundary.

pub mod actions;
pub mod handlers;
pub mod params;

pub use actions::{Action, ActionRoute, ActionTable, ResourceFamily, Service};
pub use handlers::ApiResponse;
pub use params::ParamBag;

use strato_common::{InstanceState, Result};
use strato_store::Store;
use tracing::{info, instrument};

/// Bounded fan-out for batched per-id work within one request. One at a
/// time matches the cost profile of local file I/O; higher caps are
/// allowed for throughput.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 1;

pub struct Engine {
    store: Store,
    table: ActionTable,
    batch_concurrency: usize,
}

impl Engine {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            table: ActionTable::builtin(),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    pub fn with_action_table(mut self, table: ActionTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_batch_concurrency(mut self, cap: usize) -> Self {
        self.batch_concurrency = cap.max(1);
        self
    }

    /// Resolve and run the handler for an action. The bag may still
    /// carry the protocol-metadata fields at this point; they are
    /// stripped before any handler sees it.
    #[instrument(skip(self, bag), fields(action = %action))]
    pub async fn handle(&self, action: &str, bag: ParamBag) -> Result<ApiResponse> {
        let route = self.table.resolve(action)?;
        let params = params::strip_protocol_fields(bag);
        info!(service = ?route.service, family = ?route.family, "dispatching action");

        match route.action {
            Action::RunInstances => handlers::instance::run_instances(&self.store, &params).await,
            Action::StartInstances => {
                handlers::instance::transition_instances(
                    &self.store,
                    &params,
                    InstanceState::PENDING,
                    "StartInstancesResponse",
                    self.batch_concurrency,
                )
                .await
            }
            Action::StopInstances => {
                handlers::instance::transition_instances(
                    &self.store,
                    &params,
                    InstanceState::STOPPING,
                    "StopInstancesResponse",
                    self.batch_concurrency,
                )
                .await
            }
            Action::TerminateInstances => {
                handlers::instance::transition_instances(
                    &self.store,
                    &params,
                    InstanceState::SHUTTING_DOWN,
                    "TerminateInstancesResponse",
                    self.batch_concurrency,
                )
                .await
            }
            Action::CreateKeyPair => {
                handlers::keypair::create_key_pair(&self.store, &params).await
            }
            Action::CreateTags => {
                handlers::resource::create_tags(&self.store, &params, self.batch_concurrency).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Arc;
    use strato_common::{EntityKind, StratoError};
    use strato_store::{EntityStore, MemoryStore};

    fn test_engine() -> (Engine, Arc<MemoryStore>) {
        let backend = Arc::new(MemoryStore::new());
        let engine = Engine::new(Store::new(backend.clone()));
        (engine, backend)
    }

    fn bag(entries: &[(&str, &str)]) -> ParamBag {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_run_instances_shares_one_reservation() -> Result<(), anyhow::Error> {
        let (engine, backend) = test_engine();

        let response = engine
            .handle(
                "RunInstances",
                bag(&[("MinCount", "3"), ("ImageId", "ami-x")]),
            )
            .await?;

        assert_eq!(response.root, "RunInstancesResponse");
        let items = response.body["instancesSet"]["item"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(backend.len(), 3);

        let reservation_id = response.body["reservationId"].as_str().unwrap();
        for item in items {
            assert_eq!(item["instanceState"]["code"], 0);
            assert_eq!(item["instanceState"]["name"], "pending");

            let id = item["instanceId"].as_str().unwrap();
            let stored = backend.read(EntityKind::Instance, id).await?;
            assert_eq!(stored["reservationId"], reservation_id);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_terminate_is_idempotent_on_target_state() -> Result<(), anyhow::Error> {
        let (engine, _backend) = test_engine();

        let created = engine
            .handle(
                "RunInstances",
                bag(&[
                    ("ImageId", "ami-x"),
                    ("InstanceType", "t1.micro"),
                    ("KeyName", "k1"),
                ]),
            )
            .await?;
        let items = created.body["instancesSet"]["item"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["keyName"], "k1");
        let id = items[0]["instanceId"].as_str().unwrap().to_string();

        let first = engine
            .handle("TerminateInstances", bag(&[("InstanceId.1", &id)]))
            .await?;
        let item = &first.body["instancesSet"]["item"][0];
        assert_eq!(item["currentState"]["code"], 32);
        assert_eq!(item["currentState"]["name"], "shutting-down");
        assert_eq!(item["previousState"]["code"], 0);

        // The previous snapshot is taken before each write, so the
        // second call reports the target state as previous.
        let second = engine
            .handle("TerminateInstances", bag(&[("InstanceId.1", &id)]))
            .await?;
        let item = &second.body["instancesSet"]["item"][0];
        assert_eq!(item["currentState"]["code"], 32);
        assert_eq!(item["previousState"]["code"], 32);
        assert_eq!(item["previousState"]["name"], "shutting-down");
        Ok(())
    }

    #[tokio::test]
    async fn test_start_reports_the_state_stop_left() -> Result<(), anyhow::Error> {
        let (engine, _backend) = test_engine();

        let created = engine.handle("RunInstances", bag(&[])).await?;
        let id = created.body["instancesSet"]["item"][0]["instanceId"]
            .as_str()
            .unwrap()
            .to_string();

        let stopped = engine
            .handle("StopInstances", bag(&[("InstanceId.1", &id)]))
            .await?;
        let stop_current = stopped.body["instancesSet"]["item"][0]["currentState"].clone();
        assert_eq!(stop_current["code"], 64);

        let started = engine
            .handle("StartInstances", bag(&[("InstanceId.1", &id)]))
            .await?;
        let item = &started.body["instancesSet"]["item"][0];
        assert_eq!(item["previousState"], stop_current);
        assert_eq!(item["currentState"]["code"], 0);
        assert_eq!(item["currentState"]["name"], "pending");
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_ids_are_dropped_from_the_result() -> Result<(), anyhow::Error> {
        let (engine, _backend) = test_engine();

        let response = engine
            .handle(
                "TerminateInstances",
                bag(&[("InstanceId.1", "deadbeef"), ("InstanceId.2", "cafebabe")]),
            )
            .await?;

        let items = response.body["instancesSet"]["item"].as_array().unwrap();
        assert!(items.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_key_pair_persists_name_and_fingerprint() -> Result<(), anyhow::Error> {
        let (engine, backend) = test_engine();

        let response = engine
            .handle("CreateKeyPair", bag(&[("KeyName", "myuniquekey")]))
            .await?;

        assert_eq!(response.body["keyName"], "myuniquekey");
        assert!(response.body["keyMaterial"]
            .as_str()
            .unwrap()
            .contains("PRIVATE KEY"));

        let stored = backend.read(EntityKind::KeyPair, "myuniquekey").await?;
        assert_eq!(stored["keyName"], "myuniquekey");
        // Key material is response-only
        assert!(stored.get("keyMaterial").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_tagging_is_last_write_wins_per_key() -> Result<(), anyhow::Error> {
        let (engine, backend) = test_engine();

        engine
            .handle(
                "CreateTags",
                bag(&[
                    ("ResourceId.1", "11223344"),
                    ("Tag.1.Key", "env"),
                    ("Tag.1.Value", "first"),
                ]),
            )
            .await?;
        engine
            .handle(
                "CreateTags",
                bag(&[
                    ("ResourceId.1", "11223344"),
                    ("Tag.1.Key", "env"),
                    ("Tag.1.Value", "second"),
                ]),
            )
            .await?;

        let stored = backend.read(EntityKind::Resource, "11223344").await?;
        let tags = stored["tags"].as_object().unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags["env"], "second");
        Ok(())
    }

    #[tokio::test]
    async fn test_valueless_tag_stores_null() -> Result<(), anyhow::Error> {
        let (engine, backend) = test_engine();

        engine
            .handle(
                "CreateTags",
                bag(&[("ResourceId.1", "r1"), ("Tag.1.Key", "orphan")]),
            )
            .await?;

        let stored = backend.read(EntityKind::Resource, "r1").await?;
        let tags = stored["tags"].as_object().unwrap();
        assert!(tags.contains_key("orphan"));
        assert!(tags["orphan"].is_null());
        Ok(())
    }

    #[tokio::test]
    async fn test_tag_value_without_key_is_ignored() -> Result<(), anyhow::Error> {
        let (engine, backend) = test_engine();

        engine
            .handle(
                "CreateTags",
                bag(&[("ResourceId.1", "r1"), ("Tag.1.Value", "stray")]),
            )
            .await?;

        let stored = backend.read(EntityKind::Resource, "r1").await?;
        assert!(stored["tags"].as_object().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_action_is_rejected() {
        let (engine, _backend) = test_engine();

        let err = engine
            .handle("DescribeInstances", bag(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, StratoError::UnknownAction(_)));
    }
}
