//! Instance creation and lifecycle transitions

use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::{json, Value};
use strato_common::{
    hex_token, EntityKind, IamInstanceProfile, InstanceDescription, InstanceRecord, InstanceState,
    Monitoring, Placement, Result, StateReason, StratoError, REQUEST_ID,
};
use strato_store::Store;
use tracing::{error, warn};

use super::ApiResponse;
use crate::params::{indexed_values, ParamBag};

// Stand-in values for the descriptive fields the emulator does not model.
const LAUNCH_TIME: &str = "2014-08-22T16:34:50.000Z";
const PRIVATE_DNS_NAME: &str = "ip-172-0-0-0.ecs.internal";
const PRIVATE_IP_ADDRESS: &str = "172.168.0.0";
const IAM_PROFILE_ARN: &str = "arn:aws:iam::319623489395:instance-profile/testserver";

/// Creates `MinCount` instances (default 1) in one reservation. Every
/// unit gets its own record write; a failed write aborts the whole call.
pub async fn run_instances(store: &Store, params: &ParamBag) -> Result<ApiResponse> {
    let count = params
        .get("MinCount")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);

    // All units from one call share the reservation identity
    let reservation_id = hex_token();
    let owner_id = hex_token();
    let requestor_id = hex_token();

    let mut created = Vec::with_capacity(count);
    for launch_index in 0..count {
        let record = InstanceRecord {
            reservation_id: reservation_id.clone(),
            owner_id: owner_id.clone(),
            requestor_id: requestor_id.clone(),
            instance: freshly_provisioned(hex_token(), launch_index as u32, params),
        };
        store
            .write(EntityKind::Instance, &record.instance.instance_id, &record)
            .await?;
        created.push(record.instance);
    }

    let items = created
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<Value>, _>>()?;

    Ok(ApiResponse {
        root: "RunInstancesResponse",
        body: json!({
            "requestId": REQUEST_ID,
            "reservationId": reservation_id,
            "ownerId": owner_id,
            "requestorId": requestor_id,
            "groupSet": null,
            "instancesSet": { "item": items },
        }),
    })
}

fn freshly_provisioned(id: String, launch_index: u32, params: &ParamBag) -> InstanceDescription {
    let param = |key: &str| params.get(key).cloned().unwrap_or_default();

    InstanceDescription {
        instance_id: id,
        image_id: param("ImageId"),
        instance_state: InstanceState::PENDING,
        private_dns_name: PRIVATE_DNS_NAME.to_string(),
        dns_name: String::new(),
        reason: String::new(),
        key_name: param("KeyName"),
        ami_launch_index: launch_index,
        product_codes: Vec::new(),
        instance_type: param("InstanceType"),
        launch_time: LAUNCH_TIME.to_string(),
        placement: Placement {
            availability_zone: param("Placement.AvailabilityZone"),
            group_name: String::new(),
            tenancy: "default".to_string(),
        },
        kernel_id: hex_token(),
        monitoring: Monitoring {
            state: "pending".to_string(),
        },
        subnet_id: hex_token(),
        vpc_id: hex_token(),
        private_ip_address: PRIVATE_IP_ADDRESS.to_string(),
        source_dest_check: true,
        group_set: Vec::new(),
        state_reason: StateReason {
            code: "pending".to_string(),
            message: "pending".to_string(),
        },
        architecture: "x86_64".to_string(),
        root_device_type: "ebs".to_string(),
        root_device_name: "/dev/sda1".to_string(),
        block_device_mapping: String::new(),
        virtualization_type: "paravirtual".to_string(),
        client_token: String::new(),
        hypervisor: "xen".to_string(),
        network_interface_set: Vec::new(),
        iam_instance_profile: IamInstanceProfile {
            arn: IAM_PROFILE_ARN.to_string(),
            id: hex_token(),
        },
        ebs_optimized: false,
    }
}

/// Per-id outcome of a batched transition. Missing ids are dropped from
/// the wire response but stay distinguishable here so the drop can be
/// logged.
#[derive(Debug)]
enum TransitionOutcome {
    Applied { id: String, previous: InstanceState },
    Missing,
}

/// Moves every targeted instance to `target`, reporting the state each
/// one held before the write. Ids come from the repeated `InstanceId.N`
/// key family.
pub async fn transition_instances(
    store: &Store,
    params: &ParamBag,
    target: InstanceState,
    root: &'static str,
    concurrency: usize,
) -> Result<ApiResponse> {
    let ids = indexed_values(params, "InstanceId");

    let outcomes: Result<Vec<TransitionOutcome>> = stream::iter(ids)
        .map(|id| async move {
            match apply_transition(store, &id, target).await {
                Ok(previous) => Ok(TransitionOutcome::Applied { id, previous }),
                Err(StratoError::NotFound { .. }) => {
                    warn!(%id, "unknown instance dropped from transition result");
                    Ok(TransitionOutcome::Missing)
                }
                Err(e) => Err(e),
            }
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await;

    let outcomes = match outcomes {
        Ok(outcomes) => outcomes,
        Err(e) => {
            // The transport never sees a failure from these actions; an
            // unexpected batch error collapses to an empty result set.
            error!(error = %e, action = root, "transition batch failed, returning empty result set");
            Vec::new()
        }
    };

    let items: Vec<Value> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            TransitionOutcome::Applied { id, previous } => Some(json!({
                "instanceId": id,
                "currentState": target,
                "previousState": previous,
            })),
            TransitionOutcome::Missing => None,
        })
        .collect();

    Ok(ApiResponse {
        root,
        body: json!({
            "requestId": REQUEST_ID,
            "instancesSet": { "item": items },
        }),
    })
}

/// Read, snapshot the current state, overwrite, persist. The snapshot is
/// taken before each write, so re-applying a target state reports that
/// state as previous. The record itself only ever holds the current
/// state.
async fn apply_transition(store: &Store, id: &str, target: InstanceState) -> Result<InstanceState> {
    let mut record: InstanceRecord = store.read(EntityKind::Instance, id).await?;
    let previous = record.instance.instance_state;
    record.instance.instance_state = target;
    store.write(EntityKind::Instance, id, &record).await?;
    Ok(previous)
}
