//! Key pair creation

use serde_json::json;
use strato_common::{
    EntityKind, KeyPairRecord, Result, StratoError, KEY_FINGERPRINT, KEY_MATERIAL, REQUEST_ID,
};
use strato_store::Store;

use super::ApiResponse;
use crate::params::ParamBag;

/// Persists `{keyName, keyFingerprint}` under the caller-supplied name.
/// The key material is a stub that only ever appears in the response.
pub async fn create_key_pair(store: &Store, params: &ParamBag) -> Result<ApiResponse> {
    let key_name = params
        .get("KeyName")
        .cloned()
        .ok_or_else(|| StratoError::Malformed("CreateKeyPair requires KeyName".to_string()))?;

    let record = KeyPairRecord {
        key_name: key_name.clone(),
        key_fingerprint: KEY_FINGERPRINT.to_string(),
    };
    store.write(EntityKind::KeyPair, &key_name, &record).await?;

    Ok(ApiResponse {
        root: "CreateKeyPairResponse",
        body: json!({
            "requestId": REQUEST_ID,
            "keyName": record.key_name,
            "keyFingerprint": record.key_fingerprint,
            "keyMaterial": KEY_MATERIAL,
        }),
    })
}
