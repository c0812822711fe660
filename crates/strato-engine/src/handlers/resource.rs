//! Resource tagging

use std::collections::HashSet;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::json;
use strato_common::{EntityKind, Result, TagRecord, REQUEST_ID};
use strato_store::Store;

use super::ApiResponse;
use crate::params::{indexed_pairs, indexed_values, ParamBag, TagSpec};

/// Applies the decoded tag pairs to every targeted resource id. A
/// resource with no tag record yet starts from an empty mapping.
/// Distinct resources may tag concurrently; the pairs for one resource
/// apply in decoded order, so later pairs win key-wise.
pub async fn create_tags(
    store: &Store,
    params: &ParamBag,
    concurrency: usize,
) -> Result<ApiResponse> {
    let mut resource_ids = indexed_values(params, "ResourceId");
    let tags = indexed_pairs(params, "Tag");

    // A repeated resource id is one target file; it must not race itself
    // when the fan-out cap is above one.
    let mut seen = HashSet::new();
    resource_ids.retain(|id| seen.insert(id.clone()));

    stream::iter(resource_ids)
        .map(|id| {
            let tags = &tags;
            async move { apply_tags(store, &id, tags).await }
        })
        .buffer_unordered(concurrency.max(1))
        .try_collect::<Vec<()>>()
        .await?;

    Ok(ApiResponse {
        root: "CreateTagsResponse",
        body: json!({
            "requestId": REQUEST_ID,
            "return": true,
        }),
    })
}

async fn apply_tags(store: &Store, id: &str, tags: &[TagSpec]) -> Result<()> {
    let mut record = store
        .read_opt::<TagRecord>(EntityKind::Resource, id)
        .await?
        .unwrap_or_else(TagRecord::empty);

    for tag in tags {
        record.tags.insert(tag.key.clone(), tag.value.clone());
    }

    store.write(EntityKind::Resource, id, &record).await
}
