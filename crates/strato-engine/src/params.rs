//! Decoding of the provider's flat, positional request encoding
//!
//! Requests arrive as a flat string-keyed bag where repeated structures
//! use dotted index keys (`InstanceId.1`, `Tag.2.Key`, `Tag.2.Value`).
//! These functions are pure so the implicit wire contract stays
//! independently testable. Malformed entries are dropped, never crashed
//! on.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

/// The normalized parameter bag a handler receives.
pub type ParamBag = HashMap<String, String>;

/// Fields belonging to the provider protocol itself, not to any action.
const PROTOCOL_FIELDS: &[&str] = &[
    "AWSAccessKeyId",
    "Action",
    "Signature",
    "SignatureMethod",
    "SignatureVersion",
    "Timestamp",
    "Version",
];

pub fn strip_protocol_fields(mut bag: ParamBag) -> ParamBag {
    for field in PROTOCOL_FIELDS {
        bag.remove(*field);
    }
    bag
}

/// Reconstruct the ordered value list of a repeated scalar family:
/// `InstanceId.1`, `InstanceId.2`, ... Keys that do not parse as
/// `<family>.<index>` are ignored.
pub fn indexed_values(bag: &ParamBag, family: &str) -> Vec<String> {
    let mut found: Vec<(usize, &String)> = bag
        .iter()
        .filter_map(|(key, value)| {
            let index = key.strip_prefix(family)?.strip_prefix('.')?;
            Some((index.parse().ok()?, value))
        })
        .collect();
    found.sort_by_key(|(index, _)| *index);
    found.into_iter().map(|(_, value)| value.clone()).collect()
}

/// One decoded key/value pair. A missing `Value` field is a valueless
/// tag, which is distinct from an empty-string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpec {
    pub key: String,
    pub value: Option<String>,
}

/// Reconstruct the ordered pair list of a parallel positional family:
/// `Tag.1.Key`, `Tag.1.Value`, `Tag.2.Key`, ... An index that carries a
/// value but no key cannot form a pair and is dropped.
pub fn indexed_pairs(bag: &ParamBag, family: &str) -> Vec<TagSpec> {
    let mut slots: BTreeMap<usize, (Option<String>, Option<String>)> = BTreeMap::new();

    for (key, value) in bag {
        let Some(rest) = key.strip_prefix(family).and_then(|r| r.strip_prefix('.')) else {
            continue;
        };
        let mut parts = rest.splitn(2, '.');
        let (Some(index), Some(field)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(index) = index.parse::<usize>() else {
            continue;
        };
        let slot = slots.entry(index).or_default();
        match field {
            "Key" => slot.0 = Some(value.clone()),
            "Value" => slot.1 = Some(value.clone()),
            _ => {}
        }
    }

    slots
        .into_iter()
        .filter_map(|(index, (key, value))| match key {
            Some(key) => Some(TagSpec { key, value }),
            None => {
                warn!(family, index, "dropping positional entry with no key field");
                None
            }
        })
        .collect()
}
