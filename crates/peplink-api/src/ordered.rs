//! Ordered-index collection decoding
//!
//! Several endpoints return lists as an object keyed by stringified positions,
//! plus an `order` array naming which keys are members and in what sequence:
//!
//! ```json
//! {"1": {...}, "2": {...}, "order": [2, 1], "timestamp": 1693680864}
//! ```
//!
//! Decoding is two-phase. The payload is first split into a key → raw JSON
//! map; then each key listed in `order` is decoded on its own. A malformed
//! item therefore fails with its own index and never disturbs its siblings'
//! decode. Keys not listed in `order` (metadata like `timestamp`) are ignored.
//! Duplicate entries in `order` decode the same item more than once.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{Error, Result};

const ORDER_KEY: &str = "order";

type RawEntries = HashMap<String, Box<RawValue>>;

/// Decode an ordered collection, running `item_decoder` on each member's raw JSON.
///
/// Fails with `Error::Schema` if the payload is not an object, `order` is
/// missing or not a list of non-negative integers, or `order` names a key the
/// object does not have. An `item_decoder` failure becomes `Error::Decode`
/// carrying the offending index.
pub fn decode_ordered<T, F, E>(raw: &str, item_decoder: F) -> Result<Vec<T>>
where
    F: FnMut(&str) -> std::result::Result<T, E>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let entries: RawEntries = serde_json::from_str(raw)
        .map_err(|e| Error::Schema(format!("ordered collection is not a JSON object: {e}")))?;
    decode_entries(&entries, item_decoder)
}

/// `decode_ordered` with serde as the item decoder.
pub fn decode_ordered_items<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>> {
    decode_ordered(raw, |item| serde_json::from_str::<T>(item))
}

fn decode_entries<T, F, E>(entries: &RawEntries, mut item_decoder: F) -> Result<Vec<T>>
where
    F: FnMut(&str) -> std::result::Result<T, E>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let order = parse_order(entries)?;
    let mut items = Vec::with_capacity(order.len());

    for index in order {
        let raw = entries.get(&index.to_string()).ok_or_else(|| {
            Error::Schema(format!("order references key \"{index}\" which is absent"))
        })?;
        let item = item_decoder(raw.get()).map_err(|e| Error::Decode {
            index: Some(index),
            source: e.into(),
        })?;
        items.push(item);
    }

    Ok(items)
}

fn parse_order(entries: &RawEntries) -> Result<Vec<u64>> {
    let raw = entries
        .get(ORDER_KEY)
        .ok_or_else(|| Error::Schema("ordered collection has no \"order\" key".into()))?;
    serde_json::from_str(raw.get()).map_err(|e| {
        Error::Schema(format!(
            "\"order\" is not a list of non-negative integers: {e}"
        ))
    })
}

/// An ordered collection nested inside another decoded item.
///
/// Deserializes from the `{"<idx>": .., "order": [..]}` shape using the same
/// rules as `decode_ordered`, and serializes back out as a plain JSON array.
/// Only works under `serde_json`, which is the only format the device speaks.
#[derive(Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Ordered<T>(pub Vec<T>);

impl<T> Ordered<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Deref for Ordered<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Ordered<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.0).finish()
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Ordered<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entries = RawEntries::deserialize(deserializer)?;
        decode_entries(&entries, |item| serde_json::from_str::<T>(item))
            .map(Ordered)
            .map_err(D::Error::custom)
    }
}
