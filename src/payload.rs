//! Block-index rewriting for request payloads.
//!
//! Payloads are opaque JSON trees. Block-indexed endpoints carry one or more
//! `block_identifier` mappings (at any depth, including inside arrays of
//! mappings) whose `index` field selects the block to query. The rewrite builds a
//! new tree and never mutates its input, so a single endpoint definition can be
//! reused across every block of a sweep.

use serde_json::{Map, Value};

const BLOCK_IDENTIFIER_KEY: &str = "block_identifier";
const INDEX_KEY: &str = "index";

/// Return a copy of `payload` with every `block_identifier.index` set to `block_index`
///
/// Only existing `index` fields are replaced; a `block_identifier` without one is
/// copied as-is.
pub fn with_block_index(payload: &Value, block_index: i64) -> Value {
    match payload {
        Value::Object(map) => {
            let mut rewritten = Map::with_capacity(map.len());
            for (key, value) in map {
                let mut child = with_block_index(value, block_index);
                if key == BLOCK_IDENTIFIER_KEY {
                    if let Value::Object(identifier) = &mut child {
                        if let Some(index) = identifier.get_mut(INDEX_KEY) {
                            *index = Value::from(block_index);
                        }
                    }
                }
                rewritten.insert(key.clone(), child);
            }
            Value::Object(rewritten)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| with_block_index(item, block_index))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

/// Collect every `block_identifier.index` value in the tree, depth-first
pub fn block_indices(payload: &Value) -> Vec<Value> {
    let mut found = Vec::new();
    collect_indices(payload, &mut found);
    found
}

fn collect_indices(value: &Value, found: &mut Vec<Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == BLOCK_IDENTIFIER_KEY {
                    if let Some(index) = child.get(INDEX_KEY) {
                        found.push(index.clone());
                    }
                }
                collect_indices(child, found);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_indices(item, found)),
        _ => {}
    }
}
