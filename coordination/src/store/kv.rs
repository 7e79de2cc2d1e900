//! Generic key/value store (§3.1 "KV entry", §4.1 `Store`/`Retrieve`/`List`).
//!
//! Backed by a single JSON document (`memory.json`: `{"entries": {...}}`)
//! guarded by the advisory lock + atomic-rename machinery in
//! [`crate::store::lockfile`]. Every entry is namespaced by a textual key
//! prefix (`session:`, `trajectory:`, `pattern:`, ...); namespace is a
//! naming convention here, not a separate document.

use crate::error::HookResult;
use crate::store::lockfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub stored_at: String,
    #[serde(default)]
    pub access_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MemoryDoc {
    #[serde(default)]
    entries: BTreeMap<String, KvEntry>,
}

fn load(doc_path: &Path) -> HookResult<MemoryDoc> {
    match lockfile::read_shared(doc_path)? {
        None => Ok(MemoryDoc::default()),
        Some(raw) if raw.trim().is_empty() => Ok(MemoryDoc::default()),
        Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_default()),
    }
}

/// `Store(key, value) -> ok`. Overwrites any existing entry, resetting
/// `access_count` and refreshing `stored_at`.
pub fn store(doc_path: &Path, key: &str, value: serde_json::Value) -> HookResult<()> {
    lockfile::with_exclusive_lock(doc_path, |current| {
        let mut doc: MemoryDoc = if current.trim().is_empty() {
            MemoryDoc::default()
        } else {
            serde_json::from_str(&current).unwrap_or_default()
        };
        doc.entries.insert(
            key.to_string(),
            KvEntry {
                key: key.to_string(),
                value,
                stored_at: crate::timeutil::now_rfc3339(),
                access_count: 0,
            },
        );
        Ok(serde_json::to_string_pretty(&doc)?)
    })
}

/// `Retrieve(key) -> value | none`. Each successful retrieval strictly
/// increments the entry's `access_count` (round-trip law in §8).
pub fn retrieve(doc_path: &Path, key: &str) -> HookResult<Option<serde_json::Value>> {
    let mut result = None;
    lockfile::with_exclusive_lock(doc_path, |current| {
        let mut doc: MemoryDoc = if current.trim().is_empty() {
            MemoryDoc::default()
        } else {
            serde_json::from_str(&current).unwrap_or_default()
        };
        if let Some(entry) = doc.entries.get_mut(key) {
            entry.access_count += 1;
            result = Some(entry.value.clone());
        }
        Ok(serde_json::to_string_pretty(&doc)?)
    })?;
    Ok(result)
}

/// `List(prefix) -> [entries]`, read-only (does not bump `access_count`).
pub fn list(doc_path: &Path, prefix: &str) -> HookResult<Vec<KvEntry>> {
    let doc = load(doc_path)?;
    Ok(doc
        .entries
        .into_iter()
        .filter(|(k, _)| k.starts_with(prefix))
        .map(|(_, v)| v)
        .collect())
}

/// Remove an entry outright (used by `session:*:last` alias resets).
pub fn remove(doc_path: &Path, key: &str) -> HookResult<()> {
    lockfile::with_exclusive_lock(doc_path, |current| {
        let mut doc: MemoryDoc = if current.trim().is_empty() {
            MemoryDoc::default()
        } else {
            serde_json::from_str(&current).unwrap_or_default()
        };
        doc.entries.remove(key);
        Ok(serde_json::to_string_pretty(&doc)?)
    })
}
