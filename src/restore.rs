use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::BACKUP_DIR_PREFIX;
use crate::registry;
use crate::store::DocumentStore;

/// Per-collection outcome of a restore.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RestoreStatus {
    /// The collection was wiped and repopulated from the session file.
    #[serde(rename_all = "camelCase")]
    Restored { document_count: usize },

    /// Nothing to do: the session has no file, or an empty one, for this collection.
    Skipped { reason: String },

    /// Parse, delete, or insert failed; sibling collections were unaffected.
    Error { error: String },
}

/// Aggregate result of one restore invocation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    /// Session the restore was driven from
    pub timestamp: String,

    pub collections: BTreeMap<String, RestoreStatus>,

    /// Total documents written across all restored collections
    pub total_restored: usize,
}

impl RestoreReport {
    /// Number of collections that failed during the restore
    pub fn error_count(&self) -> usize {
        self.collections
            .values()
            .filter(|status| matches!(status, RestoreStatus::Error { .. }))
            .count()
    }
}

/// Restore a backup session into the store.
///
/// This is a destructive replace, not a merge: each collection with a file
/// in the session is deleted in full before the session's documents are
/// inserted, reconstructing the saved state. Collections without a session
/// file (a partial backup) are skipped and left untouched. Per-collection
/// failures are recorded in the report and never abort sibling collections;
/// only a missing session directory aborts the operation. Not serialized
/// against concurrently running operations.
pub fn restore_backup<S: DocumentStore>(
    store: &S,
    backup_root: &Path,
    session_id: &str,
) -> Result<RestoreReport> {
    let session_dir = backup_root.join(format!("{}{}", BACKUP_DIR_PREFIX, session_id));

    if !session_dir.is_dir() {
        bail!(
            "Backup session '{}' not found in {}",
            session_id,
            backup_root.display()
        );
    }

    let mut report = RestoreReport {
        timestamp: session_id.to_string(),
        collections: BTreeMap::new(),
        total_restored: 0,
    };

    for spec in registry::COLLECTIONS {
        let file = session_dir.join(format!("{}.json", spec.name));

        if !file.exists() {
            // A partial backup has no file for the collection that failed.
            report.collections.insert(
                spec.name.to_string(),
                RestoreStatus::Skipped {
                    reason: "no file in backup session".to_string(),
                },
            );
            continue;
        }

        let status = match replace_collection(store, spec.name, &file) {
            Ok(Some(document_count)) => {
                report.total_restored += document_count;
                RestoreStatus::Restored { document_count }
            }
            Ok(None) => RestoreStatus::Skipped {
                reason: "collection file is empty".to_string(),
            },
            Err(e) => {
                eprintln!(
                    "Warning: failed to restore collection '{}': {:#}",
                    spec.name, e
                );
                RestoreStatus::Error {
                    error: format!("{:#}", e),
                }
            }
        };

        report.collections.insert(spec.name.to_string(), status);
    }

    Ok(report)
}

/// Wipe one collection and repopulate it from a session file. Returns the
/// number of documents inserted, or None when the file holds no documents
/// (the collection is then left untouched).
fn replace_collection<S: DocumentStore>(
    store: &S,
    name: &str,
    file: &Path,
) -> Result<Option<usize>> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read collection file: {}", file.display()))?;

    let documents: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse collection file: {}", file.display()))?;

    if documents.is_empty() {
        return Ok(None);
    }

    store.delete_all(name)?;

    let inserted = store.insert_many(name, documents)?;
    for failure in &inserted.failures {
        eprintln!(
            "Warning: document {} in collection '{}' was rejected: {}",
            failure.index, name, failure.message
        );
    }

    Ok(Some(inserted.inserted.len()))
}
