use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::BACKUP_DIR_PREFIX;
use crate::fs_utils;
use crate::manifest::{BackupInfo, LatestPointer};
use crate::registry;
use crate::store::DocumentStore;
use crate::timestamp;

/// Result of a completed (possibly partially failed) backup session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupOutcome {
    pub backup_path: PathBuf,
    pub backup_info: BackupInfo,
}

/// Create a backup session: one pretty-printed JSON array file per
/// registered collection plus a manifest, inside a fresh
/// `backup_<timestamp>` directory under the backup root.
///
/// A collection whose read or write fails is recorded as an error in the
/// manifest and does not stop the remaining collections; the manifest is
/// the source of truth for partial failure. Only structural failures (the
/// backup root, the session directory, the manifest write itself) abort the
/// operation. Concurrent invocations are not serialized against each other;
/// the last pointer write wins.
pub fn create_backup<S: DocumentStore>(store: &S, backup_root: &Path) -> Result<BackupOutcome> {
    fs_utils::ensure_dir(backup_root)?;

    let session_id = timestamp::now_name();
    let session_dir = backup_root.join(format!("{}{}", BACKUP_DIR_PREFIX, session_id));

    // Non-recursive create: a same-second collision surfaces here instead of
    // mixing two sessions into one directory.
    fs::create_dir(&session_dir).with_context(|| {
        format!(
            "Failed to create backup session directory: {}",
            session_dir.display()
        )
    })?;

    let mut info = BackupInfo::new(session_id);

    for spec in registry::COLLECTIONS {
        match dump_collection(store, spec.name, &session_dir) {
            Ok((document_count, file_path, file_size)) => {
                info.record_success(spec.name, document_count, file_path, file_size);
            }
            Err(e) => {
                eprintln!(
                    "Warning: failed to back up collection '{}': {:#}",
                    spec.name, e
                );
                info.record_failure(spec.name, format!("{:#}", e));
            }
        }
    }

    info.save(&session_dir)?;
    LatestPointer::new(&session_dir, info.clone()).save(backup_root)?;

    Ok(BackupOutcome {
        backup_path: session_dir,
        backup_info: info,
    })
}

/// Dump one collection to `<session_dir>/<name>.json`, returning the
/// document count, file path, and file size for the manifest.
fn dump_collection<S: DocumentStore>(
    store: &S,
    name: &str,
    session_dir: &Path,
) -> Result<(usize, String, u64)> {
    let documents = store.find_all(name)?;

    let path = session_dir.join(format!("{}.json", name));
    let body = serde_json::to_string_pretty(&documents)
        .with_context(|| format!("Failed to serialize collection '{}'", name))?;

    fs_utils::atomic_write(&path, body.as_bytes())
        .with_context(|| format!("Failed to write collection file: {}", path.display()))?;

    let file_size = fs::metadata(&path)
        .with_context(|| format!("Failed to stat collection file: {}", path.display()))?
        .len();

    Ok((documents.len(), path.display().to_string(), file_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::manifest::CollectionStatus;
    use crate::store::JsonStore;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    /// 2 admins, 1 batch with 3 embedded students, 0 placement records,
    /// 1 time-window policy.
    fn seeded_store(temp_dir: &TempDir) -> JsonStore {
        let store = JsonStore::open(&temp_dir.path().join("data")).unwrap();

        store
            .insert_many(
                "admins",
                vec![
                    json!({"username": "root", "email": "root@college.edu"}),
                    json!({"username": "ops", "email": "ops@college.edu"}),
                ],
            )
            .unwrap();

        store
            .insert_many(
                "batches",
                vec![json!({
                    "batchNum": 7,
                    "course": "MCA",
                    "students": [
                        {"regdNo": "S-001", "name": "Asha"},
                        {"regdNo": "S-002", "name": "Ravi"},
                        {"regdNo": "S-003", "name": "Meena"}
                    ]
                })],
            )
            .unwrap();

        store
            .insert_many(
                "timerestrictions",
                vec![json!({"start": "09:00", "end": "17:00"})],
            )
            .unwrap();

        store
    }

    fn document_count(info: &BackupInfo, collection: &str) -> usize {
        match info.collections.get(collection).unwrap() {
            CollectionStatus::Backed { document_count, .. } => *document_count,
            CollectionStatus::Failed { error } => panic!("unexpected failure: {}", error),
        }
    }

    #[test]
    fn test_create_backup_concrete_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store(&temp_dir);
        let backup_root = temp_dir.path().join("backups");

        let outcome = create_backup(&store, &backup_root).unwrap();
        let info = &outcome.backup_info;

        assert_eq!(document_count(info, "admins"), 2);
        assert_eq!(document_count(info, "batches"), 1);
        assert_eq!(document_count(info, "placementdone"), 0);
        assert_eq!(document_count(info, "timerestrictions"), 1);

        // Collection-count semantics: embedded students are not counted.
        assert_eq!(info.total_documents, 4);
        assert_eq!(info.error_count(), 0);

        let sessions = catalog::list_backups(&backup_root).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(
            sessions[0].info.as_ref().unwrap().total_documents,
            4
        );
    }

    #[test]
    fn test_create_backup_writes_one_file_per_collection() {
        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store(&temp_dir);
        let backup_root = temp_dir.path().join("backups");

        let outcome = create_backup(&store, &backup_root).unwrap();

        for name in ["admins", "batches", "placementdone", "timerestrictions"] {
            assert!(outcome.backup_path.join(format!("{}.json", name)).exists());
        }
        assert!(outcome.backup_path.join("backup_info.json").exists());
    }

    #[test]
    fn test_manifest_count_matches_file_records() {
        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store(&temp_dir);
        let backup_root = temp_dir.path().join("backups");

        let outcome = create_backup(&store, &backup_root).unwrap();

        for name in ["admins", "batches", "placementdone"] {
            let content =
                fs::read_to_string(outcome.backup_path.join(format!("{}.json", name))).unwrap();
            let records: Vec<Value> = serde_json::from_str(&content).unwrap();
            assert_eq!(records.len(), document_count(&outcome.backup_info, name));
        }
    }

    #[test]
    fn test_partial_failure_is_isolated_per_collection() {
        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store(&temp_dir);
        let backup_root = temp_dir.path().join("backups");

        // Corrupt one collection so its read fails.
        fs::write(store.collection_path("batches"), "not json").unwrap();

        let outcome = create_backup(&store, &backup_root).unwrap();
        let info = &outcome.backup_info;

        assert_eq!(info.error_count(), 1);
        assert!(matches!(
            info.collections.get("batches"),
            Some(CollectionStatus::Failed { .. })
        ));

        // The three siblings succeeded with correct counts.
        assert_eq!(document_count(info, "admins"), 2);
        assert_eq!(document_count(info, "placementdone"), 0);
        assert_eq!(document_count(info, "timerestrictions"), 1);
        assert_eq!(info.total_documents, 3);

        // The failed collection never produced a file.
        assert!(!outcome.backup_path.join("batches.json").exists());
        assert!(outcome.backup_path.join("admins.json").exists());
    }

    #[test]
    fn test_create_backup_updates_latest_pointer() {
        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store(&temp_dir);
        let backup_root = temp_dir.path().join("backups");

        let outcome = create_backup(&store, &backup_root).unwrap();

        let pointer = LatestPointer::load(&backup_root).unwrap().unwrap();
        assert_eq!(pointer.latest_backup, outcome.backup_info.timestamp);
        assert_eq!(pointer.info.total_documents, 4);
    }

    #[test]
    fn test_create_backup_creates_backup_root() {
        let temp_dir = TempDir::new().unwrap();
        let store = seeded_store(&temp_dir);
        let backup_root = temp_dir.path().join("missing").join("backups");

        assert!(!backup_root.exists());
        create_backup(&store, &backup_root).unwrap();
        assert!(backup_root.is_dir());
    }

    #[test]
    fn test_empty_store_backs_up_empty_arrays() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonStore::open(&temp_dir.path().join("data")).unwrap();
        let backup_root = temp_dir.path().join("backups");

        let outcome = create_backup(&store, &backup_root).unwrap();

        assert_eq!(outcome.backup_info.total_documents, 0);
        let content = fs::read_to_string(outcome.backup_path.join("admins.json")).unwrap();
        let records: Vec<Value> = serde_json::from_str(&content).unwrap();
        assert!(records.is_empty());
    }
}
