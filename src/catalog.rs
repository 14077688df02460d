use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::BACKUP_DIR_PREFIX;
use crate::fs_utils;
use crate::manifest::{BackupInfo, LatestPointer};
use crate::timestamp;

/// One backup session as seen on disk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub timestamp: String,

    pub backup_path: PathBuf,

    /// Manifest contents; None when the manifest is missing or unreadable
    pub info: Option<BackupInfo>,

    /// On-disk size of the session's immediate files, in bytes
    pub size: u64,
}

/// List backup sessions under the backup root, most recent first.
///
/// Sessions are ordered by identifier descending, which is chronological
/// because session identifiers are lexicographically time-ordered. A
/// session whose manifest cannot be read still lists, with a null info.
pub fn list_backups(backup_root: &Path) -> Result<Vec<BackupEntry>> {
    if !backup_root.exists() {
        return Ok(Vec::new());
    }

    let mut sessions = Vec::new();

    for entry in fs::read_dir(backup_root)
        .with_context(|| format!("Failed to read backup root: {}", backup_root.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(timestamp) = name.strip_prefix(BACKUP_DIR_PREFIX) else {
            continue;
        };
        if timestamp::parse_name(timestamp).is_none() {
            continue;
        }

        let info = match BackupInfo::load(&path) {
            Ok(info) => Some(info),
            Err(e) => {
                eprintln!(
                    "Warning: unreadable manifest for session '{}': {:#}",
                    timestamp, e
                );
                None
            }
        };

        let size = fs_utils::dir_size(&path).unwrap_or(0);

        sessions.push(BackupEntry {
            timestamp: timestamp.to_string(),
            backup_path: path,
            info,
            size,
        });
    }

    sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Ok(sessions)
}

/// Delete a backup session and recompute the latest pointer from the
/// sessions that remain.
pub fn delete_backup(backup_root: &Path, session_id: &str) -> Result<String> {
    let session_dir = backup_root.join(format!("{}{}", BACKUP_DIR_PREFIX, session_id));

    if !session_dir.is_dir() {
        bail!(
            "Backup session '{}' not found in {}",
            session_id,
            backup_root.display()
        );
    }

    fs::remove_dir_all(&session_dir).with_context(|| {
        format!(
            "Failed to delete backup session: {}",
            session_dir.display()
        )
    })?;

    refresh_latest_pointer(backup_root)?;

    Ok(session_id.to_string())
}

/// Re-derive `latest_backup.json` from the sessions on disk: rewritten to
/// the most recent session when any remain, removed entirely when none do.
///
/// Recomputing from a full listing instead of patching keeps the pointer
/// consistent with the actual catalog even if a prior pointer write was
/// interrupted.
pub fn refresh_latest_pointer(backup_root: &Path) -> Result<()> {
    let sessions = list_backups(backup_root)?;

    match sessions.into_iter().next() {
        Some(entry) => {
            let info = entry
                .info
                .unwrap_or_else(|| BackupInfo::new(entry.timestamp.clone()));
            LatestPointer::new(&entry.backup_path, info).save(backup_root)
        }
        None => LatestPointer::remove(backup_root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Fabricate a session directory with a manifest and one collection file.
    fn make_session(backup_root: &Path, timestamp: &str, document_count: usize) {
        let session_dir = backup_root.join(format!("{}{}", BACKUP_DIR_PREFIX, timestamp));
        fs::create_dir_all(&session_dir).unwrap();

        fs::write(session_dir.join("admins.json"), "[]").unwrap();

        let mut info = BackupInfo::new(timestamp.to_string());
        info.record_success("admins", document_count, "admins.json".to_string(), 2);
        info.save(&session_dir).unwrap();
    }

    #[test]
    fn test_list_backups_empty_root() {
        let temp_dir = TempDir::new().unwrap();
        let sessions = list_backups(&temp_dir.path().join("backups")).unwrap();
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_list_backups_sorted_most_recent_first() {
        let temp_dir = TempDir::new().unwrap();
        let backup_root = temp_dir.path().to_path_buf();

        make_session(&backup_root, "2026-08-05T10-00-00Z", 1);
        make_session(&backup_root, "2026-08-07T10-00-00Z", 3);
        make_session(&backup_root, "2026-08-06T10-00-00Z", 2);

        let sessions = list_backups(&backup_root).unwrap();
        let timestamps: Vec<&str> = sessions.iter().map(|s| s.timestamp.as_str()).collect();
        assert_eq!(
            timestamps,
            vec![
                "2026-08-07T10-00-00Z",
                "2026-08-06T10-00-00Z",
                "2026-08-05T10-00-00Z"
            ]
        );
    }

    #[test]
    fn test_list_backups_ignores_foreign_entries() {
        let temp_dir = TempDir::new().unwrap();
        let backup_root = temp_dir.path().to_path_buf();

        make_session(&backup_root, "2026-08-07T10-00-00Z", 1);
        fs::create_dir(backup_root.join("not_a_session")).unwrap();
        fs::create_dir(backup_root.join("backup_junk")).unwrap();
        fs::write(backup_root.join("stray.json"), "{}").unwrap();

        let sessions = list_backups(&backup_root).unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_list_backups_corrupt_manifest_yields_null_info() {
        let temp_dir = TempDir::new().unwrap();
        let backup_root = temp_dir.path().to_path_buf();

        make_session(&backup_root, "2026-08-07T10-00-00Z", 1);
        let session_dir = backup_root.join("backup_2026-08-07T10-00-00Z");
        fs::write(session_dir.join("backup_info.json"), "not json").unwrap();

        let sessions = list_backups(&backup_root).unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].info.is_none());
    }

    #[test]
    fn test_list_backups_computes_session_size() {
        let temp_dir = TempDir::new().unwrap();
        let backup_root = temp_dir.path().to_path_buf();

        make_session(&backup_root, "2026-08-07T10-00-00Z", 1);

        let sessions = list_backups(&backup_root).unwrap();
        // admins.json plus the manifest file.
        assert!(sessions[0].size > 2);
    }

    #[test]
    fn test_delete_backup_removes_session() {
        let temp_dir = TempDir::new().unwrap();
        let backup_root = temp_dir.path().to_path_buf();

        make_session(&backup_root, "2026-08-07T10-00-00Z", 1);

        let deleted = delete_backup(&backup_root, "2026-08-07T10-00-00Z").unwrap();
        assert_eq!(deleted, "2026-08-07T10-00-00Z");
        assert!(!backup_root.join("backup_2026-08-07T10-00-00Z").exists());
    }

    #[test]
    fn test_delete_backup_unknown_session_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = delete_backup(temp_dir.path(), "2026-08-07T10-00-00Z");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_deleting_most_recent_repoints_to_next() {
        let temp_dir = TempDir::new().unwrap();
        let backup_root = temp_dir.path().to_path_buf();

        make_session(&backup_root, "2026-08-05T10-00-00Z", 1);
        make_session(&backup_root, "2026-08-06T10-00-00Z", 2);
        make_session(&backup_root, "2026-08-07T10-00-00Z", 3);

        delete_backup(&backup_root, "2026-08-07T10-00-00Z").unwrap();

        let pointer = LatestPointer::load(&backup_root).unwrap().unwrap();
        assert_eq!(pointer.latest_backup, "2026-08-06T10-00-00Z");
        assert_eq!(pointer.info.total_documents, 2);
    }

    #[test]
    fn test_deleting_older_session_keeps_pointer_on_newest() {
        let temp_dir = TempDir::new().unwrap();
        let backup_root = temp_dir.path().to_path_buf();

        make_session(&backup_root, "2026-08-05T10-00-00Z", 1);
        make_session(&backup_root, "2026-08-07T10-00-00Z", 3);

        delete_backup(&backup_root, "2026-08-05T10-00-00Z").unwrap();

        let pointer = LatestPointer::load(&backup_root).unwrap().unwrap();
        assert_eq!(pointer.latest_backup, "2026-08-07T10-00-00Z");
    }

    #[test]
    fn test_deleting_last_session_removes_pointer_file() {
        let temp_dir = TempDir::new().unwrap();
        let backup_root = temp_dir.path().to_path_buf();

        make_session(&backup_root, "2026-08-07T10-00-00Z", 1);
        delete_backup(&backup_root, "2026-08-07T10-00-00Z").unwrap();

        assert!(LatestPointer::load(&backup_root).unwrap().is_none());
        assert!(!LatestPointer::path(&backup_root).exists());
    }

    #[test]
    fn test_pointer_survives_corrupt_manifest_on_newest() {
        let temp_dir = TempDir::new().unwrap();
        let backup_root = temp_dir.path().to_path_buf();

        make_session(&backup_root, "2026-08-06T10-00-00Z", 2);
        make_session(&backup_root, "2026-08-07T10-00-00Z", 3);
        fs::write(
            backup_root.join("backup_2026-08-07T10-00-00Z/backup_info.json"),
            "not json",
        )
        .unwrap();

        make_session(&backup_root, "2026-08-08T10-00-00Z", 4);
        delete_backup(&backup_root, "2026-08-08T10-00-00Z").unwrap();

        // The newest remaining session has an unreadable manifest; the
        // pointer still names it, with an empty manifest body.
        let pointer = LatestPointer::load(&backup_root).unwrap().unwrap();
        assert_eq!(pointer.latest_backup, "2026-08-07T10-00-00Z");
        assert_eq!(pointer.info.total_documents, 0);
    }
}
