use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{BACKUP_INFO_FILE, LATEST_POINTER_FILE};
use crate::fs_utils;

/// Per-collection record in a session manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CollectionStatus {
    /// The collection was read and written out in full.
    #[serde(rename_all = "camelCase")]
    Backed {
        document_count: usize,
        file_path: String,
        file_size: u64,
    },

    /// The collection could not be backed up; sibling collections were unaffected.
    Failed { error: String },
}

/// Session manifest, written once as `backup_info.json` after every
/// collection has been attempted. Never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    /// Session identifier (the timestamp suffix of the session directory)
    pub timestamp: String,

    pub created_at: DateTime<Utc>,

    /// One entry per registered collection, success or failure
    pub collections: BTreeMap<String, CollectionStatus>,

    /// Sum of documentCount over successful collections
    pub total_documents: usize,
}

impl BackupInfo {
    /// Create an empty manifest for a session
    pub fn new(timestamp: String) -> Self {
        Self {
            timestamp,
            created_at: Utc::now(),
            collections: BTreeMap::new(),
            total_documents: 0,
        }
    }

    /// Record a successfully dumped collection
    pub fn record_success(
        &mut self,
        collection: &str,
        document_count: usize,
        file_path: String,
        file_size: u64,
    ) {
        self.total_documents += document_count;
        self.collections.insert(
            collection.to_string(),
            CollectionStatus::Backed {
                document_count,
                file_path,
                file_size,
            },
        );
    }

    /// Record a failed collection. The failure is confined to this entry.
    pub fn record_failure(&mut self, collection: &str, error: String) {
        self.collections
            .insert(collection.to_string(), CollectionStatus::Failed { error });
    }

    /// Number of collections that failed during the session
    pub fn error_count(&self) -> usize {
        self.collections
            .values()
            .filter(|status| matches!(status, CollectionStatus::Failed { .. }))
            .count()
    }

    /// Path of the manifest file inside a session directory
    pub fn path(session_dir: &Path) -> PathBuf {
        session_dir.join(BACKUP_INFO_FILE)
    }

    /// Load the manifest of a session
    pub fn load(session_dir: &Path) -> Result<Self> {
        let path = Self::path(session_dir);

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))
    }

    /// Save the manifest into a session directory
    pub fn save(&self, session_dir: &Path) -> Result<()> {
        let path = Self::path(session_dir);

        let content = serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;

        fs_utils::atomic_write(&path, content.as_bytes())
            .with_context(|| format!("Failed to write manifest: {}", path.display()))
    }
}

/// `latest_backup.json` at the backup root: names the most recently created
/// session still on disk, with a copy of its manifest. Always recomputed
/// from the catalog, never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestPointer {
    pub latest_backup: String,

    pub backup_path: String,

    #[serde(flatten)]
    pub info: BackupInfo,
}

impl LatestPointer {
    pub fn new(session_dir: &Path, info: BackupInfo) -> Self {
        Self {
            latest_backup: info.timestamp.clone(),
            backup_path: session_dir.display().to_string(),
            info,
        }
    }

    /// Path of the pointer file under a backup root
    pub fn path(backup_root: &Path) -> PathBuf {
        backup_root.join(LATEST_POINTER_FILE)
    }

    /// Overwrite the pointer file
    pub fn save(&self, backup_root: &Path) -> Result<()> {
        let path = Self::path(backup_root);

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize latest pointer")?;

        fs_utils::atomic_write(&path, content.as_bytes())
            .with_context(|| format!("Failed to write latest pointer: {}", path.display()))
    }

    /// Load the pointer if present
    pub fn load(backup_root: &Path) -> Result<Option<Self>> {
        let path = Self::path(backup_root);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read latest pointer: {}", path.display()))?;

        let pointer = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse latest pointer: {}", path.display()))?;

        Ok(Some(pointer))
    }

    /// Remove the pointer file; an absent file is not an error
    pub fn remove(backup_root: &Path) -> Result<()> {
        let path = Self::path(backup_root);

        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove latest pointer: {}", path.display()))?;
        }

        Ok(())
    }
}

/// Format a byte size into human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
    else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    }
    else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    }
    else {
        format!("{} B", bytes)
    }
}
