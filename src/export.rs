use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{APPLICATION_NAME, EXPORT_FILE_PREFIX, EXPORT_FORMAT_VERSION};
use crate::fs_utils;
use crate::registry;
use crate::store::{DocumentStore, StoreError};
use crate::timestamp;

/// Bundle header: when and by what the export was produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub export_date: DateTime<Utc>,
    pub version: u32,
    pub application: String,
}

impl ExportMetadata {
    fn new() -> Self {
        Self {
            export_date: Utc::now(),
            version: EXPORT_FORMAT_VERSION,
            application: APPLICATION_NAME.to_string(),
        }
    }
}

/// Per-collection document counts plus the derived embedded-student count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportStatistics {
    /// Documents per collection
    pub documents: BTreeMap<String, usize>,

    pub total_documents: usize,

    /// Students embedded in batch documents (not counted in totalDocuments)
    pub total_students: usize,
}

/// The single-file, all-collections export artifact.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub metadata: ExportMetadata,
    pub statistics: ExportStatistics,
    pub collections: BTreeMap<String, Vec<Value>>,
}

/// Result of a completed export.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOutcome {
    pub file_path: PathBuf,
    pub file_name: String,
    pub file_size: u64,
    pub statistics: ExportStatistics,
    pub metadata: ExportMetadata,
}

/// Export every registered collection into one bundle file.
///
/// Collection reads are issued concurrently; the bundle is assembled only
/// after all of them complete. Unlike a backup session this artifact is
/// all-or-nothing: a failure reading any single collection aborts the whole
/// export and no file is written.
pub fn export_all_data<S: DocumentStore + Sync>(
    store: &S,
    export_dir: &Path,
) -> Result<ExportOutcome> {
    fs_utils::ensure_dir(export_dir)?;

    let reads: Vec<Result<(&'static str, Vec<Value>), StoreError>> = registry::COLLECTIONS
        .par_iter()
        .map(|spec| {
            store
                .find_all(spec.name)
                .map(|documents| (spec.name, documents))
        })
        .collect();

    let mut collections = BTreeMap::new();
    for read in reads {
        let (name, documents) = read?;
        collections.insert(name.to_string(), documents);
    }

    let statistics = compute_statistics(&collections);
    let bundle = ExportBundle {
        metadata: ExportMetadata::new(),
        statistics: statistics.clone(),
        collections,
    };

    let file_name = format!("{}_{}.json", EXPORT_FILE_PREFIX, timestamp::now_name());
    let file_path = export_dir.join(&file_name);

    let body = serde_json::to_string_pretty(&bundle).context("Failed to serialize export bundle")?;
    fs_utils::atomic_write(&file_path, body.as_bytes())
        .with_context(|| format!("Failed to write export file: {}", file_path.display()))?;

    let file_size = fs::metadata(&file_path)
        .with_context(|| format!("Failed to stat export file: {}", file_path.display()))?
        .len();

    Ok(ExportOutcome {
        file_path,
        file_name,
        file_size,
        statistics,
        metadata: bundle.metadata,
    })
}

/// Count documents per collection and students embedded in batch documents.
fn compute_statistics(collections: &BTreeMap<String, Vec<Value>>) -> ExportStatistics {
    let mut documents = BTreeMap::new();
    let mut total_documents = 0;
    let mut total_students = 0;

    for spec in registry::COLLECTIONS {
        let docs = collections.get(spec.name).map(Vec::as_slice).unwrap_or(&[]);

        documents.insert(spec.name.to_string(), docs.len());
        total_documents += docs.len();
        total_students += docs
            .iter()
            .map(|doc| spec.embedded_students(doc))
            .sum::<usize>();
    }

    ExportStatistics {
        documents,
        total_documents,
        total_students,
    }
}

/// One exported bundle file as seen on disk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEntry {
    pub file_name: String,

    pub size: u64,

    pub created: Option<DateTime<Utc>>,

    pub modified: Option<DateTime<Utc>>,

    /// Bundle metadata; None when the file cannot be parsed
    pub metadata: Option<ExportMetadata>,
}

/// List exported bundle files, most recent first.
///
/// Ordering by file name is chronological because the name suffix is a
/// lexicographically time-ordered timestamp.
pub fn list_exported_files(export_dir: &Path) -> Result<Vec<ExportEntry>> {
    if !export_dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();

    for entry in fs::read_dir(export_dir)
        .with_context(|| format!("Failed to read export directory: {}", export_dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !path.is_file()
            || !file_name.starts_with(EXPORT_FILE_PREFIX)
            || !file_name.ends_with(".json")
        {
            continue;
        }

        let meta = entry
            .metadata()
            .with_context(|| format!("Failed to stat export file: {}", path.display()))?;

        entries.push(ExportEntry {
            file_name: file_name.to_string(),
            size: meta.len(),
            created: meta.created().ok().map(DateTime::from),
            modified: meta.modified().ok().map(DateTime::from),
            metadata: read_bundle_metadata(&path),
        });
    }

    entries.sort_by(|a, b| b.file_name.cmp(&a.file_name));

    Ok(entries)
}

/// Best-effort read of the metadata block of a bundle file.
fn read_bundle_metadata(path: &Path) -> Option<ExportMetadata> {
    let content = fs::read_to_string(path).ok()?;
    let value: Value = serde_json::from_str(&content).ok()?;
    serde_json::from_value(value.get("metadata")?.clone()).ok()
}

/// Delete an exported bundle file by name.
///
/// The name is resolved against the export directory; a resolved path that
/// escapes it is rejected.
pub fn delete_exported_file(export_dir: &Path, file_name: &str) -> Result<String> {
    let path = fs_utils::resolve_in_dir(export_dir, file_name)?;

    fs::remove_file(&path)
        .with_context(|| format!("Failed to delete export file: {}", path.display()))?;

    Ok(file_name.to_string())
}
