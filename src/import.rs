use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::export::ExportMetadata;
use crate::registry;
use crate::store::{DocumentStore, ID_FIELD, InsertReport};

/// Options for a bulk import.
#[derive(Debug, Default, Clone)]
pub struct ImportOptions {
    /// Delete existing documents in each target collection before inserting
    pub clear_existing: bool,

    /// Collections to import; None means every registered collection
    pub collections: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Success,
    NoData,
    Error,
}

impl ImportStatus {
    /// Wire name of the status, as it appears in JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Success => "success",
            ImportStatus::NoData => "no_data",
            ImportStatus::Error => "error",
        }
    }
}

/// Outcome for one requested collection.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionImport {
    pub imported: usize,

    pub status: ImportStatus,

    /// Failure detail; also set on success when individual rows were rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportErrorEntry {
    pub collection: String,
    pub error: String,
}

/// Result of one import invocation. Returned to the caller, never persisted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub collections: BTreeMap<String, CollectionImport>,

    pub total_imported: usize,

    pub errors: Vec<ImportErrorEntry>,

    /// Metadata block of the source bundle, when present
    pub source_metadata: Option<ExportMetadata>,
}

/// Import a bundle file into the store.
///
/// Store-assigned identifiers are stripped from every document before
/// insertion, so imported documents receive fresh ids and cannot collide
/// with or overwrite records already in the store. Row-level insert
/// failures are isolated; a collection-level failure is recorded and the
/// loop continues with the next collection. Only file-level problems
/// (missing file, unparsable content, missing top-level `collections` key)
/// abort the operation.
pub fn import_all_data<S: DocumentStore>(
    store: &S,
    file_path: &Path,
    options: &ImportOptions,
) -> Result<ImportReport> {
    if !file_path.is_file() {
        bail!("Import file not found: {}", file_path.display());
    }

    let content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read import file: {}", file_path.display()))?;

    let bundle: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse import file: {}", file_path.display()))?;

    let Some(bundle_collections) = bundle.get("collections").and_then(Value::as_object) else {
        bail!(
            "Import file has no top-level 'collections' object: {}",
            file_path.display()
        );
    };

    let source_metadata = bundle
        .get("metadata")
        .and_then(|m| serde_json::from_value(m.clone()).ok());

    let requested: Vec<String> = match &options.collections {
        Some(names) => names.clone(),
        None => registry::collection_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    };

    let mut report = ImportReport {
        collections: BTreeMap::new(),
        total_imported: 0,
        errors: Vec::new(),
        source_metadata,
    };

    for name in requested {
        if !registry::is_registered(&name) {
            eprintln!("Warning: skipping unknown collection '{}'", name);
            continue;
        }

        let documents = bundle_collections
            .get(&name)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        if documents.is_empty() {
            report.collections.insert(
                name,
                CollectionImport {
                    imported: 0,
                    status: ImportStatus::NoData,
                    error: None,
                },
            );
            continue;
        }

        let outcome = match import_collection(store, &name, documents, options.clear_existing) {
            Ok(inserted) => {
                report.total_imported += inserted.inserted.len();

                let error = summarize_rejections(&inserted);
                if let Some(ref detail) = error {
                    report.errors.push(ImportErrorEntry {
                        collection: name.clone(),
                        error: detail.clone(),
                    });
                }

                CollectionImport {
                    imported: inserted.inserted.len(),
                    status: ImportStatus::Success,
                    error,
                }
            }
            Err(e) => {
                let error = format!("{:#}", e);
                eprintln!("Warning: failed to import collection '{}': {}", name, error);
                report.errors.push(ImportErrorEntry {
                    collection: name.clone(),
                    error: error.clone(),
                });

                CollectionImport {
                    imported: 0,
                    status: ImportStatus::Error,
                    error: Some(error),
                }
            }
        };

        report.collections.insert(name, outcome);
    }

    Ok(report)
}

/// Clear (optionally) and bulk-insert one collection's documents with
/// identifiers stripped.
fn import_collection<S: DocumentStore>(
    store: &S,
    name: &str,
    documents: Vec<Value>,
    clear_existing: bool,
) -> Result<InsertReport> {
    if clear_existing {
        store.delete_all(name)?;
    }

    let stripped: Vec<Value> = documents.into_iter().map(strip_id).collect();
    Ok(store.insert_many(name, stripped)?)
}

/// Remove the store-assigned identifier so the insert allocates a fresh one.
fn strip_id(mut document: Value) -> Value {
    if let Some(fields) = document.as_object_mut() {
        fields.remove(ID_FIELD);
    }
    document
}

/// Human-readable summary of row-level rejections, if any.
fn summarize_rejections(report: &InsertReport) -> Option<String> {
    if report.failures.is_empty() {
        return None;
    }

    let details: Vec<String> = report
        .failures
        .iter()
        .map(|failure| format!("document {}: {}", failure.index, failure.message))
        .collect();

    Some(format!(
        "{} document(s) rejected ({})",
        report.failures.len(),
        details.join("; ")
    ))
}
