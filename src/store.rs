use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Field under which the store keeps its assigned document identifier.
pub const ID_FIELD: &str = "_id";

/// Collection-level store failure. Row-level insert problems are reported
/// through [`InsertReport`] instead and never abort an operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open document store at {path}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to access collection '{collection}'")]
    Io {
        collection: String,
        #[source]
        source: std::io::Error,
    },

    #[error("collection '{collection}' holds invalid data: {message}")]
    Corrupt { collection: String, message: String },
}

/// One rejected document inside a bulk insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertFailure {
    /// Position of the document in the submitted batch
    pub index: usize,
    pub message: String,
}

/// Result of a bulk insert: the documents actually written (with their
/// `_id` set) plus any row-level rejections.
#[derive(Debug, Default)]
pub struct InsertReport {
    pub inserted: Vec<Value>,
    pub failures: Vec<InsertFailure>,
}

/// The persistent document store, one logical collection per name.
///
/// Bulk inserts use unordered semantics: a rejected document never prevents
/// the remaining documents of the batch from being inserted.
pub trait DocumentStore {
    /// Read every document in the collection.
    fn find_all(&self, collection: &str) -> Result<Vec<Value>, StoreError>;

    /// Remove every document in the collection, returning how many were removed.
    fn delete_all(&self, collection: &str) -> Result<usize, StoreError>;

    /// Insert a batch of documents, continuing past row-level failures.
    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Value>,
    ) -> Result<InsertReport, StoreError>;
}

/// File-backed document store: each collection is a pretty-printed JSON
/// array in `<data_dir>/<collection>.json`.
pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    /// Open the store, creating the data directory if it does not exist yet.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(data_dir).map_err(|source| StoreError::Open {
            path: data_dir.display().to_string(),
            source,
        })?;

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
        })
    }

    /// Path of the file backing a collection.
    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", collection))
    }

    fn read_collection(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let path = self.collection_path(collection);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            collection: collection.to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            collection: collection.to_string(),
            message: e.to_string(),
        })
    }

    fn write_collection(&self, collection: &str, documents: &[Value]) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(documents).map_err(|e| StoreError::Corrupt {
            collection: collection.to_string(),
            message: e.to_string(),
        })?;

        fs::write(self.collection_path(collection), body).map_err(|source| StoreError::Io {
            collection: collection.to_string(),
            source,
        })
    }
}

impl DocumentStore for JsonStore {
    fn find_all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        self.read_collection(collection)
    }

    fn delete_all(&self, collection: &str) -> Result<usize, StoreError> {
        let existing = self.read_collection(collection)?;
        self.write_collection(collection, &[])?;
        Ok(existing.len())
    }

    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Value>,
    ) -> Result<InsertReport, StoreError> {
        let mut stored = self.read_collection(collection)?;

        let mut seen: HashSet<String> = stored
            .iter()
            .filter_map(|doc| doc.get(ID_FIELD).and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        let mut report = InsertReport::default();

        for (index, document) in documents.into_iter().enumerate() {
            match prepare_document(document, &mut seen) {
                Ok(document) => {
                    stored.push(document.clone());
                    report.inserted.push(document);
                }
                Err(message) => {
                    report.failures.push(InsertFailure { index, message });
                }
            }
        }

        self.write_collection(collection, &stored)?;
        Ok(report)
    }
}

/// Validate one incoming document and make sure it carries an identifier.
/// Documents without an `_id` get a fresh UUID; provided ids are preserved.
fn prepare_document(document: Value, seen: &mut HashSet<String>) -> Result<Value, String> {
    let Value::Object(mut fields) = document else {
        return Err("document is not a JSON object".to_string());
    };

    let id = match fields.get(ID_FIELD) {
        None => {
            let id = Uuid::new_v4().to_string();
            fields.insert(ID_FIELD.to_string(), Value::String(id.clone()));
            id
        }
        Some(Value::String(id)) => id.clone(),
        Some(_) => return Err(format!("'{}' is not a string", ID_FIELD)),
    };

    if !seen.insert(id.clone()) {
        return Err(format!("duplicate '{}': {}", ID_FIELD, id));
    }

    Ok(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_store(temp_dir: &TempDir) -> JsonStore {
        JsonStore::open(&temp_dir.path().join("data")).unwrap()
    }

    #[test]
    fn test_open_creates_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");

        assert!(!data_dir.exists());
        JsonStore::open(&data_dir).unwrap();
        assert!(data_dir.is_dir());
    }

    #[test]
    fn test_find_all_missing_collection_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        assert!(store.find_all("admins").unwrap().is_empty());
    }

    #[test]
    fn test_insert_assigns_fresh_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        let report = store
            .insert_many("admins", vec![json!({"username": "root"})])
            .unwrap();

        assert_eq!(report.inserted.len(), 1);
        assert!(report.failures.is_empty());

        let id = report.inserted[0].get(ID_FIELD).unwrap().as_str().unwrap();
        assert!(!id.is_empty());

        let found = store.find_all("admins").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("username").unwrap(), "root");
        assert_eq!(found[0].get(ID_FIELD).unwrap().as_str().unwrap(), id);
    }

    #[test]
    fn test_insert_preserves_provided_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        let report = store
            .insert_many("admins", vec![json!({"_id": "a-1", "username": "root"})])
            .unwrap();

        assert_eq!(report.inserted[0].get(ID_FIELD).unwrap(), "a-1");
    }

    #[test]
    fn test_insert_rejects_duplicate_id_but_keeps_siblings() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store
            .insert_many("admins", vec![json!({"_id": "a-1", "username": "root"})])
            .unwrap();

        let report = store
            .insert_many(
                "admins",
                vec![
                    json!({"_id": "a-1", "username": "clone"}),
                    json!({"_id": "a-2", "username": "ops"}),
                ],
            )
            .unwrap();

        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 0);
        assert!(report.failures[0].message.contains("duplicate"));

        let found = store.find_all("admins").unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_insert_rejects_non_object_documents() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        let report = store
            .insert_many(
                "admins",
                vec![json!(42), json!({"username": "root"}), json!("text")],
            )
            .unwrap();

        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].index, 0);
        assert_eq!(report.failures[1].index, 2);
        assert_eq!(store.find_all("admins").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_all_returns_removed_count() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store
            .insert_many(
                "batches",
                vec![json!({"batchNum": 1}), json!({"batchNum": 2})],
            )
            .unwrap();

        assert_eq!(store.delete_all("batches").unwrap(), 2);
        assert!(store.find_all("batches").unwrap().is_empty());
        assert_eq!(store.delete_all("batches").unwrap(), 0);
    }

    #[test]
    fn test_corrupt_collection_file_is_a_store_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        fs::write(store.collection_path("admins"), "not json").unwrap();

        let err = store.find_all("admins").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert!(err.to_string().contains("admins"));
    }

    #[test]
    fn test_collection_file_is_pretty_printed_array() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store
            .insert_many("admins", vec![json!({"username": "root"})])
            .unwrap();

        let content = fs::read_to_string(store.collection_path("admins")).unwrap();
        assert!(content.starts_with('['));
        assert!(content.contains('\n'));
    }
}
