use serde_json::Value;

/// One logical collection known to both the per-directory backup format and
/// the single-file export format.
#[derive(Debug)]
pub struct CollectionSpec {
    /// Collection name in the store and in on-disk artifacts
    pub name: &'static str,

    /// Field holding embedded student documents, for collections that carry them
    pub students_field: Option<&'static str>,
}

/// The registered collections, in backup/export order.
///
/// This table is the single source of truth for which collections are in
/// scope: backup, restore, export, and import all iterate it, so bringing a
/// new collection into the system is exactly one edit here.
pub const COLLECTIONS: &[CollectionSpec] = &[
    CollectionSpec {
        name: "admins",
        students_field: None,
    },
    CollectionSpec {
        name: "batches",
        students_field: Some("students"),
    },
    CollectionSpec {
        name: "placementdone",
        students_field: None,
    },
    CollectionSpec {
        name: "timerestrictions",
        students_field: None,
    },
];

impl CollectionSpec {
    /// Number of students embedded in one document of this collection.
    pub fn embedded_students(&self, document: &Value) -> usize {
        match self.students_field {
            Some(field) => document
                .get(field)
                .and_then(Value::as_array)
                .map_or(0, |students| students.len()),
            None => 0,
        }
    }
}

/// Look up a registered collection by name.
pub fn find(name: &str) -> Option<&'static CollectionSpec> {
    COLLECTIONS.iter().find(|spec| spec.name == name)
}

/// Whether a name belongs to the registry.
pub fn is_registered(name: &str) -> bool {
    find(name).is_some()
}

/// Names of all registered collections, in registry order.
pub fn collection_names() -> Vec<&'static str> {
    COLLECTIONS.iter().map(|spec| spec.name).collect()
}
