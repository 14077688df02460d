mod backup;
mod catalog;
mod cli;
mod config;
mod export;
mod fs_utils;
mod history;
mod import;
mod manifest;
mod progress;
mod registry;
mod restore;
mod store;
mod timestamp;

// Re-export public APIs
pub use backup::{BackupOutcome, create_backup};
pub use catalog::{BackupEntry, delete_backup, list_backups, refresh_latest_pointer};
pub use cli::{Cli, Commands};
pub use config::{CONFIG_FILENAME, Config, EDUBAK_DIR, HISTORY_LOG_FILE, find_repo_root};
pub use export::{
    ExportBundle, ExportEntry, ExportMetadata, ExportOutcome, ExportStatistics,
    delete_exported_file, export_all_data, list_exported_files,
};
pub use history::{HistoryEntry, filter_by_target, log_entry, read_history, take_last};
pub use import::{
    CollectionImport, ImportErrorEntry, ImportOptions, ImportReport, ImportStatus,
    import_all_data,
};
pub use manifest::{BackupInfo, CollectionStatus, LatestPointer, format_size};
pub use progress::{ProgressConfig, Spinner, Timer};
pub use registry::{COLLECTIONS, CollectionSpec};
pub use restore::{RestoreReport, RestoreStatus, restore_backup};
pub use store::{
    DocumentStore, ID_FIELD, InsertFailure, InsertReport, JsonStore, StoreError,
};
pub use timestamp::{now_name, parse_name, timestamp_name};
