use anyhow::Result;
use std::path::Path;

use edubak::{
    BackupEntry, CONFIG_FILENAME, Cli, Commands, Config, HistoryEntry, ImportOptions, JsonStore,
    ProgressConfig, RestoreStatus, Spinner, Timer, create_backup, delete_backup,
    delete_exported_file, export_all_data, filter_by_target, find_repo_root, format_size,
    import_all_data, list_backups, list_exported_files, log_entry, read_history, restore_backup,
    take_last,
};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    if matches!(cli.command, Commands::Init) {
        return cmd_init();
    }

    let root = find_repo_root()?;
    let config_path = root.join(CONFIG_FILENAME);
    let config = Config::load(&config_path)?;

    match cli.command {
        Commands::Backup {
            json,
            progress,
            no_progress,
        } => {
            let progress_config = ProgressConfig::from_flags(progress, no_progress, config.progress);
            cmd_backup(&root, &config, json, progress_config)
        }
        Commands::Restore {
            timestamp,
            yes,
            json,
            progress,
            no_progress,
        } => {
            let progress_config = ProgressConfig::from_flags(progress, no_progress, config.progress);
            cmd_restore(&root, &config, &timestamp, yes, json, progress_config)
        }
        Commands::List { json } => cmd_list(&root, &config, json),
        Commands::Delete { timestamp } => cmd_delete(&root, &config, &timestamp),
        Commands::Export {
            json,
            progress,
            no_progress,
        } => {
            let progress_config = ProgressConfig::from_flags(progress, no_progress, config.progress);
            cmd_export(&root, &config, json, progress_config)
        }
        Commands::Import {
            file,
            clear,
            collections,
            json,
        } => cmd_import(&root, &config, &file, clear, collections, json),
        Commands::Exports { json } => cmd_exports(&root, &config, json),
        Commands::DeleteExport { file_name } => cmd_delete_export(&root, &config, &file_name),
        Commands::Init => unreachable!(), // Handled above
        Commands::History { last, target, json } => cmd_history(&root, last, target, json),
    }
}

/// Initialize a new .edubak.toml configuration file
fn cmd_init() -> Result<()> {
    use std::io::Write;

    let config_path = Path::new(CONFIG_FILENAME);

    if config_path.exists() {
        anyhow::bail!(
            "Configuration file '{}' already exists.\n\
             Delete it first if you want to recreate it.",
            CONFIG_FILENAME
        );
    }

    let default_config = r#"# edubak Configuration

# Directory holding the document store's collection files
data_dir = "data"

# Directory receiving backup sessions (backup_<timestamp>/)
backup_dir = "backups"

# Directory receiving export bundle files
export_dir = "exports"

# Show progress indicators (optional)
# true  = Always show progress indicators
# false = Never show progress indicators
# Omit this option to auto-detect (shows progress if stderr is a TTY)
# Can be overridden with --progress or --no-progress flags
# progress = true
"#;

    let mut file = std::fs::File::create(config_path)?;
    file.write_all(default_config.as_bytes())?;

    println!("Created '{}'", CONFIG_FILENAME);
    println!("\nNext steps:");
    println!("  1. Edit {}", CONFIG_FILENAME);
    println!("  2. Run 'edubak backup' to create your first backup");

    Ok(())
}

/// Create a backup session
fn cmd_backup(
    root: &Path,
    config: &Config,
    json: bool,
    progress_config: ProgressConfig,
) -> Result<()> {
    let timer = Timer::new();
    let store = JsonStore::open(&config.data_path(root))?;

    let spinner = Spinner::new(progress_config, "Backing up collections");
    let outcome = create_backup(&store, &config.backup_path(root));
    spinner.finish();
    let outcome = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    else {
        println!(
            "Backup '{}' created at {}",
            outcome.backup_info.timestamp,
            outcome.backup_path.display()
        );
        println!("  Documents: {}", outcome.backup_info.total_documents);

        let failed = outcome.backup_info.error_count();
        if failed > 0 {
            println!(
                "  Collections with errors: {} (see backup_info.json)",
                failed
            );
        }
        println!("  Time: {}", timer.elapsed_string());
    }

    let entry = HistoryEntry::new("BACKUP", Some(&outcome.backup_info.timestamp), Vec::new());
    log_entry(root, &entry);

    Ok(())
}

/// Restore a backup session
fn cmd_restore(
    root: &Path,
    config: &Config,
    timestamp: &str,
    yes: bool,
    json: bool,
    progress_config: ProgressConfig,
) -> Result<()> {
    if !yes {
        use std::io::{self, Write};

        print!(
            "Restoring '{}' will replace current collection contents. Continue? [y/N] ",
            timestamp
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input != "y" && input != "yes" {
            println!("Aborted.");
            return Ok(());
        }
    }

    let timer = Timer::new();
    let store = JsonStore::open(&config.data_path(root))?;

    let spinner = Spinner::new(progress_config, "Restoring collections");
    let report = restore_backup(&store, &config.backup_path(root), timestamp);
    spinner.finish();
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    else {
        println!("Backup '{}' restored", timestamp);
        println!("  Documents restored: {}", report.total_restored);
        for (name, status) in &report.collections {
            println!("  {:<18} {}", name, describe_restore_status(status));
        }
        println!("  Time: {}", timer.elapsed_string());
    }

    let mut flags = Vec::new();
    if yes {
        flags.push("--yes".to_string());
    }
    let entry = HistoryEntry::new("RESTORE", Some(timestamp), flags);
    log_entry(root, &entry);

    Ok(())
}

/// One line of the per-collection restore table
fn describe_restore_status(status: &RestoreStatus) -> String {
    match status {
        RestoreStatus::Restored { document_count } => {
            format!("restored {} document(s)", document_count)
        }
        RestoreStatus::Skipped { reason } => format!("skipped ({})", reason),
        RestoreStatus::Error { error } => format!("error: {}", error),
    }
}

/// List all backup sessions
fn cmd_list(root: &Path, config: &Config, json: bool) -> Result<()> {
    let sessions = list_backups(&config.backup_path(root))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No backups found.");
        println!("\nCreate one with: edubak backup");
        return Ok(());
    }

    println!("Backups ({}):\n", sessions.len());
    println!(
        "{:<24} {:>10} {:>8} {:>8}",
        "TIMESTAMP", "SIZE", "DOCS", "ERRORS"
    );
    println!("{}", "-".repeat(54));

    for session in &sessions {
        println!(
            "{:<24} {:>10} {:>8} {:>8}",
            session.timestamp,
            format_size(session.size),
            describe_docs(session),
            describe_errors(session),
        );
    }

    Ok(())
}

fn describe_docs(session: &BackupEntry) -> String {
    match &session.info {
        Some(info) => info.total_documents.to_string(),
        None => "-".to_string(),
    }
}

fn describe_errors(session: &BackupEntry) -> String {
    match &session.info {
        Some(info) => info.error_count().to_string(),
        None => "-".to_string(),
    }
}

/// Delete a backup session
fn cmd_delete(root: &Path, config: &Config, timestamp: &str) -> Result<()> {
    let deleted = delete_backup(&config.backup_path(root), timestamp)?;

    println!("Deleted backup '{}'", deleted);

    let entry = HistoryEntry::new("DELETE", Some(timestamp), Vec::new());
    log_entry(root, &entry);

    Ok(())
}

/// Export all collections into one bundle file
fn cmd_export(
    root: &Path,
    config: &Config,
    json: bool,
    progress_config: ProgressConfig,
) -> Result<()> {
    let timer = Timer::new();
    let store = JsonStore::open(&config.data_path(root))?;

    let spinner = Spinner::new(progress_config, "Exporting collections");
    let outcome = export_all_data(&store, &config.export_path(root));
    spinner.finish();
    let outcome = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    else {
        println!("Exported to {}", outcome.file_path.display());
        println!("  Size: {}", format_size(outcome.file_size));
        println!("  Documents: {}", outcome.statistics.total_documents);
        println!("  Embedded students: {}", outcome.statistics.total_students);
        println!("  Time: {}", timer.elapsed_string());
    }

    let entry = HistoryEntry::new("EXPORT", Some(&outcome.file_name), Vec::new());
    log_entry(root, &entry);

    Ok(())
}

/// Import a bundle file into the store
fn cmd_import(
    root: &Path,
    config: &Config,
    file: &Path,
    clear: bool,
    collections: Option<Vec<String>>,
    json: bool,
) -> Result<()> {
    let timer = Timer::new();
    let store = JsonStore::open(&config.data_path(root))?;

    let options = ImportOptions {
        clear_existing: clear,
        collections: collections.clone(),
    };
    let report = import_all_data(&store, file, &options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    else {
        println!("Imported {} from {}", report.total_imported, file.display());
        println!("\n{:<18} {:>10} {:>10}", "COLLECTION", "STATUS", "IMPORTED");
        println!("{}", "-".repeat(40));
        for (name, outcome) in &report.collections {
            println!(
                "{:<18} {:>10} {:>10}",
                name,
                outcome.status.as_str(),
                outcome.imported
            );
        }

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for error in &report.errors {
                println!("  {}: {}", error.collection, error.error);
            }
        }
        println!("\nTime: {}", timer.elapsed_string());
    }

    let mut flags = Vec::new();
    if clear {
        flags.push("--clear".to_string());
    }
    if let Some(names) = collections {
        flags.push(format!("--collections={}", names.join(",")));
    }
    let target = file.file_name().map(|n| n.to_string_lossy().to_string());
    let entry = HistoryEntry::new("IMPORT", target.as_deref(), flags);
    log_entry(root, &entry);

    Ok(())
}

/// List exported bundle files
fn cmd_exports(root: &Path, config: &Config, json: bool) -> Result<()> {
    let entries = list_exported_files(&config.export_path(root))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No exported files found.");
        println!("\nCreate one with: edubak export");
        return Ok(());
    }

    println!("Exported files ({}):\n", entries.len());
    println!("{:<44} {:>10} {:<20}", "FILE", "SIZE", "MODIFIED");
    println!("{}", "-".repeat(76));

    for entry in &entries {
        let modified = entry
            .modified
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<44} {:>10} {:<20}",
            entry.file_name,
            format_size(entry.size),
            modified
        );
    }

    Ok(())
}

/// Delete an exported bundle file
fn cmd_delete_export(root: &Path, config: &Config, file_name: &str) -> Result<()> {
    let deleted = delete_exported_file(&config.export_path(root), file_name)?;

    println!("Deleted exported file '{}'", deleted);

    let entry = HistoryEntry::new("DELETE-EXPORT", Some(file_name), Vec::new());
    log_entry(root, &entry);

    Ok(())
}

/// Display operation history
fn cmd_history(
    root: &Path,
    last: Option<usize>,
    target_filter: Option<String>,
    json: bool,
) -> Result<()> {
    let mut entries = read_history(root)?;

    if entries.is_empty() {
        println!("No history available.");
        return Ok(());
    }

    if let Some(ref target) = target_filter {
        entries = filter_by_target(entries, target);
        if entries.is_empty() {
            println!("No history entries found for '{}'", target);
            return Ok(());
        }
    }

    if let Some(n) = last {
        entries = take_last(entries, n);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    }
    else {
        println!("Operation History:\n");
        println!(
            "{:<32} {:<14} {:<24} {}",
            "TIMESTAMP", "COMMAND", "TARGET", "FLAGS"
        );
        println!("{}", "-".repeat(80));
        for entry in &entries {
            println!("{}", entry.display());
        }
        println!("\nTotal entries: {}", entries.len());
    }

    Ok(())
}
