use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::config;

/// History entry representing a single operation, stored as one JSON line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Timestamp in UTC (ISO 8601)
    pub timestamp: String,
    /// Operation executed (BACKUP, RESTORE, DELETE, EXPORT, IMPORT, DELETE-EXPORT)
    pub command: String,
    /// Session id or file name the operation acted on (if applicable)
    pub target: Option<String>,
    /// Flags used (e.g., "--clear", "--yes")
    pub flags: Vec<String>,
}

impl HistoryEntry {
    /// Create a new history entry with current timestamp
    pub fn new(command: &str, target: Option<&str>, flags: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            command: command.to_uppercase(),
            target: target.map(|t| t.to_string()),
            flags,
        }
    }

    /// Format entry for display
    pub fn display(&self) -> String {
        let mut result = format!("{} {:<14}", self.timestamp, self.command);

        match self.target {
            Some(ref target) => result.push_str(&format!(" {:<24}", target)),
            None => result.push_str(&format!(" {:<24}", "")),
        }

        if !self.flags.is_empty() {
            result.push_str(&format!(" {}", self.flags.join(" ")));
        }

        result
    }
}

/// Append an entry to the history log. Best-effort: a failure to record
/// history never fails the operation being logged.
pub fn log_entry(root: &Path, entry: &HistoryEntry) {
    let history_path = config::get_edubak_dir(root).join(config::HISTORY_LOG_FILE);

    if let Some(parent) = history_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let result = serde_json::to_string(entry)
        .map_err(std::io::Error::other)
        .and_then(|line| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&history_path)
                .and_then(|mut file| {
                    writeln!(file, "{}", line)?;
                    file.flush()
                })
        });

    if let Err(e) = result {
        eprintln!("Warning: Failed to write to history log: {}", e);
    }
}

/// Read all history entries from the log file, skipping unparsable lines
pub fn read_history(root: &Path) -> Result<Vec<HistoryEntry>> {
    let history_path = config::get_edubak_dir(root).join(config::HISTORY_LOG_FILE);

    if !history_path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(&history_path)
        .with_context(|| format!("Failed to open history file: {}", history_path.display()))?;

    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(entry) => entries.push(entry),
            Err(_) => eprintln!("Warning: skipping malformed history line"),
        }
    }

    Ok(entries)
}

/// Filter history entries by target (session id or file name)
pub fn filter_by_target(entries: Vec<HistoryEntry>, target: &str) -> Vec<HistoryEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.target.as_deref() == Some(target))
        .collect()
}

/// Get last N entries
pub fn take_last(entries: Vec<HistoryEntry>, n: usize) -> Vec<HistoryEntry> {
    let len = entries.len();
    if len <= n {
        entries
    }
    else {
        entries[len - n..].to_vec()
    }
}
