use anyhow::{Context, Result, bail};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Atomically write data to a file using temp file + rename
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory: {}", parent.display()))?;
    }

    let parent = path.parent().unwrap_or(Path::new("."));
    let temp_path = parent.join(format!(
        ".edubak_tmp_{}_{}",
        std::process::id(),
        rand_suffix()
    ));

    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

    file.write_all(data)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

    file.sync_all()
        .with_context(|| format!("Failed to sync temp file: {}", temp_path.display()))?;

    drop(file);

    fs::rename(&temp_path, path).with_context(|| {
        let _ = fs::remove_file(&temp_path);
        format!("Failed to rename temp file to: {}", path.display())
    })?;

    Ok(())
}

/// Generate a random suffix for temp files
fn rand_suffix() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    duration.as_nanos() as u64
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// On-disk size of a directory, counted over its immediate children files.
pub fn dir_size(dir: &Path) -> Result<u64> {
    let mut total = 0u64;

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() {
            if let Ok(metadata) = entry.metadata() {
                total += metadata.len();
            }
        }
    }

    Ok(total)
}

/// Resolve a file name against a directory, rejecting any resolved path
/// that escapes it. The file must exist.
pub fn resolve_in_dir(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let base = dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve directory: {}", dir.display()))?;

    let candidate = base.join(file_name);
    let resolved = candidate
        .canonicalize()
        .with_context(|| format!("File not found: {}", candidate.display()))?;

    if !resolved.starts_with(&base) {
        bail!("Path '{}' escapes directory {}", file_name, dir.display());
    }

    Ok(resolved)
}
