use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = ".edubak.toml";
pub const EDUBAK_DIR: &str = ".edubak";
pub const HISTORY_LOG_FILE: &str = "history.log";

pub const BACKUP_DIR_PREFIX: &str = "backup_";
pub const BACKUP_INFO_FILE: &str = "backup_info.json";
pub const LATEST_POINTER_FILE: &str = "latest_backup.json";
pub const EXPORT_FILE_PREFIX: &str = "edubak_export";
pub const EXPORT_FORMAT_VERSION: u32 = 1;
pub const APPLICATION_NAME: &str = "edubak";

/// Configuration loaded from .edubak.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the document store's collection files
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory receiving backup session directories
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    /// Directory receiving export bundle files
    #[serde(default = "default_export_dir")]
    pub export_dir: String,

    /// Show progress bars (default: auto-detect TTY)
    #[serde(default)]
    pub progress: Option<bool>,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_backup_dir() -> String {
    "backups".to_string()
}

fn default_export_dir() -> String {
    "exports".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backup_dir: default_backup_dir(),
            export_dir: default_export_dir(),
            progress: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!(
                "Configuration file not found: {}\n\
                 Create one with 'edubak init'.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let dirs = [
            ("data_dir", &self.data_dir),
            ("backup_dir", &self.backup_dir),
            ("export_dir", &self.export_dir),
        ];

        for (field, value) in dirs {
            if value.trim().is_empty() {
                bail!("Configuration error: '{}' is empty", field);
            }
            if value.contains("..") {
                bail!(
                    "Configuration error: '{}' contains '..', which is not allowed",
                    field
                );
            }
        }

        Ok(())
    }

    /// Directory holding the document store's collection files
    pub fn data_path(&self, root: &Path) -> PathBuf {
        root.join(&self.data_dir)
    }

    /// Root directory receiving backup sessions
    pub fn backup_path(&self, root: &Path) -> PathBuf {
        root.join(&self.backup_dir)
    }

    /// Directory receiving export bundle files
    pub fn export_path(&self, root: &Path) -> PathBuf {
        root.join(&self.export_dir)
    }
}

/// Find the repository root by looking for .edubak.toml
pub fn find_repo_root() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;

    let mut dir = current_dir.as_path();

    loop {
        let config_path = dir.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(dir.to_path_buf());
        }

        match dir.parent() {
            Some(parent) => dir = parent,
            None => bail!(
                "Could not find {} in current directory or any parent directory.\n\
                 Create a configuration file using 'edubak init' or run from within an edubak-enabled directory.",
                CONFIG_FILENAME
            ),
        }
    }
}

/// Get the edubak directory path (.edubak/)
pub fn get_edubak_dir(root: &Path) -> PathBuf {
    root.join(EDUBAK_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.backup_dir, "backups");
        assert_eq!(config.export_dir, "exports");
        assert!(config.progress.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILENAME);
        fs::write(
            &config_path,
            "data_dir = \"db\"\nbackup_dir = \"bak\"\nexport_dir = \"out\"\nprogress = false\n",
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.data_dir, "db");
        assert_eq!(config.backup_dir, "bak");
        assert_eq!(config.export_dir, "out");
        assert_eq!(config.progress, Some(false));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "backup_dir = \"bak\"\n").unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.backup_dir, "bak");
        assert_eq!(config.export_dir, "exports");
    }

    #[test]
    fn test_load_missing_config_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load(&temp_dir.path().join(CONFIG_FILENAME));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_validate_rejects_empty_dir() {
        let config = Config {
            backup_dir: "".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_parent_traversal() {
        let config = Config {
            export_dir: "../exports".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(".."));
    }

    #[test]
    fn test_path_helpers_join_root() {
        let config = Config::default();
        let root = Path::new("/srv/app");

        assert_eq!(config.data_path(root), Path::new("/srv/app/data"));
        assert_eq!(config.backup_path(root), Path::new("/srv/app/backups"));
        assert_eq!(config.export_path(root), Path::new("/srv/app/exports"));
    }

    #[test]
    fn test_get_edubak_dir() {
        let dir = get_edubak_dir(Path::new("/srv/app"));
        assert_eq!(dir, Path::new("/srv/app/.edubak"));
    }
}
