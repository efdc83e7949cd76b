use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Where the gateway keeps its config file and rolling logs.
pub struct AppPaths {
    config_dir: PathBuf,
    logs_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self> {
        let project_dirs = ProjectDirs::from("ai", "valechat", "ChatGate")
            .ok_or_else(|| Error::platform("Failed to determine application directories"))?;

        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
            logs_dir: project_dirs.data_dir().join("logs"),
        })
    }

    /// Everything under one root, for portable installs and tests.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            logs_dir: root.join("logs"),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// The config directory is created on save; logs only when writing to file.
    pub fn prepare_logs_dir(&self, file_logging: bool) -> Result<()> {
        if file_logging {
            std::fs::create_dir_all(&self.logs_dir)?;
        }
        Ok(())
    }
}
