// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::{Path, PathBuf};

use crate::modules::error::{code::ErrorCode, MailQueueResult};
use crate::modules::settings::cli::Settings;
use crate::raise_error;

pub const OUTBOX_FILE: &str = "outbox.db";
const LOG_DIR: &str = "logs";

/// Where the outbox database and server logs live under the data root.
#[derive(Clone, Debug)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.mailqueue_root_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn outbox_db(&self) -> PathBuf {
        self.root.join(OUTBOX_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join(LOG_DIR)
    }

    /// Creates any missing directory of the layout.
    pub fn prepare(&self) -> MailQueueResult<()> {
        for dir in [self.root.clone(), self.log_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                raise_error!(
                    format!("Cannot create data directory {:?}: {}", dir, e),
                    ErrorCode::InternalError
                )
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn layout_lives_under_root() {
        let temp_dir = tempdir().unwrap();
        let layout = DataLayout::new(temp_dir.path());
        assert_eq!(layout.outbox_db(), temp_dir.path().join("outbox.db"));
        assert_eq!(layout.log_dir(), temp_dir.path().join("logs"));
    }

    #[test]
    fn prepare_creates_missing_directories() {
        let temp_dir = tempdir().unwrap();
        let layout = DataLayout::new(temp_dir.path().join("data"));
        layout.prepare().unwrap();
        layout.prepare().unwrap();
        assert!(layout.root().is_dir());
        assert!(layout.log_dir().is_dir());
    }
}
