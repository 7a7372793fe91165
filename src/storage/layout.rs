use crate::error::KfResult;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory layout of one experiment run, resolved under a single root.
///
/// Nothing is created on construction; call [`StorageLayout::ensure_exists`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Raw array files and sidecars. Safe to wipe after the run.
    pub fn temp(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn output(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn logs(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn plots(&self) -> PathBuf {
        self.output().join("plots")
    }

    pub fn ensure_exists(&self) -> KfResult<()> {
        for dir in [self.temp(), self.output(), self.logs(), self.plots()] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    pub fn cleanup_temp(&self) -> KfResult<()> {
        let temp = self.temp();
        if temp.exists() {
            fs::remove_dir_all(&temp)?;
        }
        Ok(())
    }
}
