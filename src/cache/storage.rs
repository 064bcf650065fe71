use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use super::store::CacheStore;

/// Suffix for stores being populated by an in-flight install.
const STAGING_SUFFIX: &str = ".staging";

/// Root of all cache generations. Each tag maps to one subdirectory; an
/// install populates `{tag}.staging` and commits it by rename, so a partially
/// populated generation is never addressable by its tag.
#[derive(Debug, Clone)]
pub struct CacheStorage {
    root: PathBuf,
}

impl CacheStorage {
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root).context("Failed to create cache root directory")?;
        Ok(Self { root })
    }

    fn tag_dir(&self, tag: &str) -> PathBuf {
        self.root.join(tag)
    }

    /// Open (creating if needed) the committed store for `tag`.
    pub fn open(&self, tag: &str) -> Result<CacheStore> {
        CacheStore::new(self.tag_dir(tag), tag.to_string())
    }

    /// Whether a committed store exists for `tag`.
    pub fn contains(&self, tag: &str) -> bool {
        self.tag_dir(tag).is_dir()
    }

    /// Open the staging store an install writes into.
    pub fn open_staging(&self, tag: &str) -> Result<CacheStore> {
        CacheStore::new(
            self.root.join(format!("{}{}", tag, STAGING_SUFFIX)),
            tag.to_string(),
        )
    }

    /// Promote a fully populated staging store to the committed store for
    /// `tag`, replacing any previous store under the same tag.
    pub fn commit_staging(&self, tag: &str) -> Result<()> {
        let staging = self.root.join(format!("{}{}", tag, STAGING_SUFFIX));
        let target = self.tag_dir(tag);

        if target.exists() {
            std::fs::remove_dir_all(&target)
                .with_context(|| format!("Failed to replace existing store {}", tag))?;
        }
        std::fs::rename(&staging, &target)
            .with_context(|| format!("Failed to commit staging store {}", tag))?;
        Ok(())
    }

    /// Throw away a staging store after a failed install.
    pub fn discard_staging(&self, tag: &str) {
        let staging = self.root.join(format!("{}{}", tag, STAGING_SUFFIX));
        if let Err(e) = std::fs::remove_dir_all(&staging) {
            debug!(tag, error = %e, "Failed to remove staging store");
        }
    }

    /// Tags of all committed stores on disk, staging excluded.
    pub fn tags(&self) -> Result<Vec<String>> {
        let mut tags = Vec::new();
        for entry in std::fs::read_dir(&self.root).context("Failed to list cache root")? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(STAGING_SUFFIX) {
                tags.push(name);
            }
        }
        tags.sort();
        Ok(tags)
    }

    /// Delete the store for `tag` and everything in it.
    pub fn delete(&self, tag: &str) -> Result<()> {
        std::fs::remove_dir_all(self.tag_dir(tag))
            .with_context(|| format!("Failed to delete cache store {}", tag))
    }

    /// Remove staging leftovers from interrupted installs.
    pub fn sweep_staging(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.root).context("Failed to list cache root")? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_dir() && name.ends_with(STAGING_SUFFIX) {
                debug!(dir = %name, "Sweeping leftover staging store");
                std::fs::remove_dir_all(entry.path())?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
