// Allow dead code: store accessors kept for completeness
#![allow(dead_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A response stored in (or about to enter) a cache generation.
///
/// The stored copy and any copy handed to a caller are independent values;
/// consuming one never affects the other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredResponse {
    /// Request URL this entry answers (the cache key).
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

impl StoredResponse {
    pub fn new(url: &str, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            url: url.to_string(),
            status,
            headers,
            body,
            stored_at: Utc::now(),
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.stored_at).num_minutes()
    }

    /// Humanized entry age for status output.
    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew (negative ages)
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// One cache generation: a directory of JSON entry files keyed by URL.
///
/// Entry writes go through a temp file and a rename, so a concurrent reader
/// only ever sees a complete entry. Overlapping writers for the same key
/// resolve last-write-wins.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    tag: String,
}

impl CacheStore {
    pub(crate) fn new(dir: PathBuf, tag: String) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache store directory for {}", tag))?;
        Ok(Self { dir, tag })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Map a URL to an entry file name. Collisions are tolerated because
    /// `lookup` verifies the stored URL before returning a hit.
    fn entry_file(url: &str) -> String {
        let sanitized: String = url
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            })
            .collect();
        format!("{}.json", sanitized)
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(Self::entry_file(url))
    }

    /// Look up a URL in this generation. A missing, unreadable, or
    /// key-mismatched entry is a miss, never an error surfaced to callers.
    pub fn lookup(&self, url: &str) -> Option<StoredResponse> {
        let path = self.entry_path(url);
        if !path.exists() {
            return None;
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!(tag = %self.tag, url, error = %e, "Failed to read cache entry");
                return None;
            }
        };

        let entry: StoredResponse = match serde_json::from_str(&contents) {
            Ok(e) => e,
            Err(e) => {
                debug!(tag = %self.tag, url, error = %e, "Failed to parse cache entry");
                return None;
            }
        };

        // Filename collision between two distinct URLs reads as a miss
        if entry.url != url {
            debug!(tag = %self.tag, url, stored = %entry.url, "Entry key mismatch");
            return None;
        }

        Some(entry)
    }

    /// Write (or overwrite) the entry for `response.url`.
    pub fn put(&self, response: &StoredResponse) -> Result<()> {
        let path = self.entry_path(&response.url);
        let contents = serde_json::to_string(response)?;

        // Temp-then-rename keeps each entry write atomic for readers
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write cache entry for {}", response.url))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to commit cache entry for {}", response.url))?;
        Ok(())
    }

    /// Number of committed entries in this generation.
    pub fn len(&self) -> usize {
        self.entry_paths().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_paths().is_empty()
    }

    /// Age display of the most recently stored entry, if any.
    pub fn newest_age(&self) -> Option<String> {
        self.entry_paths()
            .iter()
            .filter_map(|p| std::fs::read_to_string(p).ok())
            .filter_map(|c| serde_json::from_str::<StoredResponse>(&c).ok())
            .max_by_key(|e| e.stored_at)
            .map(|e| e.age_display())
    }

    fn entry_paths(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
