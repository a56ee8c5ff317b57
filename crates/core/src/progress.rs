//! Last-viewed card per deck, kept in the user config directory.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File name of the store inside the application config directory.
pub const PROGRESS_FILE: &str = "progress.json";

/// Remembered position inside one deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// Index of the card that was on screen.
    pub index: usize,
    /// When the position was recorded.
    pub updated_at: DateTime<Utc>,
}

/// Map of deck path to last position, persisted as JSON.
#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    path: PathBuf,
    entries: BTreeMap<String, ProgressEntry>,
}

impl ProgressStore {
    /// Load the store at `path`, starting empty if the file does not exist.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                entries: BTreeMap::new(),
            });
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read progress {}", path.display()))?;
        let entries = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse progress {}", path.display()))?;
        Ok(Self { path, entries })
    }

    /// Default location under the user's config directory.
    pub fn default_path() -> PathBuf {
        crate::config::config_dir().join(PROGRESS_FILE)
    }

    /// Remembered index for `deck`, if any.
    pub fn position_for(&self, deck: &Path) -> Option<usize> {
        self.entries.get(&deck_key(deck)).map(|entry| entry.index)
    }

    /// Record the current index for `deck`.
    pub fn record(&mut self, deck: &Path, index: usize) {
        self.entries.insert(
            deck_key(deck),
            ProgressEntry {
                index,
                updated_at: Utc::now(),
            },
        );
    }

    /// Number of decks with a remembered position.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no positions are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the store back to disk, creating parent directories if needed.
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create progress directory {}", parent.display())
            })?;
        }

        let serialized = serde_json::to_string_pretty(&self.entries)
            .context("failed to serialize progress")?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write progress {}", self.path.display()))
    }
}

fn deck_key(deck: &Path) -> String {
    fs::canonicalize(deck)
        .unwrap_or_else(|_| deck.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn positions_survive_persist_and_reload() -> Result<()> {
        let dir = tempdir()?;
        let deck = dir.path().join("words.csv");
        fs::write(&deck, "term,meaning\n")?;
        let store_path = dir.path().join("state").join(PROGRESS_FILE);

        let mut store = ProgressStore::load(&store_path)?;
        assert!(store.is_empty());
        store.record(&deck, 7);
        store.persist()?;

        let reloaded = ProgressStore::load(&store_path)?;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.position_for(&deck), Some(7));
        assert_eq!(reloaded.position_for(&dir.path().join("other.csv")), None);
        Ok(())
    }

    #[test]
    fn corrupt_store_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let store_path = dir.path().join(PROGRESS_FILE);
        fs::write(&store_path, "{ not json")?;
        assert!(ProgressStore::load(&store_path).is_err());
        Ok(())
    }
}
