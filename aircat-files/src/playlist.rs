//! Ordered playlist with a current index
//!
//! Entries are addressed by position. Removing an entry shifts every later
//! entry down by one, so indices are not stable identities.

use crate::error::{Error, Result};
use aircat_common::media::Tags;
use std::path::PathBuf;

/// One playlist entry
#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    /// Absolute path of the media file
    pub path: PathBuf,
    /// Metadata parsed when the entry was added, `None` if unparsable
    pub tags: Option<Tags>,
}

/// Playlist storage.
///
/// Invariant: `current` is `None` or a valid index into `entries`.
#[derive(Debug, Default)]
pub struct Playlist {
    entries: Vec<PlaylistEntry>,
    current: Option<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PlaylistEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    /// Index of the current entry
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Set the current index. Out-of-range indices are rejected.
    pub fn set_current(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(i) = index {
            self.check(i)?;
        }
        self.current = index;
        Ok(())
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Append an entry and return its index
    pub fn push(&mut self, entry: PlaylistEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Remove an entry, keeping `current` pointing at the same entry.
    ///
    /// Removing the current entry clears `current`.
    pub fn remove(&mut self, index: usize) -> Result<PlaylistEntry> {
        self.check(index)?;

        self.current = match self.current {
            Some(cur) if cur == index => None,
            Some(cur) if cur > index => Some(cur - 1),
            other => other,
        };

        Ok(self.entries.remove(index))
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = None;
    }

    /// Fail with [`Error::IndexOutOfRange`] unless `index` is valid
    pub fn check(&self, index: usize) -> Result<()> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
        }
    }
}
