//! Playback engine
//!
//! Owns the playlist and the current/previous stream pair behind a single
//! mutex. Every transition runs under one acquisition of that lock; the
//! private helpers on [`EngineState`] assume it is held and never re-lock.
//!
//! States:
//! - **Stopped**: no current index, no stream
//! - **Playing**: current index, stream registered and pulled
//! - **Paused**: current index, stream registered but not pulled
//!
//! A transition moves the superseded stream into the single previous slot
//! before opening the next one. The watcher keeps it there until the output
//! reports it drained, so the tail of a track is not cut when playback moves
//! on by itself. Explicit `next`/`prev`/`stop` release it immediately.

use crate::config::FilesConfig;
use crate::error::{Error, Result};
use crate::listing;
use crate::path::{self, file_name};
use crate::playlist::{Playlist, PlaylistEntry};
use crate::session::Session;
use crate::status::{encode_picture, FileInfo, Listing, Status, TagInfo};
use crate::watcher::Watcher;
use aircat_common::media::{FileStatus, MediaBackend, Picture};
use aircat_common::output::{Output, StreamId};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Observable playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn step(self, index: usize, len: usize) -> Option<usize> {
        match self {
            Direction::Forward => index.checked_add(1).filter(|&i| i < len),
            Direction::Backward => index.checked_sub(1).filter(|&i| i < len),
        }
    }
}

/// Lock the engine state.
///
/// Critical sections never panic while holding the lock, so a poisoned
/// mutex still holds a consistent state.
pub(crate) fn lock_state(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Locked state
// ============================================================================

/// Everything protected by the engine lock
pub(crate) struct EngineState {
    output: Arc<dyn Output>,
    media: Arc<dyn MediaBackend>,
    config: FilesConfig,
    playlist: Playlist,
    current: Option<Session>,
    previous: Option<Session>,
    playing: bool,
}

/// Status fields copied out under the lock
struct StatusSnapshot {
    file: String,
    tags: Option<TagInfo>,
    picture: Option<Picture>,
    pos: u64,
    length: u64,
}

impl EngineState {
    fn playback_state(&self) -> PlaybackState {
        match (&self.current, self.playing) {
            (None, _) => PlaybackState::Stopped,
            (Some(_), true) => PlaybackState::Playing,
            (Some(_), false) => PlaybackState::Paused,
        }
    }

    /// Tear down both streams and forget the current index
    fn stop(&mut self) {
        self.playing = false;
        self.current = None;
        self.previous = None;
        self.playlist.clear_current();
    }

    /// Open `index` as the new current entry. The caller has stopped first.
    fn start(&mut self, index: usize) -> Result<()> {
        self.playlist.check(index)?;
        let entry = &self.playlist.entries()[index];

        let session = Session::start(&self.output, self.media.as_ref(), &entry.path)?;
        info!("Playing [{}] {}", index, entry.path.display());

        self.current = Some(session);
        self.playing = true;
        self.playlist.set_current(Some(index))
    }

    /// Move to the neighbouring entry, skipping entries that fail to open.
    ///
    /// Running off either end of the playlist lands in Stopped. A no-op
    /// when already stopped.
    fn advance(&mut self, direction: Direction, keep_previous: bool) {
        let Some(mut index) = self.playlist.current() else {
            return;
        };

        // Only one previous slot: a stale one is reclaimed before reuse
        self.previous = None;
        let superseded = self.current.take();
        if keep_previous {
            self.previous = superseded;
        } else {
            drop(superseded);
        }

        self.playing = false;
        self.playlist.clear_current();

        while let Some(next) = direction.step(index, self.playlist.len()) {
            index = next;
            match self.start(index) {
                Ok(()) => return,
                Err(e) => warn!("Skipping playlist entry {}: {}", index, e),
            }
        }

        let edge = match direction {
            Direction::Forward => "end",
            Direction::Backward => "start",
        };
        info!("Reached {} of playlist, stopped", edge);
    }

    /// One watcher pass. Returns true if the playlist advanced.
    pub(crate) fn tick(&mut self) -> bool {
        if self.previous.as_ref().is_some_and(Session::is_drained) {
            debug!("Reclaiming drained previous stream");
            self.previous = None;
        }

        let finished = match &self.current {
            Some(session) => session.file().status() != FileStatus::Playing,
            None => false,
        };

        if finished {
            debug!("Current file finished, advancing");
            self.advance(Direction::Forward, true);
        }

        finished
    }

    fn status_snapshot(&self, with_picture: bool) -> Option<StatusSnapshot> {
        let session = self.current.as_ref()?;
        let entry = self.playlist.get(self.playlist.current()?)?;

        Some(StatusSnapshot {
            file: file_name(&entry.path),
            tags: entry.tags.as_ref().map(TagInfo::from_tags),
            picture: if with_picture {
                entry.tags.as_ref().and_then(|t| t.picture.clone())
            } else {
                None
            },
            pos: session.file().position(),
            length: session.file().length(),
        })
    }
}

impl StatusSnapshot {
    fn into_status(self) -> Status {
        let tags = self.tags.map(|mut tags| {
            tags.picture = self.picture.as_ref().map(encode_picture);
            tags
        });

        Status::Active {
            info: FileInfo {
                file: self.file,
                tags,
            },
            pos: self.pos,
            length: self.length,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Playlist playback engine
pub struct PlaybackEngine {
    state: Arc<Mutex<EngineState>>,
    media: Arc<dyn MediaBackend>,
    watcher: Mutex<Option<Watcher>>,
}

impl PlaybackEngine {
    /// Create a stopped engine with an empty playlist and no watcher
    pub fn new(output: Arc<dyn Output>, media: Arc<dyn MediaBackend>, config: FilesConfig) -> Self {
        let state = EngineState {
            output,
            media: Arc::clone(&media),
            config,
            playlist: Playlist::new(),
            current: None,
            previous: None,
            playing: false,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            media,
            watcher: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        lock_state(&self.state)
    }

    /// Start the end-of-track watcher. A running watcher is kept.
    pub fn spawn_watcher(&self, interval: Duration) -> std::io::Result<()> {
        let mut watcher = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if watcher.is_none() {
            *watcher = Some(Watcher::spawn(Arc::clone(&self.state), interval)?);
        }
        Ok(())
    }

    /// Run one watcher pass on the calling thread
    pub fn poll_end_of_track(&self) -> bool {
        self.lock().tick()
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    pub fn config(&self) -> FilesConfig {
        self.lock().config.clone()
    }

    /// Replace the configuration. Entries already in the playlist keep
    /// their resolved paths.
    pub fn set_config(&self, config: FilesConfig) {
        let mut state = self.lock();
        if state.config != config {
            info!("Music root set to {}", config.path.display());
        }
        state.config = config;
    }

    fn root(&self) -> PathBuf {
        self.lock().config.path.clone()
    }

    // ------------------------------------------------------------------------
    // Playlist
    // ------------------------------------------------------------------------

    /// Append a file, given relative to the music root. Returns its index.
    ///
    /// Tags are parsed before the entry is appended, outside the lock. A
    /// file whose tags cannot be parsed is still added.
    pub fn add(&self, relative: &str) -> Result<usize> {
        let path = path::resolve(&self.root(), relative)?;

        if !path.is_file() {
            return Err(Error::ResourceOpen {
                path: path.display().to_string(),
                reason: "not a regular file".into(),
            });
        }

        let tags = match self.media.parse_tags(&path, true) {
            Ok(tags) => Some(tags),
            Err(e) => {
                warn!("No metadata for {}: {}", path.display(), e);
                None
            }
        };

        debug!("Adding {} to playlist", path.display());
        let index = self.lock().playlist.push(PlaylistEntry { path, tags });
        Ok(index)
    }

    /// Remove an entry. Removing the current entry stops playback first.
    pub fn remove(&self, index: usize) -> Result<()> {
        let mut state = self.lock();
        state.playlist.check(index)?;

        if state.playlist.current() == Some(index) {
            state.stop();
        }

        let entry = state.playlist.remove(index)?;
        debug!("Removed [{}] {}", index, entry.path.display());
        Ok(())
    }

    /// Stop and empty the playlist
    pub fn flush(&self) {
        let mut state = self.lock();
        state.stop();
        state.playlist.clear();
        debug!("Playlist flushed");
    }

    pub fn len(&self) -> usize {
        self.lock().playlist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().playlist.is_empty()
    }

    /// Index of the current entry, `None` when stopped
    pub fn current_index(&self) -> Option<usize> {
        self.lock().playlist.current()
    }

    /// Playlist view, without artwork
    pub fn playlist(&self) -> Vec<FileInfo> {
        self.lock()
            .playlist
            .entries()
            .iter()
            .map(|entry| FileInfo {
                file: file_name(&entry.path),
                tags: entry.tags.as_ref().map(TagInfo::from_tags),
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    /// Play an entry.
    ///
    /// `None` resumes the last index, or the first entry when there is none.
    /// An invalid index fails without touching the current playback. If the
    /// file cannot be opened the engine is left stopped.
    pub fn play(&self, index: Option<usize>) -> Result<()> {
        let mut state = self.lock();

        let index = match index {
            Some(index) => index,
            None if state.playlist.is_empty() => return Err(Error::EmptyPlaylist),
            None => state.playlist.current().unwrap_or(0),
        };
        state.playlist.check(index)?;

        state.stop();
        state.start(index)
    }

    /// Toggle between playing and paused. No-op when stopped.
    pub fn toggle_pause(&self) -> PlaybackState {
        let mut guard = self.lock();
        let state = &mut *guard;

        if let Some(session) = &state.current {
            if state.playing {
                session.pause();
            } else {
                session.resume();
            }
            state.playing = !state.playing;
        }

        state.playback_state()
    }

    /// Stop playback. Idempotent.
    pub fn stop(&self) {
        self.lock().stop();
    }

    /// Play the next entry that opens, or stop at the end of the playlist
    pub fn next(&self) {
        self.lock().advance(Direction::Forward, false);
    }

    /// Play the previous entry that opens, or stop at the start of the playlist
    pub fn prev(&self) {
        self.lock().advance(Direction::Backward, false);
    }

    /// Seek the current file, in seconds
    pub fn seek(&self, secs: u64) -> Result<()> {
        let state = self.lock();
        let session = state.current.as_ref().ok_or(Error::NothingPlaying)?;

        session
            .file()
            .set_position(secs)
            .map_err(|e| Error::Seek(e.to_string()))
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().playback_state()
    }

    /// Streams currently registered by this engine, current first
    pub fn streams(&self) -> (Option<StreamId>, Option<StreamId>) {
        let state = self.lock();
        (
            state.current.as_ref().map(Session::stream),
            state.previous.as_ref().map(Session::stream),
        )
    }

    /// Playback status. The artwork is included on request.
    pub fn status(&self, with_picture: bool) -> Status {
        let snapshot = self.lock().status_snapshot(with_picture);

        match snapshot {
            Some(snapshot) => snapshot.into_status(),
            None => Status::stopped(),
        }
    }

    // ------------------------------------------------------------------------
    // Browsing
    // ------------------------------------------------------------------------

    /// List a directory, given relative to the music root
    pub fn list(&self, relative: &str) -> Result<Listing> {
        let dir = path::resolve(&self.root(), relative)?;
        listing::list_directory(&dir, self.media.as_ref())
    }

    // ------------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------------

    /// Stop playback, join the watcher and empty the playlist
    pub fn shutdown(&self) {
        self.stop();

        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watcher) = watcher {
            watcher.stop();
        }

        self.flush();
        info!("Playback engine shut down");
    }
}
