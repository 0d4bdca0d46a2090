//! In-memory output and media backends for engine tests
#![allow(dead_code)]

use aircat_common::media::{FileStatus, MediaBackend, MediaFile, Picture, Tags};
use aircat_common::output::{Output, SampleSource, StreamId};
use aircat_common::{Error, Result};
use aircat_files::{FilesConfig, PlaybackEngine};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub playing: bool,
    pub drained: bool,
}

/// Records every stream the engine registers
#[derive(Default)]
pub struct FakeOutput {
    next_id: AtomicU64,
    streams: Mutex<HashMap<u64, StreamInfo>>,
    removed: Mutex<Vec<u64>>,
}

impl FakeOutput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registered streams, sorted by id
    pub fn streams(&self) -> Vec<StreamId> {
        let mut ids: Vec<u64> = self.streams.lock().unwrap().keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(StreamId).collect()
    }

    pub fn info(&self, id: StreamId) -> Option<StreamInfo> {
        self.streams.lock().unwrap().get(&id.0).copied()
    }

    pub fn set_drained(&self, id: StreamId) {
        if let Some(info) = self.streams.lock().unwrap().get_mut(&id.0) {
            info.drained = true;
        }
    }

    /// Number of times `remove_stream` was called for `id`
    pub fn removals(&self, id: StreamId) -> usize {
        self.removed.lock().unwrap().iter().filter(|&&r| r == id.0).count()
    }
}

impl Output for FakeOutput {
    fn add_stream(&self, _: u32, _: u16, _: Arc<dyn SampleSource>) -> Result<StreamId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.streams.lock().unwrap().insert(
            id,
            StreamInfo {
                playing: false,
                drained: false,
            },
        );
        Ok(StreamId(id))
    }

    fn play_stream(&self, id: StreamId) {
        if let Some(info) = self.streams.lock().unwrap().get_mut(&id.0) {
            info.playing = true;
        }
    }

    fn pause_stream(&self, id: StreamId) {
        if let Some(info) = self.streams.lock().unwrap().get_mut(&id.0) {
            info.playing = false;
        }
    }

    fn remove_stream(&self, id: StreamId) {
        self.streams.lock().unwrap().remove(&id.0);
        self.removed.lock().unwrap().push(id.0);
    }

    fn is_drained(&self, id: StreamId) -> bool {
        self.streams
            .lock()
            .unwrap()
            .get(&id.0)
            .map(|info| info.drained)
            .unwrap_or(true)
    }
}

// ============================================================================
// Media
// ============================================================================

pub const LENGTH: u64 = 180;

/// Decoder stand-in: never produces samples, status driven by the test
pub struct FakeFile {
    status: Mutex<FileStatus>,
    position: AtomicU64,
}

impl FakeFile {
    pub fn finish(&self) {
        *self.status.lock().unwrap() = FileStatus::Eof;
    }
}

impl SampleSource for FakeFile {
    fn read(&self, _buf: &mut [f32]) -> usize {
        0
    }
}

impl MediaFile for FakeFile {
    fn samplerate(&self) -> u32 {
        44100
    }

    fn channels(&self) -> u16 {
        2
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::SeqCst)
    }

    fn length(&self) -> u64 {
        LENGTH
    }

    fn status(&self) -> FileStatus {
        *self.status.lock().unwrap()
    }

    fn set_position(&self, secs: u64) -> Result<()> {
        if secs > LENGTH {
            return Err(Error::InvalidInput(format!("position {} past end", secs)));
        }
        self.position.store(secs, Ordering::SeqCst);
        Ok(())
    }

    fn into_source(self: Arc<Self>) -> Arc<dyn SampleSource> {
        self
    }
}

/// Files named `bad*` fail to open, files named `notag*` have no tags.
/// Every other file gets its stem as title and a small PNG cover.
#[derive(Default)]
pub struct FakeMedia {
    opened: Mutex<HashMap<PathBuf, Arc<FakeFile>>>,
}

impl FakeMedia {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Last opened instance of the file with this name
    pub fn file(&self, name: &str) -> Option<Arc<FakeFile>> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .find(|(path, _)| path.file_name().is_some_and(|n| n == name))
            .map(|(_, file)| Arc::clone(file))
    }

    /// Mark the file as fully decoded
    pub fn finish(&self, name: &str) {
        if let Some(file) = self.file(name) {
            file.finish();
        }
    }
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl MediaBackend for FakeMedia {
    fn open(&self, path: &Path) -> Result<Arc<dyn MediaFile>> {
        if name_of(path).starts_with("bad") {
            return Err(Error::Media(format!("cannot decode {}", path.display())));
        }

        let file = Arc::new(FakeFile {
            status: Mutex::new(FileStatus::Playing),
            position: AtomicU64::new(0),
        });
        self.opened
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), Arc::clone(&file));
        Ok(file)
    }

    fn parse_tags(&self, path: &Path, with_picture: bool) -> Result<Tags> {
        let name = name_of(path);
        if name.starts_with("notag") {
            return Err(Error::Media("no tags".into()));
        }

        let title = Path::new(&name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned());

        Ok(Tags {
            title,
            artist: Some("Tester".into()),
            track: 1,
            year: 2001,
            picture: with_picture.then(|| Picture {
                data: vec![0x89, 0x50, 0x4e, 0x47],
                mime: Some("image/png".into()),
            }),
            ..Tags::default()
        })
    }
}

// ============================================================================
// Fixture
// ============================================================================

/// Engine over a temporary music root
pub struct Fixture {
    pub root: TempDir,
    pub output: Arc<FakeOutput>,
    pub media: Arc<FakeMedia>,
    pub engine: PlaybackEngine,
}

impl Fixture {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let output = FakeOutput::new();
        let media = FakeMedia::new();
        let config = FilesConfig {
            path: root.path().to_path_buf(),
        };
        let engine = PlaybackEngine::new(output.clone(), media.clone(), config);

        Self {
            root,
            output,
            media,
            engine,
        }
    }

    /// Create empty files under the root
    pub fn touch(&self, names: &[&str]) {
        for name in names {
            let path = self.root.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, b"").unwrap();
        }
    }

    /// Create and add files, in order
    pub fn with_files(names: &[&str]) -> Self {
        let fixture = Self::new();
        fixture.touch(names);
        for name in names {
            fixture.engine.add(name).unwrap();
        }
        fixture
    }
}
