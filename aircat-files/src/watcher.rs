//! End-of-track watcher thread
//!
//! One dedicated thread per engine. It wakes at a fixed interval, takes the
//! engine lock, reclaims a drained previous stream and advances the
//! playlist once the current file is exhausted. This is the only path by
//! which playback moves on without a client request.

use crate::engine::{lock_state, EngineState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

/// Default wake interval
pub const WATCH_INTERVAL: Duration = Duration::from_millis(100);

/// Handle on a running watcher thread
pub(crate) struct Watcher {
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Watcher {
    /// Spawn the watcher over `state`
    pub(crate) fn spawn(state: Arc<Mutex<EngineState>>, interval: Duration) -> std::io::Result<Self> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_flag);

        let handle = thread::Builder::new()
            .name("files-watcher".into())
            .spawn(move || {
                debug!("Watcher started ({:?} interval)", interval);
                while !stop.load(Ordering::Relaxed) {
                    lock_state(&state).tick();
                    thread::sleep(interval);
                }
                debug!("Watcher exiting");
            })?;

        info!("Playlist watcher started");

        Ok(Self {
            stop_flag,
            thread: Some(handle),
        })
    }

    /// Raise the stop flag and wait for the thread to exit.
    ///
    /// Returns after at most one wake interval plus one tick.
    pub(crate) fn stop(mut self) {
        self.join();
    }

    fn join(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);

        if let Some(handle) = self.thread.take() {
            match handle.join() {
                Ok(()) => debug!("Watcher joined"),
                Err(e) => error!("Watcher thread panicked: {:?}", e),
            }
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.join();
    }
}
