//! File browser URL table routed through the dispatcher

mod common;

use aircat_common::http::{Method, StatusCode};
use aircat_common::{Dispatcher, Module};
use aircat_files::{FilesModule, PlaybackState};
use common::Fixture;
use serde_json::{json, Value};
use std::sync::Arc;

struct Harness {
    fixture_root: tempfile::TempDir,
    module: Arc<FilesModule>,
    dispatcher: Dispatcher,
}

fn harness(files: &[&str]) -> Harness {
    let fixture = Fixture::new();
    fixture.touch(files);
    let Fixture { root, engine, .. } = fixture;

    let module = Arc::new(FilesModule::new(engine));
    let mut dispatcher = Dispatcher::new();
    dispatcher.add_urls("files", Arc::clone(&module).routes());

    Harness {
        fixture_root: root,
        module,
        dispatcher,
    }
}

impl Harness {
    fn put(&self, path: &str) -> (StatusCode, String) {
        let resp = self.dispatcher.dispatch(Method::Put, path, b"");
        (resp.status, resp.body_str().unwrap_or_default().to_string())
    }

    fn get_json(&self, path: &str) -> Value {
        let resp = self.dispatcher.dispatch(Method::Get, path, b"");
        assert_eq!(resp.status, StatusCode::OK, "GET {}", path);
        serde_json::from_slice(resp.body.as_deref().unwrap()).unwrap()
    }
}

#[test]
fn test_status_when_stopped() {
    let h = harness(&[]);
    assert_eq!(h.get_json("/files/status"), json!({"file": null}));
}

#[test]
fn test_playlist_add_play_and_status() {
    let h = harness(&["a.mp3", "sub/b.mp3"]);

    assert_eq!(h.put("/files/playlist/add/a.mp3").0, StatusCode::OK);
    assert_eq!(h.put("/files/playlist/add/sub/b.mp3").0, StatusCode::OK);

    let playlist = h.get_json("/files/playlist");
    assert_eq!(playlist.as_array().unwrap().len(), 2);
    assert_eq!(playlist[1]["file"], "b.mp3");

    assert_eq!(h.put("/files/playlist/play/1").0, StatusCode::OK);
    let status = h.get_json("/files/status");
    assert_eq!(status["file"], "b.mp3");
    assert!(status.get("picture").is_none());

    let status = h.get_json("/files/status/img");
    assert!(status["picture"].is_string());
}

#[test]
fn test_bad_indices() {
    let h = harness(&["a.mp3"]);
    h.put("/files/playlist/add/a.mp3");

    assert_eq!(
        h.put("/files/playlist/play/abc"),
        (StatusCode::BAD_REQUEST, "Bad index".to_string())
    );
    assert_eq!(h.put("/files/playlist/play/-1").0, StatusCode::BAD_REQUEST);
    assert_eq!(h.put("/files/playlist/play/3").0, StatusCode::BAD_REQUEST);
    assert_eq!(h.put("/files/playlist/remove/3").0, StatusCode::BAD_REQUEST);
    assert_eq!(h.put("/files/playlist/remove/0").0, StatusCode::OK);
    assert!(h.module.engine().is_empty());
}

#[test]
fn test_empty_index_means_first_entry() {
    let h = harness(&["a.mp3", "b.mp3"]);
    h.put("/files/playlist/add/a.mp3");
    h.put("/files/playlist/add/b.mp3");

    assert_eq!(h.put("/files/playlist/play/").0, StatusCode::OK);
    assert_eq!(h.get_json("/files/status")["file"], "a.mp3");

    assert_eq!(h.put("/files/playlist/remove").0, StatusCode::OK);
    assert_eq!(h.get_json("/files/playlist").as_array().unwrap().len(), 1);
}

#[test]
fn test_add_failures() {
    let h = harness(&[]);

    assert_eq!(
        h.put("/files/playlist/add/missing.mp3"),
        (StatusCode::NOT_ACCEPTABLE, "File is not supported".to_string())
    );
    assert_eq!(
        h.put("/files/playlist/add/../secret.mp3").0,
        StatusCode::BAD_REQUEST
    );
}

#[test]
fn test_play_with_path_adds_and_plays() {
    let h = harness(&["a.mp3", "bad.mp3"]);

    assert_eq!(h.put("/files/play/a.mp3").0, StatusCode::OK);
    assert_eq!(h.module.engine().state(), PlaybackState::Playing);
    assert_eq!(h.module.engine().len(), 1);

    assert_eq!(
        h.put("/files/play/bad.mp3"),
        (StatusCode::NOT_ACCEPTABLE, "Cannot play the file".to_string())
    );
    assert_eq!(h.module.engine().state(), PlaybackState::Stopped);

    // Resume without a path
    assert_eq!(h.put("/files/play").0, StatusCode::OK);
    assert_eq!(h.module.engine().current_index(), Some(0));
}

#[test]
fn test_play_empty_playlist_is_client_error() {
    let h = harness(&[]);
    assert_eq!(h.put("/files/play").0, StatusCode::BAD_REQUEST);
}

#[test]
fn test_transport_controls() {
    let h = harness(&["a.mp3", "b.mp3"]);
    h.put("/files/playlist/add/a.mp3");
    h.put("/files/playlist/add/b.mp3");
    h.put("/files/play");

    assert_eq!(h.put("/files/pause").0, StatusCode::OK);
    assert_eq!(h.module.engine().state(), PlaybackState::Paused);

    assert_eq!(h.put("/files/next").0, StatusCode::OK);
    assert_eq!(h.module.engine().current_index(), Some(1));

    assert_eq!(h.put("/files/prev").0, StatusCode::OK);
    assert_eq!(h.module.engine().current_index(), Some(0));

    assert_eq!(h.put("/files/seek/30").0, StatusCode::OK);
    assert_eq!(h.get_json("/files/status")["pos"], 30);
    assert_eq!(
        h.put("/files/seek/abc"),
        (StatusCode::BAD_REQUEST, "Bad position".to_string())
    );

    assert_eq!(h.put("/files/stop").0, StatusCode::OK);
    assert_eq!(h.module.engine().state(), PlaybackState::Stopped);

    assert_eq!(h.put("/files/playlist/flush").0, StatusCode::OK);
    assert!(h.module.engine().is_empty());
}

#[test]
fn test_list() {
    let h = harness(&["a.mp3", "rock/b.ogg", "notes.txt"]);

    let listing = h.get_json("/files/list");
    assert_eq!(listing["directory"], json!(["rock"]));
    assert_eq!(listing["file"][0]["file"], "a.mp3");
    assert_eq!(listing["file"].as_array().unwrap().len(), 1);

    let rock = h.get_json("/files/list/rock");
    assert_eq!(rock["file"][0]["file"], "b.ogg");

    let resp = h.dispatcher.dispatch(Method::Get, "/files/list/missing", b"");
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body_str(), Some("Bad directory"));
}

#[test]
fn test_wrong_method() {
    let h = harness(&[]);
    let resp = h.dispatcher.dispatch(Method::Get, "/files/stop", b"");
    assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[test]
fn test_config_round_trip() {
    let h = harness(&[]);
    let config = h.module.get_config().unwrap();
    assert_eq!(config["path"], &*h.fixture_root.path().to_string_lossy());

    h.module
        .set_config(Some(&json!({"path": "/srv/music"})))
        .unwrap();
    let changed = h.module.get_config().unwrap();
    assert_eq!(changed, json!({"path": "/srv/music"}));

    h.module.set_config(Some(&changed)).unwrap();
    assert_eq!(h.module.get_config().unwrap(), changed);

    h.module.set_config(None).unwrap();
    assert_eq!(
        h.module.get_config().unwrap(),
        json!({"path": aircat_files::config::DEFAULT_ROOT})
    );
}

#[test]
fn test_close_stops_and_flushes() {
    let h = harness(&["a.mp3"]);
    h.put("/files/play/a.mp3");

    h.module.close().unwrap();

    assert_eq!(h.module.engine().state(), PlaybackState::Stopped);
    assert!(h.module.engine().is_empty());
}
