//! HTTP surface of the file browser module
//!
//! Paths are relative to the module namespace (`/files`).

use crate::error::Error;
use crate::module::FilesModule;
use aircat_common::http::{MethodMask, Request, Response, StatusCode, UrlEntry, UrlFlags};
use tracing::debug;

/// URL table, matched in order
pub static FILES_URLS: &[UrlEntry<FilesModule>] = &[
    UrlEntry {
        path: "playlist/add",
        flags: UrlFlags::EXTENDED,
        methods: MethodMask::PUT,
        handler: playlist_add,
    },
    UrlEntry {
        path: "playlist/play",
        flags: UrlFlags::EXTENDED,
        methods: MethodMask::PUT,
        handler: playlist_play,
    },
    UrlEntry {
        path: "playlist/remove",
        flags: UrlFlags::EXTENDED,
        methods: MethodMask::PUT,
        handler: playlist_remove,
    },
    UrlEntry {
        path: "playlist/flush",
        flags: UrlFlags::NONE,
        methods: MethodMask::PUT,
        handler: playlist_flush,
    },
    UrlEntry {
        path: "playlist",
        flags: UrlFlags::NONE,
        methods: MethodMask::GET,
        handler: playlist,
    },
    UrlEntry {
        path: "play",
        flags: UrlFlags::EXTENDED,
        methods: MethodMask::PUT,
        handler: play,
    },
    UrlEntry {
        path: "pause",
        flags: UrlFlags::NONE,
        methods: MethodMask::PUT,
        handler: pause,
    },
    UrlEntry {
        path: "stop",
        flags: UrlFlags::NONE,
        methods: MethodMask::PUT,
        handler: stop,
    },
    UrlEntry {
        path: "prev",
        flags: UrlFlags::NONE,
        methods: MethodMask::PUT,
        handler: prev,
    },
    UrlEntry {
        path: "next",
        flags: UrlFlags::NONE,
        methods: MethodMask::PUT,
        handler: next,
    },
    UrlEntry {
        path: "seek",
        flags: UrlFlags::EXTENDED,
        methods: MethodMask::PUT,
        handler: seek,
    },
    UrlEntry {
        path: "status",
        flags: UrlFlags::EXTENDED,
        methods: MethodMask::GET,
        handler: status,
    },
    UrlEntry {
        path: "list",
        flags: UrlFlags::EXTENDED,
        methods: MethodMask::GET,
        handler: list,
    },
];

/// Playlist index from the resource. An empty resource means the first entry.
fn parse_index(resource: &str) -> Option<usize> {
    match resource.trim_matches('/') {
        "" => Some(0),
        index => index.parse().ok(),
    }
}

/// Add failures: escaping paths are a bad request, anything else unsupported
fn add_error(err: &Error) -> Response {
    match err {
        Error::InvalidPath(_) => err.to_response(),
        _ => Response::text(StatusCode::NOT_ACCEPTABLE, "File is not supported"),
    }
}

// ============================================================================
// Playlist
// ============================================================================

fn playlist_add(module: &FilesModule, req: &Request<'_>) -> Response {
    match module.engine().add(req.resource) {
        Ok(index) => {
            debug!("Added {} at {}", req.resource, index);
            Response::ok()
        }
        Err(e) => add_error(&e),
    }
}

fn playlist_play(module: &FilesModule, req: &Request<'_>) -> Response {
    let Some(index) = parse_index(req.resource) else {
        return Response::text(StatusCode::BAD_REQUEST, "Bad index");
    };

    match module.engine().play(Some(index)) {
        Ok(()) => Response::ok(),
        Err(e) => e.to_response(),
    }
}

fn playlist_remove(module: &FilesModule, req: &Request<'_>) -> Response {
    let Some(index) = parse_index(req.resource) else {
        return Response::text(StatusCode::BAD_REQUEST, "Bad index");
    };

    match module.engine().remove(index) {
        Ok(()) => Response::ok(),
        Err(e) => e.to_response(),
    }
}

fn playlist_flush(module: &FilesModule, _req: &Request<'_>) -> Response {
    module.engine().flush();
    Response::ok()
}

fn playlist(module: &FilesModule, _req: &Request<'_>) -> Response {
    Response::json(StatusCode::OK, &module.engine().playlist())
}

// ============================================================================
// Transport
// ============================================================================

/// `PUT /play[/<path>]`: optionally append a file, then play it (or resume)
fn play(module: &FilesModule, req: &Request<'_>) -> Response {
    let engine = module.engine();

    let index = if req.resource.is_empty() {
        None
    } else {
        match engine.add(req.resource) {
            Ok(index) => Some(index),
            Err(e) => return add_error(&e),
        }
    };

    match engine.play(index) {
        Ok(()) => Response::ok(),
        Err(e @ Error::ResourceOpen { .. }) => {
            debug!("{}", e);
            Response::text(StatusCode::NOT_ACCEPTABLE, "Cannot play the file")
        }
        Err(e) => e.to_response(),
    }
}

fn pause(module: &FilesModule, _req: &Request<'_>) -> Response {
    module.engine().toggle_pause();
    Response::ok()
}

fn stop(module: &FilesModule, _req: &Request<'_>) -> Response {
    module.engine().stop();
    Response::ok()
}

fn prev(module: &FilesModule, _req: &Request<'_>) -> Response {
    module.engine().prev();
    Response::ok()
}

fn next(module: &FilesModule, _req: &Request<'_>) -> Response {
    module.engine().next();
    Response::ok()
}

fn seek(module: &FilesModule, req: &Request<'_>) -> Response {
    let position = req.resource.trim_matches('/').parse::<u64>();

    match position.ok().map(|secs| module.engine().seek(secs)) {
        Some(Ok(())) => Response::ok(),
        Some(Err(Error::NothingPlaying)) => Error::NothingPlaying.to_response(),
        _ => Response::text(StatusCode::BAD_REQUEST, "Bad position"),
    }
}

// ============================================================================
// Status and browsing
// ============================================================================

/// `GET /status[/img]`: the `img` variant embeds the cover art
fn status(module: &FilesModule, req: &Request<'_>) -> Response {
    let with_picture = req.resource.starts_with("img");
    Response::json(StatusCode::OK, &module.engine().status(with_picture))
}

fn list(module: &FilesModule, req: &Request<'_>) -> Response {
    match module.engine().list(req.resource) {
        Ok(listing) => Response::json(StatusCode::OK, &listing),
        Err(e @ Error::InvalidPath(_)) => e.to_response(),
        Err(e) => {
            debug!("{}", e);
            Response::text(StatusCode::NOT_FOUND, "Bad directory")
        }
    }
}
