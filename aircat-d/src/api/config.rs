//! Core configuration URL table
//!
//! Served under `/config`:
//! - `PUT /config/default` resets every owner to built-in defaults
//! - `PUT /config/reload` re-reads the configuration file
//! - `PUT /config/save` writes the live configuration to disk
//! - `GET /config[/<section>]` returns the live configuration
//! - `PUT /config[/<section>]` applies a JSON object of sections

use crate::context::Core;
use aircat_common::http::{
    bind, Method, MethodMask, Request, Response, Route, StatusCode, UrlEntry, UrlFlags,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

/// Dispatcher namespace of the table
pub const NAMESPACE: &str = "config";

pub static CONFIG_URLS: &[UrlEntry<Core>] = &[
    UrlEntry {
        path: "default",
        flags: UrlFlags::NONE,
        methods: MethodMask::PUT,
        handler: set_default,
    },
    UrlEntry {
        path: "reload",
        flags: UrlFlags::NONE,
        methods: MethodMask::PUT,
        handler: reload,
    },
    UrlEntry {
        path: "save",
        flags: UrlFlags::NONE,
        methods: MethodMask::PUT,
        handler: save,
    },
    UrlEntry {
        path: "",
        flags: UrlFlags::EXTENDED.union(UrlFlags::JSON_BODY),
        methods: MethodMask::GET.union(MethodMask::PUT),
        handler: config,
    },
];

pub fn routes(core: Arc<Core>) -> Vec<Route> {
    bind(core, CONFIG_URLS)
}

fn set_default(core: &Core, _req: &Request<'_>) -> Response {
    core.reset_defaults();
    Response::ok()
}

fn reload(core: &Core, _req: &Request<'_>) -> Response {
    core.reload();
    Response::ok()
}

fn save(core: &Core, _req: &Request<'_>) -> Response {
    match core.save() {
        Ok(()) => Response::ok(),
        Err(e) => {
            error!("Failed to save configuration: {}", e);
            Response::text(StatusCode::INTERNAL_SERVER_ERROR, "Cannot save configuration")
        }
    }
}

fn config(core: &Core, req: &Request<'_>) -> Response {
    if req.method == Method::Get {
        return Response::json(StatusCode::OK, &core.snapshot(req.resource));
    }

    match req.json {
        Some(Value::Object(body)) => {
            core.apply(req.resource, body);
            Response::ok()
        }
        _ => Response::text(StatusCode::BAD_REQUEST, "Bad JSON body"),
    }
}
