//! HTTP dispatcher
//!
//! Resolves `/<namespace>/<path>` to a bound route. The namespace is the
//! first path segment (a module id, or a core table such as `config`);
//! routes registered under the empty namespace serve unprefixed paths.

use crate::http::{Method, Request, Response, Route};
use axum::http::StatusCode;
use serde_json::Value;
use tracing::debug;

struct Namespace {
    name: String,
    routes: Vec<Route>,
}

/// Route table for every namespace
#[derive(Default)]
pub struct Dispatcher {
    namespaces: Vec<Namespace>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append routes to a namespace, creating it if needed
    pub fn add_urls(&mut self, namespace: &str, routes: Vec<Route>) {
        let name = namespace.trim_matches('/');
        debug!("Registering {} routes under /{}", routes.len(), name);

        match self.namespaces.iter_mut().find(|n| n.name == name) {
            Some(ns) => ns.routes.extend(routes),
            None => self.namespaces.push(Namespace {
                name: name.to_string(),
                routes,
            }),
        }
    }

    /// Registered namespace names
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(|n| n.name.as_str())
    }

    /// Route one request.
    ///
    /// - Unknown namespace or path: 404
    /// - Known path, method not in mask: 405
    /// - JSON route with a malformed body: 400
    pub fn dispatch(&self, method: Method, path: &str, body: &[u8]) -> Response {
        let path = path.trim_start_matches('/');
        let (head, rest) = path.split_once('/').unwrap_or((path, ""));

        let (namespace, rest) = match self.find(head) {
            Some(ns) => (ns, rest),
            None => match self.find("") {
                Some(ns) => (ns, path),
                None => return not_found(),
            },
        };

        let mut method_mismatch = false;

        for route in &namespace.routes {
            let Some(resource) = route.matches(rest) else {
                continue;
            };

            if !route.methods().contains(method) {
                method_mismatch = true;
                continue;
            }

            let json = if route.flags().wants_json() && !body.is_empty() {
                match serde_json::from_slice::<Value>(body) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        debug!("Rejecting malformed JSON body on /{}: {}", path, e);
                        return Response::text(StatusCode::BAD_REQUEST, "Bad JSON body");
                    }
                }
            } else {
                None
            };

            let request = Request {
                method,
                resource,
                json: json.as_ref(),
            };

            let response = route.call(&request);
            debug!(
                "{} /{} -> {} (route '{}', resource '{}')",
                method,
                path,
                response.status.as_u16(),
                route.path(),
                resource
            );
            return response;
        }

        if method_mismatch {
            Response::text(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        } else {
            not_found()
        }
    }

    fn find(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|n| n.name == name)
    }
}

fn not_found() -> Response {
    Response::text(StatusCode::NOT_FOUND, "Not found")
}
