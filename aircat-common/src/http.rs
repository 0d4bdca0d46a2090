//! URL tables, requests and responses
//!
//! A module describes its HTTP surface as a static table of [`UrlEntry`]
//! values whose handlers take the module's own handle type. [`bind`]
//! erases that type into [`Route`]s the dispatcher can store side by side.

pub use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

// ============================================================================
// Methods
// ============================================================================

/// HTTP verbs understood by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    fn bit(self) -> u8 {
        match self {
            Method::Get => 1 << 0,
            Method::Put => 1 << 1,
            Method::Post => 1 << 2,
            Method::Delete => 1 << 3,
        }
    }

    /// Map a transport method, `None` for verbs no table can accept
    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        match *method {
            axum::http::Method::GET => Some(Method::Get),
            axum::http::Method::PUT => Some(Method::Put),
            axum::http::Method::POST => Some(Method::Post),
            axum::http::Method::DELETE => Some(Method::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Put => write!(f, "PUT"),
            Method::Post => write!(f, "POST"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// Set of methods a route accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodMask(u8);

impl MethodMask {
    pub const GET: MethodMask = MethodMask(1 << 0);
    pub const PUT: MethodMask = MethodMask(1 << 1);
    pub const POST: MethodMask = MethodMask(1 << 2);
    pub const DELETE: MethodMask = MethodMask(1 << 3);

    pub const fn union(self, other: MethodMask) -> MethodMask {
        MethodMask(self.0 | other.0)
    }

    pub fn contains(self, method: Method) -> bool {
        self.0 & method.bit() != 0
    }
}

impl BitOr for MethodMask {
    type Output = MethodMask;

    fn bitor(self, rhs: MethodMask) -> MethodMask {
        self.union(rhs)
    }
}

// ============================================================================
// Flags
// ============================================================================

/// Route flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlFlags(u8);

impl UrlFlags {
    /// Path must match exactly
    pub const NONE: UrlFlags = UrlFlags(0);
    /// Path is a prefix; the remainder becomes the request resource
    pub const EXTENDED: UrlFlags = UrlFlags(1 << 0);
    /// Handler expects a parsed JSON body
    pub const JSON_BODY: UrlFlags = UrlFlags(1 << 1);

    pub const fn union(self, other: UrlFlags) -> UrlFlags {
        UrlFlags(self.0 | other.0)
    }

    pub fn is_extended(self) -> bool {
        self.0 & Self::EXTENDED.0 != 0
    }

    pub fn wants_json(self) -> bool {
        self.0 & Self::JSON_BODY.0 != 0
    }
}

impl BitOr for UrlFlags {
    type Output = UrlFlags;

    fn bitor(self, rhs: UrlFlags) -> UrlFlags {
        self.union(rhs)
    }
}

// ============================================================================
// Request / Response
// ============================================================================

/// Request as seen by a handler. Borrowed, so it cannot outlive the call.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub method: Method,
    /// Path remainder after an extended route, empty otherwise
    pub resource: &'a str,
    /// Parsed body for routes flagged [`UrlFlags::JSON_BODY`]
    pub json: Option<&'a Value>,
}

/// Handler result: status plus optional body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub body: Option<Vec<u8>>,
    pub content_type: &'static str,
}

impl Response {
    /// 200 with no body
    pub fn ok() -> Self {
        Self::empty(StatusCode::OK)
    }

    /// Status with no body
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: None,
            content_type: "text/plain; charset=utf-8",
        }
    }

    /// Short human-readable text body, usually an error reason
    pub fn text(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(message.into().into_bytes()),
            content_type: "text/plain; charset=utf-8",
        }
    }

    /// JSON body. Serialization failures become a 500.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                body: Some(body),
                content_type: "application/json",
            },
            Err(e) => Self::text(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Serialization error: {}", e),
            ),
        }
    }

    /// Body as UTF-8 text, for logging and tests
    pub fn body_str(&self) -> Option<&str> {
        self.body.as_deref().and_then(|b| std::str::from_utf8(b).ok())
    }
}

// ============================================================================
// URL tables
// ============================================================================

/// Handler signature for a module handle of type `H`
pub type Handler<H> = fn(&H, &Request<'_>) -> Response;

/// One entry of a module's static URL table
pub struct UrlEntry<H: 'static> {
    /// Path relative to the module namespace, e.g. `playlist/add`
    pub path: &'static str,
    pub flags: UrlFlags,
    pub methods: MethodMask,
    pub handler: Handler<H>,
}

type BoxedHandler = Arc<dyn Fn(&Request<'_>) -> Response + Send + Sync>;

/// A URL table entry bound to its handle
#[derive(Clone)]
pub struct Route {
    path: String,
    flags: UrlFlags,
    methods: MethodMask,
    handler: BoxedHandler,
}

impl Route {
    /// Build a route from a closure
    pub fn new<F>(path: &str, flags: UrlFlags, methods: MethodMask, handler: F) -> Self
    where
        F: Fn(&Request<'_>) -> Response + Send + Sync + 'static,
    {
        Self {
            path: path.trim_matches('/').to_string(),
            flags,
            methods,
            handler: Arc::new(handler),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn flags(&self) -> UrlFlags {
        self.flags
    }

    pub fn methods(&self) -> MethodMask {
        self.methods
    }

    /// Match a namespace-relative path (no leading `/`).
    ///
    /// Returns the resource on success. Extended routes only match on a
    /// segment boundary, so `play` does not capture `playlist`.
    pub fn matches<'p>(&self, path: &'p str) -> Option<&'p str> {
        let path = path.trim_start_matches('/');

        if !self.flags.is_extended() {
            return (path.trim_end_matches('/') == self.path).then_some("");
        }

        if self.path.is_empty() {
            return Some(path.trim_matches('/'));
        }

        let rest = path.strip_prefix(self.path.as_str())?;
        if rest.is_empty() {
            Some("")
        } else {
            rest.strip_prefix('/')
        }
    }

    /// Invoke the bound handler
    pub fn call(&self, request: &Request<'_>) -> Response {
        (self.handler)(request)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("flags", &self.flags)
            .field("methods", &self.methods)
            .finish()
    }
}

/// Bind a static URL table to a module handle
pub fn bind<H>(handle: Arc<H>, table: &[UrlEntry<H>]) -> Vec<Route>
where
    H: Send + Sync + 'static,
{
    table
        .iter()
        .map(|entry| {
            let handle = Arc::clone(&handle);
            let handler = entry.handler;
            Route::new(entry.path, entry.flags, entry.methods, move |req| {
                handler(&handle, req)
            })
        })
        .collect()
}
