//! Discovery facade
//!
//! Service advertisement on the local network is handled outside the
//! core; modules may publish the services they provide.

/// Network service discovery facade
pub trait Discovery: Send + Sync {
    /// Advertise a service of `kind` (e.g. `_http._tcp`) on `port`
    fn publish(&self, name: &str, kind: &str, port: u16);

    /// Withdraw a previously published service
    fn unpublish(&self, name: &str);

    /// Process pending discovery events
    fn poll(&self);
}
