//! Request-scoped context bound to every session at upgrade time.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;

/// Execution context captured before the protocol upgrade and carried by the
/// session for its whole life.
///
/// Holds the originating request headers, the remote address, the endpoint
/// path the connection matched, and arbitrary string values that pre-upgrade
/// filters may attach (for example an authenticated principal).
#[derive(Debug, Clone)]
pub struct UpgradeContext {
    remote_addr: SocketAddr,
    path: String,
    headers: BTreeMap<String, Vec<String>>,
    values: HashMap<String, String>,
}

impl UpgradeContext {
    pub fn new(remote_addr: SocketAddr, path: impl Into<String>) -> Self {
        Self {
            remote_addr,
            path: path.into(),
            headers: BTreeMap::new(),
            values: HashMap::new(),
        }
    }

    /// Record one originating request header. Repeated names accumulate.
    pub fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers
            .entry(name.into().to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// First value of a header, if present. Lookup is case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All captured headers, sorted by name.
    pub fn headers(&self) -> &BTreeMap<String, Vec<String>> {
        &self.headers
    }

    /// Attach a request-scoped value (filter output, principal, trace id...).
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// The endpoint path this connection matched at registration time.
    pub fn path(&self) -> &str {
        &self.path
    }
}
