#[cfg(feature = "json")]
use serde::Serialize;

/// Normalized probing destination.
///
/// `host` is never empty, `path` always starts with `/` and `port` is in
/// `1..=65535`. IPv6 literals are stored without brackets.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct Target {
    pub host: String,
    pub path: String,
    pub port: u16,
    pub use_tls: bool,
}

impl Target {
    fn is_ipv6_literal(&self) -> bool {
        self.host.contains(':')
    }

    /// Value of the `Host` request header.
    pub fn host_header(&self) -> String {
        let host = if self.is_ipv6_literal() {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let default_port = if self.use_tls { 443 } else { 80 };
        if self.port == default_port {
            host
        } else {
            format!("{host}:{}", self.port)
        }
    }

    /// Scheme-less form used in reports: host followed by path, with a bare
    /// root path omitted.
    pub fn url(&self) -> String {
        if self.path == "/" {
            self.host.clone()
        } else {
            format!("{}{}", self.host, self.path)
        }
    }
}
