//! `server.http` configuration.

use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

const fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Listener address and per-request deadline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deadline applied to every request context, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl HttpConfig {
    /// Listener address from `host` and `port`. IPv6 hosts are bare
    /// literals such as `::1`, without brackets.
    ///
    /// # Errors
    ///
    /// When `host` is not an IP literal.
    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip = self.host.trim().parse::<IpAddr>()?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// `server.*` configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// HTTP listener.
    #[serde(default)]
    pub http: HttpConfig,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn defaults_listen_on_every_interface() {
        let config = HttpConfig::default();
        assert_eq!(
            config.bind_addr().expect("addr"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("literal")
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[rstest]
    #[case("::", "[::]:9090")]
    #[case("::1", "[::1]:9090")]
    #[case("127.0.0.1", "127.0.0.1:9090")]
    fn ip_literals_of_either_family_bind(#[case] host: &str, #[case] expected: &str) {
        let config = HttpConfig {
            host: host.to_owned(),
            port: 9090,
            ..HttpConfig::default()
        };
        assert_eq!(
            config.bind_addr().expect("addr"),
            expected.parse::<SocketAddr>().expect("literal")
        );
    }

    #[rstest]
    fn hostnames_are_not_bind_addresses() {
        let config = HttpConfig {
            host: "localhost".to_owned(),
            ..HttpConfig::default()
        };
        assert!(config.bind_addr().is_err());
    }
}
