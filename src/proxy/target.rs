use thiserror::Error;

pub const DEFAULT_HTTP_PORT: u16 = 80;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("request URI has no hostname")]
    EmptyHost,
    #[error("request URI has invalid port '{0}'")]
    InvalidPort(String),
}

/// Origin coordinates resolved from an absolute-form request URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl RequestTarget {
    /// Parse an absolute-form request URI into host, port, and path.
    ///
    /// Tolerates a missing scheme, path, or port in any combination: the
    /// first `/` after the authority starts the path (default `/`), and the
    /// first `:` within the host portion starts the port (default 80).
    /// IPv6 literal hosts are not supported.
    pub fn parse(uri: &str) -> Result<Self, TargetError> {
        let rest = strip_http_scheme(uri);

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.find(':') {
            Some(idx) => {
                let port_str = &authority[idx + 1..];
                let port = port_str
                    .parse::<u16>()
                    .map_err(|_| TargetError::InvalidPort(port_str.to_string()))?;
                (&authority[..idx], port)
            }
            None => (authority, DEFAULT_HTTP_PORT),
        };

        if host.is_empty() {
            return Err(TargetError::EmptyHost);
        }

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }
}

fn strip_http_scheme(uri: &str) -> &str {
    const SCHEME: &str = "http://";
    match uri.get(..SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(SCHEME) => &uri[SCHEME.len()..],
        _ => uri,
    }
}
