use anyhow::{Result, bail};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Fixed User-Agent sent toward every origin.
pub(crate) const PROXY_USER_AGENT: &str = concat!("wirecache/", env!("CARGO_PKG_VERSION"));

/// Header names the proxy controls; matching client headers are discarded.
const OVERRIDDEN_HEADERS: [&str; 4] = ["host", "user-agent", "connection", "proxy-connection"];

/// First line of a client request, split by ASCII whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestLine {
    pub method: String,
    pub uri: String,
    pub version: String,
}

impl RequestLine {
    /// Take the first three whitespace-separated tokens; anything after
    /// them is ignored. Fewer than three tokens is fatal for the connection.
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let (Some(method), Some(uri), Some(version)) = (parts.next(), parts.next(), parts.next())
        else {
            bail!("request line has fewer than three tokens");
        };
        Ok(Self {
            method: method.to_string(),
            uri: uri.to_string(),
            version: version.to_string(),
        })
    }
}

/// Origin request under construction: a fixed HTTP/1.0 request line, four
/// proxy-controlled headers, then the client's remaining headers with the
/// proxy-controlled names filtered out, in their original order.
pub(crate) struct ForwardRequest {
    request_line: String,
    headers: String,
}

impl ForwardRequest {
    pub fn new(host: &str, path: &str) -> Self {
        // HTTP/1.0 toward the origin guarantees the origin closes after one
        // response, so the relay can frame the response as read-until-EOF.
        let request_line = format!("GET {path} HTTP/1.0\r\n");
        let headers = format!(
            "Host: {host}\r\n\
             User-Agent: {PROXY_USER_AGENT}\r\n\
             Connection: close\r\n\
             Proxy-Connection: close\r\n"
        );
        Self {
            request_line,
            headers,
        }
    }

    /// Feed one raw client header line, terminator included. Returns false
    /// once the blank line ending the header block has been seen.
    pub fn push_client_line(&mut self, line: &str) -> bool {
        if line.trim_end_matches(['\r', '\n']).is_empty() {
            return false;
        }
        let name = line.split_once(':').map(|(name, _)| name.trim());
        let overridden = name
            .map(|name| {
                OVERRIDDEN_HEADERS
                    .iter()
                    .any(|overridden| name.eq_ignore_ascii_case(overridden))
            })
            .unwrap_or(false);
        if !overridden {
            self.headers.push_str(line);
        }
        true
    }

    /// Write the request line, then the terminated header block, each fully.
    pub async fn write_to<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(self.request_line.as_bytes()).await?;
        writer.write_all(self.headers.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
        writer.flush().await
    }

    #[cfg(test)]
    fn rendered(&self) -> String {
        format!("{}{}\r\n", self.request_line, self.headers)
    }
}
