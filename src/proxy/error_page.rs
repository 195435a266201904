use anyhow::Result;
use http::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Write a complete, self-contained HTTP/1.0 error response. Only usable
/// before any response bytes have been committed to the client.
pub async fn send_error<W>(writer: &mut W, status: StatusCode, cause: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response = render_error(status, cause);
    writer.write_all(&response).await?;
    writer.flush().await?;
    Ok(())
}

fn render_error(status: StatusCode, cause: &str) -> Vec<u8> {
    let code = status.as_u16();
    let reason = status.canonical_reason().unwrap_or("Error");
    let cause = escape_html(cause);
    let body = format!(
        "<html><head><title>Proxy Error</title></head>\r\n\
         <body><h1>{code}: {reason}</h1>\r\n\
         <p>{cause}</p>\r\n\
         <hr/><em>wirecache</em></body></html>\r\n"
    );

    let mut response = Vec::with_capacity(body.len() + 96);
    response.extend_from_slice(format!("HTTP/1.0 {code} {reason}\r\n").as_bytes());
    response.extend_from_slice(b"Content-type: text/html\r\n");
    response.extend_from_slice(format!("Content-length: {}\r\n\r\n", body.len()).as_bytes());
    response.extend_from_slice(body.as_bytes());
    response
}

/// The cause echoes client-controlled text into the page body.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_response(raw: &[u8]) -> (String, Vec<u8>) {
        let split = raw
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .expect("response has a header terminator");
        let head = String::from_utf8(raw[..split].to_vec()).expect("valid header bytes");
        (head, raw[split + 4..].to_vec())
    }

    #[test]
    fn renders_status_line_and_typed_headers() {
        let response = render_error(StatusCode::NOT_IMPLEMENTED, "POST");
        let (head, body) = split_response(&response);
        assert!(head.starts_with("HTTP/1.0 501 Not Implemented\r\n"));
        assert!(head.contains("Content-type: text/html"));
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("501: Not Implemented"));
        assert!(text.contains("POST"));
    }

    #[test]
    fn content_length_matches_body_bytes() {
        let response = render_error(StatusCode::BAD_GATEWAY, "origin unreachable");
        let (head, body) = split_response(&response);
        let declared: usize = head
            .lines()
            .find_map(|line| line.strip_prefix("Content-length: "))
            .expect("Content-length header present")
            .parse()
            .expect("numeric Content-length");
        assert_eq!(declared, body.len());
    }

    #[test]
    fn cause_is_html_escaped() {
        let response = render_error(StatusCode::BAD_REQUEST, "<script>alert(1)</script>");
        let (_, body) = split_response(&response);
        let text = String::from_utf8(body).unwrap();
        assert!(!text.contains("<script>"));
        assert!(text.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn send_error_writes_full_response() -> Result<()> {
        let mut sink = Vec::new();
        send_error(&mut sink, StatusCode::BAD_GATEWAY, "unreachable").await?;
        assert!(sink.starts_with(b"HTTP/1.0 502 Bad Gateway\r\n"));
        Ok(())
    }
}
