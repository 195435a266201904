use std::net::SocketAddr;

use anyhow::{Context, Result, anyhow, bail, ensure};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Read one `\n`-terminated line into `buf`, terminator included.
///
/// Returns the number of bytes read; 0 means the peer closed cleanly before
/// sending anything. A close mid-line or a line over `max_len` bytes is an
/// error.
pub(crate) async fn read_line<S>(
    reader: &mut BufReader<S>,
    buf: &mut String,
    peer: SocketAddr,
    max_len: usize,
) -> Result<usize>
where
    S: AsyncRead + Unpin,
{
    ensure!(max_len > 0, "line length limit must be greater than zero");
    buf.clear();
    let mut collected = Vec::new();

    loop {
        let available = reader
            .fill_buf()
            .await
            .with_context(|| format!("reading line from {peer}"))?;

        if available.is_empty() {
            if collected.is_empty() {
                return Ok(0);
            }
            bail!("connection closed while reading line from {peer}");
        }

        let newline_pos = available.iter().position(|byte| *byte == b'\n');
        let consume = newline_pos.map(|idx| idx + 1).unwrap_or(available.len());

        if collected.len() + consume > max_len {
            bail!("line from {peer} exceeds limit of {max_len} bytes");
        }

        collected.extend_from_slice(&available[..consume]);
        reader.consume(consume);

        if newline_pos.is_some() {
            break;
        }
    }

    let line = String::from_utf8(collected)
        .map_err(|_| anyhow!("line from {peer} contained invalid bytes"))?;
    let len = line.len();
    *buf = line;
    Ok(len)
}
