use anyhow::{Context, Result, anyhow};
use tokio::net::{TcpStream, lookup_host};
use tracing::debug;

/// Resolve the origin host and connect, trying each resolved address in
/// turn. No timeout is applied; a stalled connect stalls only its own
/// connection task.
pub async fn connect_to_origin(host: &str, port: u16) -> Result<TcpStream> {
    let addrs = lookup_host((host, port))
        .await
        .with_context(|| format!("resolving DNS for {host}:{port}"))?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                if let Err(err) = stream.set_nodelay(true) {
                    debug!(host, port, error = %err, "failed to set TCP_NODELAY on upstream stream");
                }
                debug!(host, port, addr = %addr, "connected to origin");
                return Ok(stream);
            }
            Err(err) => {
                let err = Err::<(), std::io::Error>(err)
                    .with_context(|| format!("failed to connect to {addr}"))
                    .unwrap_err();
                last_err = Some(err);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("DNS lookup for {host}:{port} returned no addresses")))
}
