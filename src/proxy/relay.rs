use std::net::SocketAddr;
use std::time::Instant;

use anyhow::{Context, Result};
use bytes::Bytes;
use http::StatusCode;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, trace};

use crate::logging::AccessLogBuilder;
use crate::proxy::AppContext;
use crate::proxy::error_page::send_error;
use crate::proxy::http::codec::{ForwardRequest, RequestLine, read_line};
use crate::proxy::target::{RequestTarget, TargetError};
use crate::proxy::upstream::connect_to_origin;

const RELAY_CHUNK_SIZE: usize = 8192;

/// Failures that occur before any response bytes have been committed to the
/// client, each answered with a formatted error page. A request line that
/// cannot be split at all is handled separately: with no well-formed request
/// to react to, the connection is dropped without a response.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("method '{0}' is not implemented")]
    UnsupportedMethod(String),
    #[error("malformed request URI: {0}")]
    MalformedTarget(#[from] TargetError),
    #[error("invalid request headers: {cause}")]
    BadHeaders { cause: anyhow::Error },
    #[error("failed to reach origin {host}:{port}: {cause}")]
    UpstreamConnect {
        host: String,
        port: u16,
        cause: anyhow::Error,
    },
    #[error("failed to forward request to origin {host}:{port}: {cause}")]
    UpstreamRequest {
        host: String,
        port: u16,
        cause: std::io::Error,
    },
    #[error("origin {host}:{port} failed before sending a response: {cause}")]
    UpstreamRead {
        host: String,
        port: u16,
        cause: std::io::Error,
    },
}

impl RelayError {
    fn status(&self) -> StatusCode {
        match self {
            RelayError::UnsupportedMethod(_) => StatusCode::NOT_IMPLEMENTED,
            RelayError::MalformedTarget(_) | RelayError::BadHeaders { .. } => {
                StatusCode::BAD_REQUEST
            }
            RelayError::UpstreamConnect { .. }
            | RelayError::UpstreamRequest { .. }
            | RelayError::UpstreamRead { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Drive one client connection through the relay: request line, cache
/// lookup, method and URI validation, origin fetch, response streaming,
/// and the caching decision. States run strictly in that order.
pub(super) async fn serve_connection<S>(stream: S, peer: SocketAddr, app: AppContext) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let started = Instant::now();
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    let read = read_line(&mut reader, &mut line, peer, app.settings.max_request_line)
        .await
        .with_context(|| format!("reading request line from {peer}"))?;
    if read == 0 {
        trace!(peer = %peer, "client closed before sending a request");
        return Ok(());
    }
    let request = match RequestLine::parse(&line) {
        Ok(request) => request,
        Err(err) => {
            // No well-formed request line to react to; drop the connection
            // without a response.
            debug!(peer = %peer, error = %err, "malformed request line");
            return Ok(());
        }
    };
    let log = AccessLogBuilder::new(peer)
        .method(request.method.as_str())
        .uri(request.uri.as_str());

    // A hit replays the stored response bytes verbatim, headers included.
    if let Some(payload) = app.cache.lookup(&request.uri) {
        let result = replay_cached(&mut write_half, &payload).await;
        log.cache("hit")
            .bytes_out(payload.len() as u64)
            .elapsed(started.elapsed())
            .log();
        return result;
    }

    // Exact match against the wire token; anything else is answered without
    // contacting an origin.
    if request.method != "GET" {
        let err = RelayError::UnsupportedMethod(request.method.clone());
        return respond_error(&mut write_half, err, log, started).await;
    }

    let target = match RequestTarget::parse(&request.uri) {
        Ok(target) => target,
        Err(err) => {
            return respond_error(&mut write_half, RelayError::from(err), log, started).await;
        }
    };

    let upstream = match connect_to_origin(&target.host, target.port).await {
        Ok(upstream) => upstream,
        Err(cause) => {
            let err = RelayError::UpstreamConnect {
                host: target.host,
                port: target.port,
                cause,
            };
            return respond_error(&mut write_half, err, log, started).await;
        }
    };

    // Consume the client's remaining header lines into the forward request;
    // proxy-controlled names are replaced, everything else passes through.
    let mut forward = ForwardRequest::new(&target.host, &target.path);
    let mut header_line = String::new();
    let mut remaining = app.settings.max_header_bytes;
    loop {
        let read = match read_line(&mut reader, &mut header_line, peer, remaining).await {
            Ok(read) => read,
            Err(cause) => {
                let err = RelayError::BadHeaders { cause };
                return respond_error(&mut write_half, err, log, started).await;
            }
        };
        if read == 0 {
            // Client EOF ends the header block early; forward what we have.
            break;
        }
        remaining = remaining.saturating_sub(read);
        if !forward.push_client_line(&header_line) {
            break;
        }
    }

    let (upstream_read, mut upstream_write) = upstream.into_split();
    if let Err(cause) = forward.write_to(&mut upstream_write).await {
        let err = RelayError::UpstreamRequest {
            host: target.host,
            port: target.port,
            cause,
        };
        return respond_error(&mut write_half, err, log, started).await;
    }

    // Stream the response until the origin closes, copying each chunk to
    // the client as it arrives. A capped accumulation buffer keeps a copy
    // for the cache; the true byte count is tracked independently.
    let mut upstream_reader = BufReader::new(upstream_read);
    let max_object = app.settings.max_object_size as usize;
    let mut chunk = [0u8; RELAY_CHUNK_SIZE];
    let mut accumulated: Vec<u8> = Vec::new();
    let mut accumulating = true;
    let mut total: u64 = 0;

    loop {
        let read = match upstream_reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(read) => read,
            Err(cause) if total == 0 => {
                let err = RelayError::UpstreamRead {
                    host: target.host,
                    port: target.port,
                    cause,
                };
                return respond_error(&mut write_half, err, log, started).await;
            }
            Err(cause) => {
                // The status line is already committed; abort silently.
                debug!(peer = %peer, error = %cause, "upstream failed mid-stream");
                log.cache("miss")
                    .bytes_out(total)
                    .elapsed(started.elapsed())
                    .error_reason(cause.to_string())
                    .log();
                return Ok(());
            }
        };
        if let Err(cause) = write_half.write_all(&chunk[..read]).await {
            debug!(peer = %peer, error = %cause, "client write failed mid-stream");
            log.cache("miss")
                .bytes_out(total)
                .elapsed(started.elapsed())
                .error_reason(cause.to_string())
                .log();
            return Ok(());
        }
        total += read as u64;
        if accumulating {
            if accumulated.len() + read <= max_object {
                accumulated.extend_from_slice(&chunk[..read]);
            } else {
                // Too large to cache; keep streaming without the copy.
                accumulating = false;
                accumulated = Vec::new();
            }
        }
    }

    let disposition = if total <= app.settings.max_object_size {
        app.cache.insert(&request.uri, Bytes::from(accumulated));
        "stored"
    } else {
        "miss"
    };
    write_half.shutdown().await.ok();
    log.cache(disposition)
        .bytes_out(total)
        .elapsed(started.elapsed())
        .log();
    Ok(())
}

async fn replay_cached<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(payload)
        .await
        .context("writing cached response to client")?;
    writer.shutdown().await.ok();
    Ok(())
}

async fn respond_error<W>(
    writer: &mut W,
    err: RelayError,
    log: AccessLogBuilder,
    started: Instant,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let status = err.status();
    debug!(error = %err, status = status.as_u16(), "request failed before response streaming");
    if let Err(write_err) = send_error(writer, status, &err.to_string()).await {
        trace!(error = %write_err, "error page delivery failed");
    }
    writer.shutdown().await.ok();
    log.status(status)
        .error_reason(err.to_string())
        .elapsed(started.elapsed())
        .log();
    Ok(())
}
