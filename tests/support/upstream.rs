use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Scripted origin server: replies to every connection with one canned
/// response, counting accepted connections and recording the last request
/// head it saw.
pub struct TestUpstream {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<String>>>,
    handle: JoinHandle<()>,
}

impl TestUpstream {
    pub async fn http_ok(body: &str) -> Result<Self> {
        let response = format!(
            "HTTP/1.0 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        Self::raw_response(response.into_bytes()).await
    }

    pub async fn raw_response(response: impl Into<Vec<u8>>) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        let connections = Arc::new(AtomicUsize::new(0));
        let last_request = Arc::new(Mutex::new(None));
        let response = Arc::new(response.into());

        let handle = {
            let connections = connections.clone();
            let last_request = last_request.clone();
            tokio::spawn(async move {
                loop {
                    let (mut stream, _) = match listener.accept().await {
                        Ok(conn) => conn,
                        Err(_) => break,
                    };
                    connections.fetch_add(1, Ordering::SeqCst);
                    let response: Arc<Vec<u8>> = response.clone();
                    let last_request = last_request.clone();
                    tokio::spawn(async move {
                        if let Ok(head) = read_until_double_crlf(&mut stream).await {
                            *last_request.lock().unwrap() = Some(head);
                        }
                        let _ = stream.write_all(&response).await;
                        stream.shutdown().await.ok();
                    });
                }
            })
        };

        Ok(Self {
            addr,
            connections,
            last_request,
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of connections the origin has accepted.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<String> {
        self.last_request.lock().unwrap().clone()
    }
}

impl Drop for TestUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn read_until_double_crlf(stream: &mut TcpStream) -> Result<String> {
    let mut buffer = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        let bytes = stream.read(&mut byte).await?;
        if bytes == 0 {
            break;
        }
        buffer.extend_from_slice(&byte);
        if buffer.ends_with(b"\r\n\r\n") {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buffer).to_string())
}
