#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use wirecache::{
    cli::LogFormat,
    proxy::{self, AppContext, cache::ProxyCache},
    settings::Settings,
};

pub mod upstream;

pub fn default_test_settings(listen: SocketAddr) -> Settings {
    Settings {
        listen,
        log: LogFormat::Text,
        max_cache_size: 1_049_000,
        max_object_size: 102_400,
        max_request_line: 8 * 1024,
        max_header_bytes: 32 * 1024,
    }
}

pub fn find_free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

pub async fn wait_for_listener(addr: SocketAddr) -> Result<()> {
    for _ in 0..50 {
        match timeout(Duration::from_millis(50), TcpStream::connect(addr)).await {
            Ok(Ok(mut stream)) => {
                stream.shutdown().await.ok();
                return Ok(());
            }
            _ => sleep(Duration::from_millis(50)).await,
        }
    }
    Err(anyhow!("listener {addr} did not become ready"))
}

pub struct ProxyHarness {
    pub addr: SocketAddr,
    pub settings: Arc<Settings>,
    pub cache: Arc<ProxyCache>,
    handle: JoinHandle<()>,
}

impl ProxyHarness {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with<F>(configure: F) -> Result<Self>
    where
        F: FnOnce(&mut Settings),
    {
        let port = find_free_port()?;
        let listen: SocketAddr = (Ipv4Addr::LOCALHOST, port).into();
        let mut settings = default_test_settings(listen);
        configure(&mut settings);
        let addr = settings.listen;
        let settings = Arc::new(settings);
        let cache = Arc::new(ProxyCache::new(
            settings.max_cache_size,
            settings.max_object_size,
        ));

        let app = AppContext::new(settings.clone(), cache.clone());
        let handle = tokio::spawn(async move {
            if let Err(err) = proxy::run(app).await {
                eprintln!("proxy run failed: {err:?}");
            }
        });
        wait_for_listener(addr).await?;

        Ok(Self {
            addr,
            settings,
            cache,
            handle,
        })
    }

    pub async fn connect(&self) -> Result<TcpStream> {
        Ok(TcpStream::connect(self.addr).await?)
    }

    /// Send one raw request and collect the full response until the proxy
    /// closes the connection.
    pub async fn request(&self, raw: &str) -> Result<Vec<u8>> {
        let mut stream = self.connect().await?;
        stream.write_all(raw.as_bytes()).await?;
        let mut response = Vec::new();
        timeout(Duration::from_secs(5), stream.read_to_end(&mut response)).await??;
        Ok(response)
    }

    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}
