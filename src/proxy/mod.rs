pub mod cache;
pub mod error_page;
pub mod http;
pub mod listener;
pub mod relay;
pub mod target;
pub mod upstream;

use std::sync::Arc;

use anyhow::Result;

use crate::settings::Settings;
use cache::ProxyCache;

/// Shared state handed to every connection task. The cache is the only
/// object shared across connections.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub cache: Arc<ProxyCache>,
}

impl AppContext {
    pub fn new(settings: Arc<Settings>, cache: Arc<ProxyCache>) -> Self {
        Self { settings, cache }
    }
}

pub async fn run(app: AppContext) -> Result<()> {
    listener::start_listener(app).await
}
