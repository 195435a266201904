pub mod cli;
pub mod logging;
pub mod proxy;
pub mod settings;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::proxy::{AppContext, cache::ProxyCache};
use crate::settings::Settings;

pub async fn run(settings: Settings) -> Result<()> {
    let settings = Arc::new(settings);
    let cache = Arc::new(ProxyCache::new(
        settings.max_cache_size,
        settings.max_object_size,
    ));
    info!(
        max_cache_size = settings.max_cache_size,
        max_object_size = settings.max_object_size,
        "response cache initialized"
    );
    let app = AppContext::new(settings, cache);
    proxy::run(app).await
}
