// Application layer: wires configuration, the webdis backend and the dispatcher.

use crate::adapters::{RedbiomBackend, WebdisClient};
use crate::config::RedbiomConfig;
use crate::core::dispatch::Dispatcher;
use crate::domain::model::SearchRequest;
use crate::utils::error::Result;
use std::io::Write;

pub fn webdis_dispatcher(config: &RedbiomConfig) -> Result<Dispatcher<RedbiomBackend>> {
    let store = WebdisClient::new(config)?;
    Ok(Dispatcher::new(RedbiomBackend::new(store)))
}

/// Runs one search against the store described by `config`.
pub async fn run_search<W: Write>(
    config: &RedbiomConfig,
    request: &SearchRequest,
    out: &mut W,
) -> Result<usize> {
    tracing::info!("Searching {} on {}", request.name(), config.hostname);
    let dispatcher = webdis_dispatcher(config)?;
    dispatcher.dispatch(request, out).await
}
