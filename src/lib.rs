pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, SearchCommand};

pub use adapters::{RedbiomBackend, WebdisClient};
pub use app::run_search;
pub use config::RedbiomConfig;
pub use crate::core::dispatch::Dispatcher;
pub use domain::{model::SearchRequest, ports::SearchBackend};
pub use utils::error::{RedbiomError, Result};
