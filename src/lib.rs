pub mod app;
pub mod core;
pub mod directory;
pub mod providers;
pub mod store;

pub use app::{BudgetView, Finance, Notice, NoticeLevel, PortfolioView};
pub use directory::FundDirectory;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Loads the configuration, opens the on-disk store and wires the quote
/// providers into a ready [`Finance`].
pub fn open(config_path: Option<&str>) -> Result<Finance> {
    info!("Nestegg starting...");

    let config = match config_path {
        Some(path) => crate::core::config::AppConfig::load_from_path(path)?,
        None => crate::core::config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let retry = config.providers.retry;
    let yahoo_base_url = config
        .providers
        .yahoo
        .as_ref()
        .map_or("https://query1.finance.yahoo.com", |p| &p.base_url);
    let prices = providers::YahooFinanceProvider::new(yahoo_base_url, retry)?;

    let profile_base_url = config
        .providers
        .profile
        .as_ref()
        .map(|p| p.base_url.as_str())
        .context("No fund profile provider configured (providers.profile.base_url)")?;
    let metadata = providers::ProfileProvider::new(profile_base_url, retry);

    let store = store::open_store(&config)?;
    let directory = FundDirectory::new(
        Arc::clone(&store),
        Arc::new(prices),
        Arc::new(metadata),
        config.strict_allocations,
    );

    Ok(Finance::new(
        store,
        directory,
        config.benchmarks.clone(),
        config.home_region.as_str(),
    ))
}
