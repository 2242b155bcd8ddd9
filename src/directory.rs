//! Fund directory: persisted per-fund metadata keyed by ticker, backed by the
//! store and filled from the price and metadata providers on first use.

use crate::core::error::{FinanceError, Result};
use crate::core::fund::{Fund, normalize_symbol};
use crate::core::metadata::MetadataProvider;
use crate::core::price::PriceProvider;
use crate::store::Store;
use chrono::NaiveDate;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct FundDirectory {
    store: Arc<dyn Store>,
    prices: Arc<dyn PriceProvider>,
    metadata: Arc<dyn MetadataProvider>,
    strict_allocations: bool,
}

impl FundDirectory {
    pub fn new(
        store: Arc<dyn Store>,
        prices: Arc<dyn PriceProvider>,
        metadata: Arc<dyn MetadataProvider>,
        strict_allocations: bool,
    ) -> Self {
        Self {
            store,
            prices,
            metadata,
            strict_allocations,
        }
    }

    /// Returns the stored fund for `symbol`, registering it from the providers
    /// when it is not known yet.
    pub async fn resolve(&self, symbol: &str, today: NaiveDate) -> Result<Fund> {
        let symbol = normalize_symbol(symbol);
        if let Some(fund) = self.store.fund(&symbol).await? {
            return Ok(fund);
        }

        debug!("Registering new fund {}", symbol);
        let (price, metadata) = futures::join!(
            self.prices.fetch_price(&symbol),
            self.metadata.fetch_metadata(&symbol)
        );
        let price = price.map_err(|e| unresolved(&symbol, e))?;
        let metadata = metadata.map_err(|e| unresolved(&symbol, e))?;

        let mut fund = Fund::new(&symbol, today);
        fund.nav = Some(price.price);
        fund.name = price.short_name;
        metadata.apply_to(&mut fund)?;

        if let Err(e) = fund.check_allocations() {
            if self.strict_allocations {
                return Err(e);
            }
            warn!("Registering {} despite allocation mismatch: {}", symbol, e);
        }

        self.store.put_fund(&fund).await?;
        info!("Registered fund {} at NAV {:?}", fund.symbol, fund.nav);
        Ok(fund)
    }

    /// Fetches a live NAV for a known fund and stores it.
    pub async fn refresh_nav(&self, symbol: &str, today: NaiveDate) -> Result<Fund> {
        let symbol = normalize_symbol(symbol);
        let mut fund = self
            .store
            .fund(&symbol)
            .await?
            .ok_or_else(|| FinanceError::lookup(format!("Unknown fund: {symbol}")))?;

        let price = self
            .prices
            .fetch_price(&symbol)
            .await
            .map_err(|e| unresolved(&symbol, e))?;
        fund.nav = Some(price.price);
        fund.last_updated = today;
        self.store.put_fund(&fund).await?;
        debug!("Refreshed {} NAV to {}", symbol, price.price);
        Ok(fund)
    }

    /// Loads every fund in `symbols`, refreshing stale ones concurrently. A
    /// fund whose refresh fails keeps its previous NAV and is reported in
    /// [`LoadedFunds::failed_refreshes`].
    pub async fn funds_for(&self, symbols: &[String], today: NaiveDate) -> Result<LoadedFunds> {
        let mut loaded = LoadedFunds::default();
        for symbol in symbols {
            match self.store.fund(symbol).await? {
                Some(fund) => loaded.funds.push(fund),
                None => {
                    warn!("Holding references unknown fund {}", symbol);
                    loaded.missing.push(symbol.clone());
                }
            }
        }

        let refreshes = loaded
            .funds
            .iter_mut()
            .filter(|f| f.is_stale(today))
            .map(|fund| async move {
                match self.refresh_nav(&fund.symbol, today).await {
                    Ok(fresh) => {
                        *fund = fresh;
                        None
                    }
                    Err(e) => {
                        warn!("Keeping previous NAV for {}: {}", fund.symbol, e);
                        Some((fund.symbol.clone(), e))
                    }
                }
            });
        loaded.failed_refreshes = join_all(refreshes).await.into_iter().flatten().collect();
        Ok(loaded)
    }
}

/// Funds backing a set of holdings, plus what could not be loaded fresh.
#[derive(Debug, Default)]
pub struct LoadedFunds {
    pub funds: Vec<Fund>,
    /// Symbols with no fund record.
    pub missing: Vec<String>,
    /// Stale funds whose NAV could not be refreshed; they keep the old NAV.
    pub failed_refreshes: Vec<(String, FinanceError)>,
}

fn unresolved(symbol: &str, e: anyhow::Error) -> FinanceError {
    FinanceError::lookup(format!("Unable to resolve symbol {symbol}: {e:#}"))
}
