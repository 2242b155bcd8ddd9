//! Pricing abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest quote for a fund: its NAV per share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResult {
    pub price: Decimal,
    pub currency: String,
    pub short_name: Option<String>,
}

/// Resolves a ticker to its current NAV. Implementations must not cache:
/// every call is expected to return a live quote.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<PriceResult>;
}
