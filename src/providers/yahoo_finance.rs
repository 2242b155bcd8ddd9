use super::util::{to_decimal, with_retry};
use crate::core::config::RetryPolicy;
use crate::core::price::{PriceProvider, PriceResult};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Fund NAVs from the Yahoo Finance chart endpoint.
pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("nestegg/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry,
        })
    }
}

#[derive(Deserialize, Debug)]
struct YahooPriceResponse {
    chart: PriceChartResult,
}

#[derive(Deserialize, Debug)]
struct PriceChartResult {
    result: Option<Vec<PriceChartItem>>,
}

#[derive(Deserialize, Debug)]
struct PriceChartItem {
    meta: PriceChartMeta,
}

#[derive(Deserialize, Debug)]
struct PriceChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
    currency: String,
    #[serde(alias = "longName")]
    long_name: Option<String>,
    #[serde(alias = "shortName")]
    short_name: Option<String>,
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooPriceFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_price(&self, symbol: &str) -> Result<PriceResult> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1d",
            self.base_url, symbol
        );
        debug!("Requesting price data from {}", url);

        let response = with_retry(|| self.client.get(&url).send(), self.retry)
            .await
            .with_context(|| format!("Request error for symbol: {symbol}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: YahooPriceResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let item = data
            .chart
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;

        let meta = item.meta;
        Ok(PriceResult {
            price: to_decimal(meta.regular_market_price, 4)?,
            currency: meta.currency,
            short_name: meta.long_name.or(meta.short_name),
        })
    }
}
