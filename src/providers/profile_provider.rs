use super::util::{to_decimal, with_retry};
use crate::core::config::RetryPolicy;
use crate::core::fund::{CapStyle, normalize_symbol};
use crate::core::metadata::{FundMetadata, MetadataProvider};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{error, instrument};

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    symbol: Option<String>,
    name: Option<String>,
    #[serde(default)]
    domestic: f64,
    #[serde(default)]
    international: f64,
    #[serde(default)]
    cap_style: HashMap<String, f64>,
    #[serde(default)]
    regions: Vec<Weight>,
    #[serde(default)]
    sectors: Vec<Weight>,
}

#[derive(Debug, Deserialize)]
struct Weight {
    name: String,
    percentage: f64,
}

/// Fund allocation breakdowns from a JSON profile service at
/// `GET {base_url}/funds/{symbol}`.
pub struct ProfileProvider {
    base_url: String,
    retry: RetryPolicy,
}

impl ProfileProvider {
    pub fn new(base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    fn weights(weights: Vec<Weight>) -> anyhow::Result<BTreeMap<String, Decimal>> {
        let mut out = BTreeMap::new();
        for w in weights {
            *out.entry(w.name.trim().to_string()).or_default() += to_decimal(w.percentage, 2)?;
        }
        Ok(out)
    }
}

#[async_trait]
impl MetadataProvider for ProfileProvider {
    #[instrument(name = "ProfileFetch", skip(self))]
    async fn fetch_metadata(&self, symbol: &str) -> anyhow::Result<FundMetadata> {
        let url = format!("{}/funds/{}", self.base_url, symbol);
        let response = with_retry(|| reqwest::get(&url), self.retry)
            .await
            .context("Profile request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for fund profile: {}",
                response.status(),
                symbol
            ));
        }

        let response_text = response
            .text()
            .await
            .context("Failed to get response text")?;

        let profile: ProfileResponse = match serde_json::from_str(&response_text) {
            Ok(data) => data,
            Err(e) => {
                error!(
                    error = ?e,
                    response = %response_text,
                    "Failed to parse fund profile response"
                );
                return Err(e).context("Failed to parse fund profile response");
            }
        };

        let mut cap_style = BTreeMap::new();
        for (key, pct) in profile.cap_style {
            let style = key.parse::<CapStyle>()?;
            cap_style.insert(style, to_decimal(pct, 2)?);
        }

        Ok(FundMetadata {
            symbol: normalize_symbol(profile.symbol.as_deref().unwrap_or(symbol)),
            name: profile.name,
            domestic: to_decimal(profile.domestic, 2)?,
            international: to_decimal(profile.international, 2)?,
            cap_style,
            regions: Self::weights(profile.regions)?,
            sectors: Self::weights(profile.sectors)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    async fn create_mock_server(symbol: &str, status: u16, body: &str) -> wiremock::MockServer {
        let mock_server = wiremock::MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/funds/{symbol}")))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(server: &wiremock::MockServer) -> ProfileProvider {
        ProfileProvider::new(
            &server.uri(),
            RetryPolicy {
                retries: 0,
                delay_ms: 1,
            },
        )
    }

    const MOCK_JSON: &str = r#"{
        "symbol": "vxus",
        "name": "Vanguard Total International Stock ETF",
        "domestic": 0.5,
        "international": 99.5,
        "cap_style": {
            "large_cap_value": 30.1,
            "large_cap_blend": 35,
            "large_cap_growth": 20,
            "mid_cap_blend": 10,
            "small_cap_blend": 4.9
        },
        "regions": [
            {"name": "Europe", "percentage": 39.4},
            {"name": "Pacific", "percentage": 27.1},
            {"name": "Emerging Markets", "percentage": 25.3},
            {"name": "North America", "percentage": 8.2}
        ],
        "sectors": [
            {"name": "Financials", "percentage": 21.7},
            {"name": "Industrials", "percentage": 15.2}
        ]
    }"#;

    #[tokio::test]
    async fn test_fetch_metadata() {
        let server = create_mock_server("VXUS", 200, MOCK_JSON).await;

        let meta = provider(&server).fetch_metadata("VXUS").await.unwrap();

        assert_eq!(meta.symbol, "VXUS");
        assert_eq!(
            meta.name.as_deref(),
            Some("Vanguard Total International Stock ETF")
        );
        assert_eq!(meta.domestic, dec!(0.5));
        assert_eq!(meta.international, dec!(99.5));
        assert_eq!(meta.cap_style.len(), 5);
        assert_eq!(meta.cap_style[&CapStyle::LargeCapValue], dec!(30.1));
        assert_eq!(meta.regions.len(), 4);
        assert_eq!(meta.regions["Europe"], dec!(39.4));
        assert_eq!(meta.sectors["Industrials"], dec!(15.2));
    }

    #[tokio::test]
    async fn test_missing_taxonomies_default_to_empty() {
        let server = create_mock_server("CASH", 200, r#"{"name": "Money Market"}"#).await;

        let meta = provider(&server).fetch_metadata("CASH").await.unwrap();
        assert_eq!(meta.symbol, "CASH");
        assert!(meta.cap_style.is_empty());
        assert!(meta.regions.is_empty());
        assert_eq!(meta.domestic, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_unknown_cap_style_bucket_fails() {
        let body = r#"{"cap_style": {"mega_cap_growth": 100}}"#;
        let server = create_mock_server("ODD", 200, body).await;

        let err = provider(&server).fetch_metadata("ODD").await.unwrap_err();
        assert!(err.to_string().contains("Invalid cap/style bucket"));
    }

    #[tokio::test]
    async fn test_not_found() {
        let server = create_mock_server("VXUS", 200, MOCK_JSON).await;

        let err = provider(&server).fetch_metadata("ZZZZ").await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP error: 404 Not Found for fund profile: ZZZZ");
    }

    #[tokio::test]
    async fn test_malformed_profile() {
        let server = create_mock_server("BAD", 200, "<html>oops</html>").await;

        let err = provider(&server).fetch_metadata("BAD").await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse fund profile response"));
    }
}
