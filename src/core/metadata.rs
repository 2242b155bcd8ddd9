use crate::core::error::{FinanceError, Result};
use crate::core::fund::{CapStyle, Fund, normalize_symbol};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Allocation breakdowns for a fund, as published by a profile source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FundMetadata {
    pub symbol: String,
    pub name: Option<String>,
    pub domestic: Decimal,
    pub international: Decimal,
    pub cap_style: BTreeMap<CapStyle, Decimal>,
    pub regions: BTreeMap<String, Decimal>,
    pub sectors: BTreeMap<String, Decimal>,
}

impl FundMetadata {
    /// Copies every taxonomy onto `fund`, leaving its NAV alone. Fails when
    /// the profile describes a different fund.
    pub fn apply_to(self, fund: &mut Fund) -> Result<()> {
        let symbol = normalize_symbol(&self.symbol);
        if !symbol.is_empty() && symbol != fund.symbol {
            return Err(FinanceError::lookup(format!(
                "Profile for {} describes {} instead",
                fund.symbol, symbol
            )));
        }
        if self.name.is_some() {
            fund.name = self.name;
        }
        fund.domestic = self.domestic;
        fund.international = self.international;
        fund.cap_style = self.cap_style;
        fund.regions = self.regions;
        fund.sectors = self.sectors;
        Ok(())
    }
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn fetch_metadata(&self, symbol: &str) -> anyhow::Result<FundMetadata>;
}
