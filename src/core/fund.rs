//! Fund records and their allocation taxonomies.

use crate::core::error::{FinanceError, Result};
use chrono::NaiveDate;
use rust_decimal::{Decimal, dec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// Allowed deviation from 100% when a taxonomy is checked.
const SUM_TOLERANCE: Decimal = dec!(0.5);

/// The nine capitalization x style buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapStyle {
    LargeCapGrowth,
    LargeCapValue,
    LargeCapBlend,
    MidCapGrowth,
    MidCapValue,
    MidCapBlend,
    SmallCapGrowth,
    SmallCapValue,
    SmallCapBlend,
}

impl CapStyle {
    pub const ALL: [CapStyle; 9] = [
        CapStyle::LargeCapGrowth,
        CapStyle::LargeCapValue,
        CapStyle::LargeCapBlend,
        CapStyle::MidCapGrowth,
        CapStyle::MidCapValue,
        CapStyle::MidCapBlend,
        CapStyle::SmallCapGrowth,
        CapStyle::SmallCapValue,
        CapStyle::SmallCapBlend,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            CapStyle::LargeCapGrowth => "large_cap_growth",
            CapStyle::LargeCapValue => "large_cap_value",
            CapStyle::LargeCapBlend => "large_cap_blend",
            CapStyle::MidCapGrowth => "mid_cap_growth",
            CapStyle::MidCapValue => "mid_cap_value",
            CapStyle::MidCapBlend => "mid_cap_blend",
            CapStyle::SmallCapGrowth => "small_cap_growth",
            CapStyle::SmallCapValue => "small_cap_value",
            CapStyle::SmallCapBlend => "small_cap_blend",
        }
    }

    /// Short display label, e.g. "Large Growth".
    pub fn label(&self) -> &'static str {
        match self {
            CapStyle::LargeCapGrowth => "Large Growth",
            CapStyle::LargeCapValue => "Large Value",
            CapStyle::LargeCapBlend => "Large Blend",
            CapStyle::MidCapGrowth => "Mid Growth",
            CapStyle::MidCapValue => "Mid Value",
            CapStyle::MidCapBlend => "Mid Blend",
            CapStyle::SmallCapGrowth => "Small Growth",
            CapStyle::SmallCapValue => "Small Value",
            CapStyle::SmallCapBlend => "Small Blend",
        }
    }
}

impl Display for CapStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for CapStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        CapStyle::ALL
            .into_iter()
            .find(|style| style.key() == key || style.label().to_lowercase().replace(' ', "_") == key)
            .ok_or_else(|| anyhow::anyhow!("Invalid cap/style bucket: {}", s))
    }
}

/// The domestic/international split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    Domestic,
    International,
}

impl Market {
    pub const ALL: [Market; 2] = [Market::Domestic, Market::International];

    pub fn label(&self) -> &'static str {
        match self {
            Market::Domestic => "Domestic",
            Market::International => "International",
        }
    }
}

/// A fund known to the directory, keyed by its upper-case ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    pub symbol: String,
    pub name: Option<String>,
    pub nav: Option<Decimal>,
    pub last_updated: NaiveDate,
    pub domestic: Decimal,
    pub international: Decimal,
    #[serde(default)]
    pub cap_style: BTreeMap<CapStyle, Decimal>,
    #[serde(default)]
    pub regions: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub sectors: BTreeMap<String, Decimal>,
}

impl Fund {
    pub fn new(symbol: &str, last_updated: NaiveDate) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            name: None,
            nav: None,
            last_updated,
            domestic: Decimal::ZERO,
            international: Decimal::ZERO,
            cap_style: BTreeMap::new(),
            regions: BTreeMap::new(),
            sectors: BTreeMap::new(),
        }
    }

    pub fn cap_style_weight(&self, style: CapStyle) -> Decimal {
        self.cap_style.get(&style).copied().unwrap_or_default()
    }

    pub fn market_weight(&self, market: Market) -> Decimal {
        match market {
            Market::Domestic => self.domestic,
            Market::International => self.international,
        }
    }

    /// A fund is stale once a day has passed since its NAV was last refreshed.
    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.last_updated < today
    }

    /// Checks that each percentage is within 0..=100 and that the cap/style
    /// buckets and the domestic/international pair each sum to about 100.
    /// A taxonomy with no data at all (every bucket zero) is accepted.
    pub fn check_allocations(&self) -> Result<()> {
        let buckets = self
            .cap_style
            .iter()
            .map(|(style, pct)| (style.label().to_string(), *pct))
            .chain(
                Market::ALL
                    .iter()
                    .map(|m| (m.label().to_string(), self.market_weight(*m))),
            )
            .chain(self.regions.iter().map(|(r, p)| (r.clone(), *p)))
            .chain(self.sectors.iter().map(|(s, p)| (s.clone(), *p)));
        for (bucket, pct) in buckets {
            if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
                return Err(FinanceError::validation(format!(
                    "{}: allocation for {bucket} must be between 0 and 100, got {pct}",
                    self.symbol
                )));
            }
        }

        let cap_total: Decimal = CapStyle::ALL.iter().map(|s| self.cap_style_weight(*s)).sum();
        check_sum(&self.symbol, "cap/style", cap_total)?;
        check_sum(&self.symbol, "domestic/international", self.domestic + self.international)
    }
}

fn check_sum(symbol: &str, taxonomy: &str, total: Decimal) -> Result<()> {
    if total.is_zero() || (total - Decimal::ONE_HUNDRED).abs() <= SUM_TOLERANCE {
        return Ok(());
    }
    Err(FinanceError::validation(format!(
        "{symbol}: {taxonomy} allocations must sum to approximately 100%, got {total}%"
    )))
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
