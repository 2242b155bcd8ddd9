//! Portfolio-level allocation breakdowns weighted by dollar value.
use crate::core::error::{FinanceError, Result};
use crate::core::fund::{CapStyle, Fund, Market};
use crate::core::holding::Holding;
use crate::core::money::{percent_of, round2};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A holding resolved against its fund.
#[derive(Debug, Clone, Copy)]
pub struct Position<'a> {
    pub holding: &'a Holding,
    pub fund: &'a Fund,
}

impl<'a> Position<'a> {
    pub fn new(holding: &'a Holding, fund: &'a Fund) -> Self {
        Self { holding, fund }
    }

    /// Shares x NAV. A position without any NAV is worth nothing.
    pub fn value(&self) -> Decimal {
        self.holding.shares * self.holding.effective_nav(self.fund).unwrap_or_default()
    }
}

/// One row of the holdings table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingValue {
    pub holding_id: Uuid,
    pub symbol: String,
    pub name: Option<String>,
    pub shares: Decimal,
    pub nav: Option<Decimal>,
    pub value: Decimal,
    pub percent: Decimal,
}

/// Portfolio-wide percentages for every taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationBreakdown {
    pub total_value: Decimal,
    pub holdings: Vec<HoldingValue>,
    pub cap_style: BTreeMap<CapStyle, Decimal>,
    pub markets: BTreeMap<Market, Decimal>,
    pub regions: BTreeMap<String, Decimal>,
    pub sectors: BTreeMap<String, Decimal>,
}

/// Weights each fund's bucket percentages by the position's dollar value and
/// normalises by the total portfolio value.
///
/// An empty or worthless portfolio yields zero for the fixed cap/style and
/// market buckets and empty region and sector maps.
pub fn aggregate(positions: &[Position<'_>]) -> AllocationBreakdown {
    let values: Vec<Decimal> = positions.iter().map(Position::value).collect();
    let total: Decimal = values.iter().sum();

    let mut cap_style: BTreeMap<CapStyle, Decimal> =
        CapStyle::ALL.iter().map(|s| (*s, Decimal::ZERO)).collect();
    let mut markets: BTreeMap<Market, Decimal> =
        Market::ALL.iter().map(|m| (*m, Decimal::ZERO)).collect();
    let mut regions: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut sectors: BTreeMap<String, Decimal> = BTreeMap::new();

    if !total.is_zero() {
        for (position, value) in positions.iter().zip(&values) {
            let fund = position.fund;
            for (style, weighted) in cap_style.iter_mut() {
                *weighted += fund.cap_style_weight(*style) * value;
            }
            for (market, weighted) in markets.iter_mut() {
                *weighted += fund.market_weight(*market) * value;
            }
            for (region, pct) in &fund.regions {
                *regions.entry(region.clone()).or_default() += pct * value;
            }
            for (sector, pct) in &fund.sectors {
                *sectors.entry(sector.clone()).or_default() += pct * value;
            }
        }
        normalize(cap_style.values_mut(), total);
        normalize(markets.values_mut(), total);
        normalize(regions.values_mut(), total);
        normalize(sectors.values_mut(), total);
    }

    let holdings = positions
        .iter()
        .zip(&values)
        .map(|(position, value)| HoldingValue {
            holding_id: position.holding.id,
            symbol: position.holding.symbol.clone(),
            name: position.fund.name.clone(),
            shares: position.holding.shares,
            nav: position.holding.effective_nav(position.fund),
            value: round2(*value),
            percent: percent_of(*value, total),
        })
        .collect();

    AllocationBreakdown {
        total_value: round2(total),
        holdings,
        cap_style,
        markets,
        regions,
        sectors,
    }
}

fn normalize<'a>(weights: impl Iterator<Item = &'a mut Decimal>, total: Decimal) {
    for weight in weights {
        *weight = round2(*weight / total);
    }
}

/// Rescales every region except `home_region` so the result describes only
/// the international part of the portfolio. Empty when nothing is held abroad.
pub fn international_regions(
    regions: &BTreeMap<String, Decimal>,
    home_region: &str,
) -> BTreeMap<String, Decimal> {
    let home = regions.get(home_region).copied().unwrap_or_default();
    let abroad = Decimal::ONE_HUNDRED - home;
    if abroad <= Decimal::ZERO {
        return BTreeMap::new();
    }
    regions
        .iter()
        .filter(|(region, _)| region.as_str() != home_region)
        .map(|(region, pct)| (region.clone(), round2(pct / abroad * Decimal::ONE_HUNDRED)))
        .collect()
}

/// A portfolio bucket next to the benchmark's value for the same bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub bucket: String,
    pub portfolio: Decimal,
    pub benchmark: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkComparison {
    pub total_market: String,
    pub international: String,
    pub cap_style: Vec<ComparisonRow>,
    pub markets: Vec<ComparisonRow>,
    pub regions: Vec<ComparisonRow>,
    pub sectors: Vec<ComparisonRow>,
    pub international_regions: Vec<ComparisonRow>,
}

/// Lines the portfolio's buckets up against the benchmark funds' own
/// allocations. Fails when a benchmark lacks a bucket the portfolio holds.
pub fn compare(
    breakdown: &AllocationBreakdown,
    international_regions: &BTreeMap<String, Decimal>,
    total_market: &Fund,
    international: &Fund,
) -> Result<BenchmarkComparison> {
    let cap_style = breakdown
        .cap_style
        .iter()
        .map(|(style, pct)| ComparisonRow {
            bucket: style.label().to_string(),
            portfolio: *pct,
            benchmark: total_market.cap_style_weight(*style),
        })
        .collect();
    let markets = breakdown
        .markets
        .iter()
        .map(|(market, pct)| ComparisonRow {
            bucket: market.label().to_string(),
            portfolio: *pct,
            benchmark: total_market.market_weight(*market),
        })
        .collect();

    Ok(BenchmarkComparison {
        total_market: total_market.symbol.clone(),
        international: international.symbol.clone(),
        cap_style,
        markets,
        regions: lookup_rows(&breakdown.regions, total_market, &total_market.regions, "region")?,
        sectors: lookup_rows(&breakdown.sectors, total_market, &total_market.sectors, "sector")?,
        international_regions: lookup_rows(
            international_regions,
            international,
            &international.regions,
            "region",
        )?,
    })
}

fn lookup_rows(
    buckets: &BTreeMap<String, Decimal>,
    benchmark: &Fund,
    benchmark_buckets: &BTreeMap<String, Decimal>,
    kind: &str,
) -> Result<Vec<ComparisonRow>> {
    buckets
        .iter()
        .map(|(bucket, pct)| {
            let reference = benchmark_buckets.get(bucket).ok_or_else(|| {
                FinanceError::lookup(format!(
                    "Benchmark {} has no {kind} allocation for '{bucket}'",
                    benchmark.symbol
                ))
            })?;
            Ok(ComparisonRow {
                bucket: bucket.clone(),
                portfolio: *pct,
                benchmark: *reference,
            })
        })
        .collect()
}
