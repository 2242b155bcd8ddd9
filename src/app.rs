//! The request boundary. Every user action comes back as a [`Notice`] or a
//! view; errors are logged and turned into messages here.

use crate::core::allocation::{
    AllocationBreakdown, BenchmarkComparison, Position, aggregate, compare, international_regions,
};
use crate::core::budget::{BudgetForm, YearMonth};
use crate::core::config::BenchmarkConfig;
use crate::core::error::{FinanceError, Result};
use crate::core::holding::{HoldingForm, Portfolio, Purchase, UserId, parse_nav_override};
use crate::core::money::parse_decimal;
use crate::core::savings::{BudgetYear, MonthlyBudget, budget_year};
use crate::directory::FundDirectory;
use crate::store::Store;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.level == NoticeLevel::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioView {
    pub portfolio: Portfolio,
    pub breakdown: AllocationBreakdown,
    pub international_regions: BTreeMap<String, Decimal>,
    /// Absent when the portfolio is empty or a benchmark could not be used.
    pub comparison: Option<BenchmarkComparison>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetView {
    pub income: Decimal,
    pub year: BudgetYear,
}

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct Finance {
    store: Arc<dyn Store>,
    directory: FundDirectory,
    benchmarks: BenchmarkConfig,
    home_region: String,
    today: Clock,
}

impl Finance {
    pub fn new(
        store: Arc<dyn Store>,
        directory: FundDirectory,
        benchmarks: BenchmarkConfig,
        home_region: impl Into<String>,
    ) -> Self {
        Self {
            store,
            directory,
            benchmarks,
            home_region: home_region.into(),
            today: Arc::new(|| chrono::Local::now().date_naive()),
        }
    }

    /// Replaces the wall clock, e.g. to pin "today" in tests.
    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    fn today(&self) -> NaiveDate {
        (self.today)()
    }

    pub async fn add_holding(&self, user: &UserId, form: &HoldingForm) -> Notice {
        match self.try_add_holding(user, form).await {
            Ok(()) => Notice::success("Holding added successfully."),
            Err(e @ FinanceError::Validation(_)) => report(e.to_string()),
            Err(e) => report(format!(
                "Error adding holding: {e}. Please check the fund symbol and try again."
            )),
        }
    }

    async fn try_add_holding(&self, user: &UserId, form: &HoldingForm) -> Result<()> {
        let order = form.validate()?;
        let today = self.today();
        let mut fund = self.directory.resolve(&order.symbol, today).await?;
        let nav_override = self
            .store
            .holdings(user)
            .await?
            .into_iter()
            .find(|h| h.symbol == fund.symbol)
            .and_then(|h| h.nav_override);
        if matches!(order.purchase, Purchase::Dollars(_))
            && nav_override.is_none()
            && fund.is_stale(today)
        {
            fund = self.directory.refresh_nav(&fund.symbol, today).await?;
        }
        let shares = order
            .purchase
            .shares_at(&fund.symbol, nav_override.or(fund.nav))?;

        let holding = self.store.add_shares(user, &fund.symbol, shares).await?;
        info!(
            "{} bought {} {} (now {})",
            user, shares, holding.symbol, holding.shares
        );
        Ok(())
    }

    pub async fn remove_holding(&self, user: &UserId, id: Uuid) -> Notice {
        let result = async {
            let holding = self
                .store
                .holding(id)
                .await?
                .ok_or_else(|| FinanceError::lookup("Holding not found."))?;
            if !holding.owned_by(user) {
                return Err(FinanceError::permission(
                    "You do not have permission to remove this holding.",
                ));
            }
            self.store.remove_holding(id).await?;
            info!("{} removed holding {}", user, holding.symbol);
            Ok(())
        }
        .await;

        match result {
            Ok(()) => Notice::success("Holding removed successfully."),
            Err(e) => report(e.to_string()),
        }
    }

    /// Sets or, given blank input, clears the manual NAV for one holding.
    pub async fn override_nav(&self, user: &UserId, id: Uuid, raw: &str) -> Notice {
        let result = async {
            let holding = self
                .store
                .holding(id)
                .await?
                .ok_or_else(|| FinanceError::lookup("Holding not found."))?;
            if !holding.owned_by(user) {
                return Err(FinanceError::permission(
                    "You do not have permission to update this holding.",
                ));
            }
            let nav = parse_nav_override(raw)?;
            self.store.set_nav_override(id, nav).await?;
            Ok((holding.symbol, nav))
        }
        .await;

        match result {
            Ok((symbol, Some(_))) => Notice::success(format!("NAV for {symbol} updated successfully.")),
            Ok((symbol, None)) => Notice::success(format!("NAV override for {symbol} cleared.")),
            Err(e) => report(e.to_string()),
        }
    }

    pub async fn set_income(&self, user: &UserId, raw: &str) -> Notice {
        let result = async {
            let income = parse_decimal("income", raw).map_err(FinanceError::Validation)?;
            if income < Decimal::ZERO {
                return Err(FinanceError::validation("Monthly income must not be negative"));
            }
            self.store.set_monthly_income(user, income.round_dp(2)).await
        }
        .await;

        match result {
            Ok(portfolio) => {
                info!("{} set monthly income to {}", user, portfolio.monthly_income);
                Notice::success("Monthly income updated.")
            }
            Err(e) => report(e.to_string()),
        }
    }

    /// Logs an expense in `year` (the current year when absent).
    pub async fn add_budget_item(&self, user: &UserId, year: Option<i32>, form: &BudgetForm) -> Notice {
        let year = year.unwrap_or_else(|| self.today().year());
        let result = async {
            let item = form.validate(user, year)?;
            self.store.insert_budget_item(&item).await?;
            Ok::<_, FinanceError>(item)
        }
        .await;

        match result {
            Ok(item) => {
                info!("{} logged {} {} in {}", user, item.amount, item.item, item.period());
                Notice::success("Expense added successfully.")
            }
            Err(e) => report(format!("Error adding expense: {e}")),
        }
    }

    pub async fn remove_budget_item(&self, user: &UserId, id: Uuid) -> Notice {
        let result = async {
            let item = self
                .store
                .budget_item(id)
                .await?
                .ok_or_else(|| FinanceError::lookup("Expense not found."))?;
            if !item.owned_by(user) {
                return Err(FinanceError::permission(
                    "You do not have permission to remove this expense.",
                ));
            }
            self.store.remove_budget_item(id).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => Notice::success("Expense removed successfully."),
            Err(e) => report(e.to_string()),
        }
    }

    /// Refreshes stale NAVs, then recomputes the allocation breakdown and the
    /// benchmark comparison from the store.
    pub async fn portfolio_view(&self, user: &UserId) -> std::result::Result<PortfolioView, Notice> {
        self.build_portfolio_view(user)
            .await
            .map_err(|e| report(format!("Unable to load portfolio: {e}")))
    }

    async fn build_portfolio_view(&self, user: &UserId) -> Result<PortfolioView> {
        let today = self.today();
        let portfolio = self.store.portfolio(user).await?;
        let holdings = self.store.holdings(user).await?;
        let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
        let loaded = self.directory.funds_for(&symbols, today).await?;

        let mut notices: Vec<Notice> = loaded
            .missing
            .iter()
            .map(|symbol| {
                report(format!(
                    "Fund {symbol} is missing from the fund directory; its holding is left out."
                ))
            })
            .collect();
        notices.extend(loaded.failed_refreshes.iter().map(|(symbol, e)| {
            report(format!(
                "Could not refresh the NAV for {symbol}; showing the last known value. {e}"
            ))
        }));

        let positions: Vec<Position<'_>> = holdings
            .iter()
            .filter_map(|h| {
                loaded
                    .funds
                    .iter()
                    .find(|f| f.symbol == h.symbol)
                    .map(|f| Position::new(h, f))
            })
            .collect();
        let breakdown = aggregate(&positions);
        let intl = international_regions(&breakdown.regions, &self.home_region);

        let comparison = if holdings.is_empty() {
            None
        } else {
            match self.benchmark_comparison(&breakdown, &intl, today).await {
                Ok(comparison) => Some(comparison),
                Err(e) => {
                    notices.push(report(format!("Benchmark comparison unavailable: {e}")));
                    None
                }
            }
        };

        Ok(PortfolioView {
            portfolio,
            breakdown,
            international_regions: intl,
            comparison,
            notices,
        })
    }

    async fn benchmark_comparison(
        &self,
        breakdown: &AllocationBreakdown,
        intl: &BTreeMap<String, Decimal>,
        today: NaiveDate,
    ) -> Result<BenchmarkComparison> {
        let total_market = self
            .directory
            .resolve(&self.benchmarks.total_market, today)
            .await?;
        let international = self
            .directory
            .resolve(&self.benchmarks.international, today)
            .await?;
        compare(breakdown, intl, &total_market, &international)
    }

    /// Totals for one month.
    pub async fn monthly_budget(
        &self,
        user: &UserId,
        year: i32,
        month: u32,
    ) -> std::result::Result<MonthlyBudget, Notice> {
        let result = async {
            let period = YearMonth::new(year, month)?;
            let income = self.store.portfolio(user).await?.monthly_income;
            let items = self.store.budget_items(user, Some(period)).await?;
            Ok::<_, FinanceError>(MonthlyBudget::new(period, income, items))
        }
        .await;
        result.map_err(|e| report(e.to_string()))
    }

    /// Every month of `year` (the current year when absent) with averages.
    pub async fn budget_view(&self, user: &UserId, year: Option<i32>) -> std::result::Result<BudgetView, Notice> {
        let current_year = self.today().year();
        let result = async {
            let income = self.store.portfolio(user).await?.monthly_income;
            let items = self.store.budget_items(user, None).await?;
            let year = budget_year(&items, income, year.unwrap_or(current_year), current_year);
            Ok::<_, FinanceError>(BudgetView { income, year })
        }
        .await;
        result.map_err(|e| report(format!("Unable to load budget: {e}")))
    }
}

fn report(message: String) -> Notice {
    error!("{}", message);
    Notice::error(message)
}
