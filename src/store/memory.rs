use super::Store;
use crate::core::budget::{BudgetItem, YearMonth};
use crate::core::error::Result;
use crate::core::fund::Fund;
use crate::core::holding::{Holding, Portfolio, UserId};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    portfolios: HashMap<UserId, Portfolio>,
    funds: HashMap<String, Fund>,
    holdings: HashMap<Uuid, Holding>,
    budget: HashMap<Uuid, BudgetItem>,
}

/// In-memory store. Everything is lost when the process exits.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn portfolio(&self, user: &UserId) -> Result<Portfolio> {
        let mut tables = self.inner.lock().await;
        let portfolio = tables
            .portfolios
            .entry(user.clone())
            .or_insert_with(|| Portfolio::new(user));
        Ok(portfolio.clone())
    }

    async fn set_monthly_income(&self, user: &UserId, income: Decimal) -> Result<Portfolio> {
        let mut tables = self.inner.lock().await;
        let portfolio = tables
            .portfolios
            .entry(user.clone())
            .or_insert_with(|| Portfolio::new(user));
        portfolio.monthly_income = income;
        Ok(portfolio.clone())
    }

    async fn fund(&self, symbol: &str) -> Result<Option<Fund>> {
        let tables = self.inner.lock().await;
        Ok(tables.funds.get(symbol).cloned())
    }

    async fn put_fund(&self, fund: &Fund) -> Result<()> {
        let mut tables = self.inner.lock().await;
        debug!("Memory PUT fund {}", fund.symbol);
        tables.funds.insert(fund.symbol.clone(), fund.clone());
        Ok(())
    }

    async fn holdings(&self, user: &UserId) -> Result<Vec<Holding>> {
        let tables = self.inner.lock().await;
        let mut holdings: Vec<Holding> = tables
            .holdings
            .values()
            .filter(|h| h.owned_by(user))
            .cloned()
            .collect();
        holdings.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(holdings)
    }

    async fn holding(&self, id: Uuid) -> Result<Option<Holding>> {
        let tables = self.inner.lock().await;
        Ok(tables.holdings.get(&id).cloned())
    }

    async fn add_shares(&self, user: &UserId, symbol: &str, shares: Decimal) -> Result<Holding> {
        let mut tables = self.inner.lock().await;
        let mut holding = tables
            .holdings
            .values()
            .find(|h| h.owned_by(user) && h.symbol == symbol)
            .cloned()
            .unwrap_or_else(|| Holding::new(user, symbol));
        holding.shares += shares;
        tables.holdings.insert(holding.id, holding.clone());
        Ok(holding)
    }

    async fn set_nav_override(&self, id: Uuid, nav: Option<Decimal>) -> Result<Option<Holding>> {
        let mut tables = self.inner.lock().await;
        Ok(tables.holdings.get_mut(&id).map(|holding| {
            holding.nav_override = nav;
            holding.clone()
        }))
    }

    async fn remove_holding(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.inner.lock().await;
        Ok(tables.holdings.remove(&id).is_some())
    }

    async fn budget_items(&self, user: &UserId, period: Option<YearMonth>) -> Result<Vec<BudgetItem>> {
        let tables = self.inner.lock().await;
        let mut items: Vec<BudgetItem> = tables
            .budget
            .values()
            .filter(|item| item.owned_by(user))
            .filter(|item| period.is_none_or(|p| p.contains(item.date)))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.item.cmp(&b.item)));
        Ok(items)
    }

    async fn budget_item(&self, id: Uuid) -> Result<Option<BudgetItem>> {
        let tables = self.inner.lock().await;
        Ok(tables.budget.get(&id).cloned())
    }

    async fn insert_budget_item(&self, item: &BudgetItem) -> Result<()> {
        let mut tables = self.inner.lock().await;
        tables.budget.insert(item.id, item.clone());
        Ok(())
    }

    async fn remove_budget_item(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.inner.lock().await;
        Ok(tables.budget.remove(&id).is_some())
    }
}
