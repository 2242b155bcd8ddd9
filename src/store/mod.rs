//! Persistence boundary for portfolios, funds, holdings and the budget ledger.

pub mod disk;
pub mod memory;

use crate::core::budget::{BudgetItem, YearMonth};
use crate::core::config::AppConfig;
use crate::core::error::Result;
use crate::core::fund::Fund;
use crate::core::holding::{Holding, Portfolio, UserId};
use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

pub use disk::DiskStore;
pub use memory::MemoryStore;

/// Record storage. Implementations must make `add_shares` atomic so that
/// concurrent purchases of the same fund never lose an update.
#[async_trait]
pub trait Store: Send + Sync {
    /// The user's portfolio, created with defaults on first access.
    async fn portfolio(&self, user: &UserId) -> Result<Portfolio>;
    async fn set_monthly_income(&self, user: &UserId, income: Decimal) -> Result<Portfolio>;

    async fn fund(&self, symbol: &str) -> Result<Option<Fund>>;
    async fn put_fund(&self, fund: &Fund) -> Result<()>;

    async fn holdings(&self, user: &UserId) -> Result<Vec<Holding>>;
    async fn holding(&self, id: Uuid) -> Result<Option<Holding>>;
    /// Adds `shares` to the (user, symbol) holding, creating it if needed.
    async fn add_shares(&self, user: &UserId, symbol: &str, shares: Decimal) -> Result<Holding>;
    /// Returns the updated holding, or `None` when the id is unknown.
    async fn set_nav_override(&self, id: Uuid, nav: Option<Decimal>) -> Result<Option<Holding>>;
    async fn remove_holding(&self, id: Uuid) -> Result<bool>;

    /// All of the user's items, or only those dated within `period`.
    async fn budget_items(&self, user: &UserId, period: Option<YearMonth>) -> Result<Vec<BudgetItem>>;
    async fn budget_item(&self, id: Uuid) -> Result<Option<BudgetItem>>;
    async fn insert_budget_item(&self, item: &BudgetItem) -> Result<()>;
    async fn remove_budget_item(&self, id: Uuid) -> Result<bool>;
}

/// Opens the on-disk store under the configured data directory.
pub fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    let path = config.default_data_path()?.join("store");
    let store = DiskStore::open(&path)
        .with_context(|| format!("Failed to open store at {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Key separator that cannot appear in user ids typed into a form.
pub(crate) const SEP: char = '\u{1f}';

pub(crate) fn holding_key(user: &UserId, symbol: &str) -> String {
    format!("{user}{SEP}{symbol}")
}

pub(crate) fn user_prefix(user: &UserId) -> String {
    format!("{user}{SEP}")
}

pub(crate) fn budget_prefix(user: &UserId, period: Option<YearMonth>) -> String {
    match period {
        Some(period) => format!("{user}{SEP}{period}{SEP}"),
        None => user_prefix(user),
    }
}

pub(crate) fn budget_key(item: &BudgetItem) -> String {
    format!("{}{}", budget_prefix(&item.user, Some(item.period())), item.id)
}
