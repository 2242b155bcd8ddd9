use super::{Store, budget_key, budget_prefix, holding_key, user_prefix};
use crate::core::budget::{BudgetItem, YearMonth};
use crate::core::error::Result;
use crate::core::fund::Fund;
use crate::core::holding::{Holding, Portfolio, UserId};
use anyhow::Context;
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Store backed by a fjall keyspace with one partition per record kind.
///
/// Holdings are keyed by `user SEP symbol` and budget items by
/// `user SEP yyyy-mm SEP id`, so per-user and per-month reads are prefix
/// scans. Two index partitions map record ids back to those keys.
pub struct DiskStore {
    keyspace: Keyspace,
    portfolios: PartitionHandle,
    funds: PartitionHandle,
    holdings: PartitionHandle,
    holding_ids: PartitionHandle,
    budget: PartitionHandle,
    budget_ids: PartitionHandle,
    // Serialises read-modify-write cycles
    write_lock: Mutex<()>,
}

impl DiskStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(path)?;
        let keyspace = Config::new(path).open()?;
        let partition = |name: &str| {
            keyspace
                .open_partition(name, PartitionCreateOptions::default())
                .with_context(|| format!("Failed to open partition {name}"))
        };

        Ok(Self {
            portfolios: partition("portfolios")?,
            funds: partition("funds")?,
            holdings: partition("holdings")?,
            holding_ids: partition("holding_ids")?,
            budget: partition("budget")?,
            budget_ids: partition("budget_ids")?,
            keyspace,
            write_lock: Mutex::new(()),
        })
    }

    fn read<T: DeserializeOwned>(partition: &PartitionHandle, key: &str) -> anyhow::Result<Option<T>> {
        match partition.get(key)? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("Corrupt record at key {key:?}"))?,
            )),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(partition: &PartitionHandle, prefix: &str) -> anyhow::Result<Vec<T>> {
        partition
            .prefix(prefix)
            .map(|kv| -> anyhow::Result<T> {
                let (_, value) = kv?;
                Ok(serde_json::from_slice(&value)?)
            })
            .collect()
    }

    fn encode<T: Serialize>(value: &T) -> anyhow::Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn index_key(partition: &PartitionHandle, id: Uuid) -> anyhow::Result<Option<String>> {
        Ok(partition
            .get(id.to_string())?
            .map(|key| String::from_utf8_lossy(&key).into_owned()))
    }

    fn persist(&self) -> anyhow::Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist keyspace")
    }

    fn put_portfolio(&self, portfolio: &Portfolio) -> anyhow::Result<()> {
        self.portfolios
            .insert(portfolio.user.as_str(), Self::encode(portfolio)?)?;
        self.persist()
    }
}

#[async_trait]
impl Store for DiskStore {
    async fn portfolio(&self, user: &UserId) -> Result<Portfolio> {
        if let Some(portfolio) = Self::read(&self.portfolios, user.as_str())? {
            return Ok(portfolio);
        }
        let _guard = self.write_lock.lock().await;
        // Re-check under the lock in case another request created it first
        if let Some(portfolio) = Self::read(&self.portfolios, user.as_str())? {
            return Ok(portfolio);
        }
        let portfolio = Portfolio::new(user);
        self.put_portfolio(&portfolio)?;
        debug!("Created portfolio for {}", user);
        Ok(portfolio)
    }

    async fn set_monthly_income(&self, user: &UserId, income: Decimal) -> Result<Portfolio> {
        let _guard = self.write_lock.lock().await;
        let mut portfolio = Self::read(&self.portfolios, user.as_str())?
            .unwrap_or_else(|| Portfolio::new(user));
        portfolio.monthly_income = income;
        self.put_portfolio(&portfolio)?;
        Ok(portfolio)
    }

    async fn fund(&self, symbol: &str) -> Result<Option<Fund>> {
        Ok(Self::read(&self.funds, symbol)?)
    }

    async fn put_fund(&self, fund: &Fund) -> Result<()> {
        self.funds
            .insert(fund.symbol.as_str(), Self::encode(fund)?)
            .context("Failed to write fund")?;
        self.persist()?;
        debug!("Disk PUT fund {}", fund.symbol);
        Ok(())
    }

    async fn holdings(&self, user: &UserId) -> Result<Vec<Holding>> {
        Ok(Self::scan(&self.holdings, &user_prefix(user))?)
    }

    async fn holding(&self, id: Uuid) -> Result<Option<Holding>> {
        match Self::index_key(&self.holding_ids, id)? {
            Some(key) => Ok(Self::read(&self.holdings, &key)?),
            None => Ok(None),
        }
    }

    async fn add_shares(&self, user: &UserId, symbol: &str, shares: Decimal) -> Result<Holding> {
        let _guard = self.write_lock.lock().await;
        let key = holding_key(user, symbol);
        let mut holding: Holding =
            Self::read(&self.holdings, &key)?.unwrap_or_else(|| Holding::new(user, symbol));
        holding.shares += shares;

        let mut batch = self.keyspace.batch();
        batch.insert(&self.holdings, key.as_str(), Self::encode(&holding)?);
        batch.insert(&self.holding_ids, holding.id.to_string(), key.as_str());
        batch.commit().context("Failed to write holding")?;
        self.persist()?;
        Ok(holding)
    }

    async fn set_nav_override(&self, id: Uuid, nav: Option<Decimal>) -> Result<Option<Holding>> {
        let _guard = self.write_lock.lock().await;
        let Some(key) = Self::index_key(&self.holding_ids, id)? else {
            return Ok(None);
        };
        let Some(mut holding) = Self::read::<Holding>(&self.holdings, &key)? else {
            return Ok(None);
        };
        holding.nav_override = nav;
        self.holdings
            .insert(key.as_str(), Self::encode(&holding)?)
            .context("Failed to write holding")?;
        self.persist()?;
        Ok(Some(holding))
    }

    async fn remove_holding(&self, id: Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(key) = Self::index_key(&self.holding_ids, id)? else {
            return Ok(false);
        };
        let mut batch = self.keyspace.batch();
        batch.remove(&self.holdings, key.as_str());
        batch.remove(&self.holding_ids, id.to_string());
        batch.commit().context("Failed to remove holding")?;
        self.persist()?;
        Ok(true)
    }

    async fn budget_items(&self, user: &UserId, period: Option<YearMonth>) -> Result<Vec<BudgetItem>> {
        let mut items: Vec<BudgetItem> = Self::scan(&self.budget, &budget_prefix(user, period))?;
        items.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.item.cmp(&b.item)));
        Ok(items)
    }

    async fn budget_item(&self, id: Uuid) -> Result<Option<BudgetItem>> {
        match Self::index_key(&self.budget_ids, id)? {
            Some(key) => Ok(Self::read(&self.budget, &key)?),
            None => Ok(None),
        }
    }

    async fn insert_budget_item(&self, item: &BudgetItem) -> Result<()> {
        let key = budget_key(item);
        let mut batch = self.keyspace.batch();
        batch.insert(&self.budget, key.as_str(), Self::encode(item)?);
        batch.insert(&self.budget_ids, item.id.to_string(), key.as_str());
        batch.commit().context("Failed to write budget item")?;
        self.persist()?;
        Ok(())
    }

    async fn remove_budget_item(&self, id: Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(key) = Self::index_key(&self.budget_ids, id)? else {
            return Ok(false);
        };
        let mut batch = self.keyspace.batch();
        batch.remove(&self.budget, key.as_str());
        batch.remove(&self.budget_ids, id.to_string());
        batch.commit().context("Failed to remove budget item")?;
        self.persist()?;
        Ok(true)
    }
}
