//! Portfolios, holdings and the purchase form.

use crate::core::error::{FinanceError, Result};
use crate::core::fund::{Fund, normalize_symbol};
use crate::core::money::parse_decimal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

const MAX_SYMBOL_LEN: usize = 5;

/// Identity of an authenticated user, as supplied by the web layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One per user. Created on first access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub user: UserId,
    pub name: String,
    pub monthly_income: Decimal,
}

impl Portfolio {
    pub fn new(user: &UserId) -> Self {
        Self {
            user: user.clone(),
            name: format!("{user}'s Portfolio"),
            monthly_income: Decimal::ZERO,
        }
    }
}

/// A user's position in one fund. At most one per (user, symbol).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: Uuid,
    pub user: UserId,
    pub symbol: String,
    pub shares: Decimal,
    #[serde(default)]
    pub nav_override: Option<Decimal>,
}

impl Holding {
    pub fn new(user: &UserId, symbol: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.clone(),
            symbol: normalize_symbol(symbol),
            shares: Decimal::ZERO,
            nav_override: None,
        }
    }

    /// The manual override when one is set, otherwise the fund's NAV.
    pub fn effective_nav(&self, fund: &Fund) -> Option<Decimal> {
        self.nav_override.or(fund.nav)
    }

    pub fn owned_by(&self, user: &UserId) -> bool {
        &self.user == user
    }
}

/// How much of a fund is being bought.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Purchase {
    Shares(Decimal),
    Dollars(Decimal),
}

impl Purchase {
    /// Shares this purchase adds at the given NAV.
    pub fn shares_at(&self, symbol: &str, nav: Option<Decimal>) -> Result<Decimal> {
        match self {
            Purchase::Shares(shares) => Ok(*shares),
            Purchase::Dollars(dollars) => match nav {
                Some(nav) if nav > Decimal::ZERO => {
                    let shares = (*dollars / nav).round_dp(4);
                    if shares.is_zero() {
                        return Err(FinanceError::validation(format!(
                            "${dollars} buys less than 0.0001 shares of {symbol} at NAV {nav}"
                        )));
                    }
                    Ok(shares)
                }
                _ => Err(FinanceError::lookup(format!(
                    "No NAV available for {symbol}; enter a share count instead"
                ))),
            },
        }
    }
}

/// A validated purchase request.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingOrder {
    pub symbol: String,
    pub purchase: Purchase,
}

/// Raw input for adding to a holding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HoldingForm {
    pub symbol: String,
    #[serde(default)]
    pub dollars_invested: Option<Decimal>,
    #[serde(default)]
    pub shares: Option<Decimal>,
}

impl HoldingForm {
    pub fn validate(&self) -> Result<HoldingOrder> {
        let symbol = normalize_symbol(&self.symbol);
        if symbol.is_empty() || symbol.chars().count() > MAX_SYMBOL_LEN {
            return Err(FinanceError::validation(format!(
                "Symbol must be between 1 and {MAX_SYMBOL_LEN} characters"
            )));
        }

        let purchase = match (self.dollars_invested, self.shares) {
            (Some(dollars), None) => Purchase::Dollars(dollars.round_dp(2)),
            (None, Some(shares)) => Purchase::Shares(shares.round_dp(4)),
            _ => {
                return Err(FinanceError::validation(
                    "Exactly one of 'Dollars Invested' or 'Shares' must be provided, but not both.",
                ));
            }
        };
        let amount = match purchase {
            Purchase::Dollars(d) | Purchase::Shares(d) => d,
        };
        if amount <= Decimal::ZERO {
            return Err(FinanceError::validation("Purchase amount must be positive"));
        }

        Ok(HoldingOrder { symbol, purchase })
    }
}

/// Parses the manual NAV override field. Blank input clears the override.
pub fn parse_nav_override(raw: &str) -> Result<Option<Decimal>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let nav = parse_decimal("NAV", raw).map_err(FinanceError::Validation)?;
    if nav <= Decimal::ZERO {
        return Err(FinanceError::validation("NAV must be positive"));
    }
    Ok(Some(nav.round_dp(4)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::dec;

    fn form(symbol: &str, dollars: Option<Decimal>, shares: Option<Decimal>) -> HoldingForm {
        HoldingForm {
            symbol: symbol.to_string(),
            dollars_invested: dollars,
            shares,
        }
    }

    #[test]
    fn test_exactly_one_amount_is_required() {
        let both = form("VTI", Some(dec!(100)), Some(dec!(1))).validate();
        assert!(matches!(both, Err(FinanceError::Validation(_))));

        let neither = form("VTI", None, None).validate();
        assert!(matches!(neither, Err(FinanceError::Validation(_))));

        let order = form(" vti ", None, Some(dec!(2.5))).validate().unwrap();
        assert_eq!(order.symbol, "VTI");
        assert_eq!(order.purchase, Purchase::Shares(dec!(2.5)));
    }

    #[test]
    fn test_symbol_length_limits() {
        assert!(form("", None, Some(dec!(1))).validate().is_err());
        assert!(form("TOOLONG", None, Some(dec!(1))).validate().is_err());
        assert!(form("VTSAX", None, Some(dec!(1))).validate().is_ok());
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let err = form("VTI", Some(dec!(-5)), None).validate().unwrap_err();
        assert_eq!(err.to_string(), "Purchase amount must be positive");
        assert!(form("VTI", None, Some(Decimal::ZERO)).validate().is_err());
    }

    #[test]
    fn test_dollar_purchase_converts_at_nav() {
        let shares = Purchase::Dollars(dec!(1000)).shares_at("VTI", Some(dec!(250))).unwrap();
        assert_eq!(shares, dec!(4));

        let err = Purchase::Dollars(dec!(1000)).shares_at("VTI", None).unwrap_err();
        assert!(matches!(err, FinanceError::Lookup(_)));

        let err = Purchase::Dollars(dec!(0.01)).shares_at("VTI", Some(dec!(500))).unwrap_err();
        assert!(matches!(err, FinanceError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "$0.01 buys less than 0.0001 shares of VTI at NAV 500"
        );

        // Share purchases do not need a NAV
        assert_eq!(
            Purchase::Shares(dec!(3)).shares_at("VTI", None).unwrap(),
            dec!(3)
        );
    }

    #[test]
    fn test_effective_nav_prefers_override() {
        let user = UserId::new("alice");
        let mut fund = Fund::new("VTI", NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        fund.nav = Some(dec!(250));
        let mut holding = Holding::new(&user, "vti");
        assert_eq!(holding.effective_nav(&fund), Some(dec!(250)));
        holding.nav_override = Some(dec!(260));
        assert_eq!(holding.effective_nav(&fund), Some(dec!(260)));
        assert!(holding.owned_by(&user));
        assert!(!holding.owned_by(&UserId::new("bob")));
    }

    #[test]
    fn test_nav_override_parsing() {
        assert_eq!(parse_nav_override("  ").unwrap(), None);
        assert_eq!(parse_nav_override("12.34567").unwrap(), Some(dec!(12.3457)));
        assert!(parse_nav_override("0").is_err());
        assert!(parse_nav_override("twelve").is_err());
    }

    #[test]
    fn test_portfolio_default_name() {
        let portfolio = Portfolio::new(&UserId::new("alice"));
        assert_eq!(portfolio.name, "alice's Portfolio");
        assert_eq!(portfolio.monthly_income, Decimal::ZERO);
    }
}
