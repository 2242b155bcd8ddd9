//! Budget ledger records and the expense form.

use crate::core::error::{FinanceError, Result};
use crate::core::holding::UserId;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

const MAX_ITEM_LEN: usize = 100;
const MAX_SUBCATEGORY_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Category {
    Need,
    Want,
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Need => f.write_str("Need"),
            Category::Want => f.write_str("Want"),
        }
    }
}

impl FromStr for Category {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "need" | "needs" => Ok(Category::Need),
            "want" | "wants" => Ok(Category::Want),
            _ => Err(FinanceError::validation(format!(
                "Category must be Need or Want, got '{}'",
                s.trim()
            ))),
        }
    }
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(FinanceError::validation(format!(
                "Month must be between 1 and 12, got {month}"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .ok_or_else(|| FinanceError::validation(format!("Invalid date {self}")))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        YearMonth::of(date) == *self
    }

    /// Full month name, e.g. "March".
    pub fn month_name(&self) -> &'static str {
        match self.month {
            1 => "January",
            2 => "February",
            3 => "March",
            4 => "April",
            5 => "May",
            6 => "June",
            7 => "July",
            8 => "August",
            9 => "September",
            10 => "October",
            11 => "November",
            12 => "December",
            _ => "",
        }
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A logged expense. Never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetItem {
    pub id: Uuid,
    pub user: UserId,
    pub date: NaiveDate,
    pub item: String,
    pub category: Category,
    pub subcategory: String,
    pub amount: Decimal,
}

impl BudgetItem {
    pub fn period(&self) -> YearMonth {
        YearMonth::of(self.date)
    }

    pub fn owned_by(&self, user: &UserId) -> bool {
        &self.user == user
    }
}

/// Raw input for logging an expense.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetForm {
    pub item: String,
    pub category: String,
    pub subcategory: String,
    pub amount: Decimal,
    pub month: u32,
}

impl BudgetForm {
    /// Validates the form into an item dated the 1st of `month` in `year`.
    pub fn validate(&self, user: &UserId, year: i32) -> Result<BudgetItem> {
        let item = required_text("Item", &self.item, MAX_ITEM_LEN)?;
        let subcategory = required_text("Subcategory", &self.subcategory, MAX_SUBCATEGORY_LEN)?;
        let category = self.category.parse::<Category>()?;
        if self.amount < Decimal::ZERO {
            return Err(FinanceError::validation("Amount must not be negative"));
        }
        let date = YearMonth::new(year, self.month)?.first_day()?;

        Ok(BudgetItem {
            id: Uuid::new_v4(),
            user: user.clone(),
            date,
            item: title_case(&item),
            category,
            subcategory: title_case(&subcategory),
            amount: self.amount.round_dp(2),
        })
    }
}

fn required_text(field: &str, raw: &str, max_len: usize) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(FinanceError::validation(format!("{field} is required")));
    }
    if value.chars().count() > max_len {
        return Err(FinanceError::validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(value.to_string())
}

/// Upper-cases the first letter of every word and lower-cases the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }
    out
}
