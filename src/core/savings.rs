//! Monthly budget totals and averages across months.

use crate::core::budget::{BudgetItem, Category, YearMonth};
use crate::core::money::round2;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// The items of one month measured against the monthly income.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBudget {
    pub period: YearMonth,
    pub income: Decimal,
    pub items: Vec<BudgetItem>,
}

impl MonthlyBudget {
    /// Keeps only the items dated within `period`.
    pub fn new(period: YearMonth, income: Decimal, items: impl IntoIterator<Item = BudgetItem>) -> Self {
        Self {
            period,
            income,
            items: items
                .into_iter()
                .filter(|item| period.contains(item.date))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_spent(&self) -> Decimal {
        self.items.iter().map(|item| item.amount).sum()
    }

    pub fn total_for(&self, category: Category) -> Decimal {
        self.items
            .iter()
            .filter(|item| item.category == category)
            .map(|item| item.amount)
            .sum()
    }

    pub fn total_needs(&self) -> Decimal {
        self.total_for(Category::Need)
    }

    pub fn total_wants(&self) -> Decimal {
        self.total_for(Category::Want)
    }

    pub fn savings(&self) -> Decimal {
        self.income - self.total_spent()
    }

    pub fn summary(&self) -> MonthSummary {
        MonthSummary {
            period: self.period,
            month_name: self.period.month_name().to_string(),
            total_spent: round2(self.total_spent()),
            total_needs: round2(self.total_needs()),
            total_wants: round2(self.total_wants()),
            savings: round2(self.savings()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub period: YearMonth,
    pub month_name: String,
    pub total_spent: Decimal,
    pub total_needs: Decimal,
    pub total_wants: Decimal,
    pub savings: Decimal,
}

/// Means over the months that recorded at least one item.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BudgetAverages {
    pub months: usize,
    pub total_spent: Decimal,
    pub total_needs: Decimal,
    pub total_wants: Decimal,
    pub savings: Decimal,
}

pub fn averages<'a>(months: impl IntoIterator<Item = &'a MonthlyBudget>) -> BudgetAverages {
    let recorded: Vec<&MonthlyBudget> = months.into_iter().filter(|m| !m.is_empty()).collect();
    if recorded.is_empty() {
        return BudgetAverages::default();
    }
    let count = Decimal::from(recorded.len());
    let mean = |f: fn(&MonthlyBudget) -> Decimal| {
        round2(recorded.iter().map(|m| f(m)).sum::<Decimal>() / count)
    };

    BudgetAverages {
        months: recorded.len(),
        total_spent: mean(MonthlyBudget::total_spent),
        total_needs: mean(MonthlyBudget::total_needs),
        total_wants: mean(MonthlyBudget::total_wants),
        savings: mean(MonthlyBudget::savings),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubcategoryAverage {
    pub subcategory: String,
    pub average: Decimal,
}

/// Average monthly spend per subcategory of `category`, over the months that
/// recorded at least one item. Sorted by subcategory.
pub fn subcategory_averages<'a>(
    months: impl IntoIterator<Item = &'a MonthlyBudget>,
    category: Category,
) -> Vec<SubcategoryAverage> {
    let recorded: Vec<&MonthlyBudget> = months.into_iter().filter(|m| !m.is_empty()).collect();
    if recorded.is_empty() {
        return Vec::new();
    }
    let count = Decimal::from(recorded.len());

    let mut totals: BTreeMap<&str, Decimal> = BTreeMap::new();
    for item in recorded
        .iter()
        .flat_map(|m| m.items.iter())
        .filter(|item| item.category == category)
    {
        *totals.entry(item.subcategory.as_str()).or_default() += item.amount;
    }

    totals
        .into_iter()
        .map(|(subcategory, total)| SubcategoryAverage {
            subcategory: subcategory.to_string(),
            average: round2(total / count),
        })
        .collect()
}

/// Everything the budget page shows for one year.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetYear {
    pub year: i32,
    pub months: Vec<MonthlyBudget>,
    pub averages: BudgetAverages,
    pub needs: Vec<SubcategoryAverage>,
    pub wants: Vec<SubcategoryAverage>,
    /// The current year plus every year with an item, newest first.
    pub available_years: Vec<i32>,
}

pub fn budget_year(items: &[BudgetItem], income: Decimal, year: i32, current_year: i32) -> BudgetYear {
    let periods: BTreeSet<YearMonth> = items
        .iter()
        .map(BudgetItem::period)
        .filter(|p| p.year == year)
        .collect();
    let months: Vec<MonthlyBudget> = periods
        .into_iter()
        .map(|period| MonthlyBudget::new(period, income, items.iter().cloned()))
        .collect();

    let mut years: BTreeSet<i32> = items.iter().map(|item| item.period().year).collect();
    years.insert(current_year);

    BudgetYear {
        year,
        averages: averages(&months),
        needs: subcategory_averages(&months, Category::Need),
        wants: subcategory_averages(&months, Category::Want),
        months,
        available_years: years.into_iter().rev().collect(),
    }
}
