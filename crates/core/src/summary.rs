use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::category::OTHER_CATEGORY;
use crate::money::Money;
use crate::period::TimeFrame;
use crate::transaction::Transaction;

/// Headline figures for the dashboard. Only expenses (positive amounts)
/// count; credits and payments are left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_spending: Money,
    pub transaction_count: usize,
    pub average_transaction: Money,
    pub largest: Option<Transaction>,
}

impl Summary {
    pub fn compute(transactions: &[Transaction]) -> Self {
        let expenses: Vec<&Transaction> = transactions.iter().filter(|t| t.is_expense()).collect();
        let total_spending: Money = expenses.iter().map(|t| t.amount).sum();
        let transaction_count = expenses.len();
        let average_transaction = if transaction_count == 0 {
            Money::zero()
        } else {
            Money::from_decimal(total_spending.as_decimal() / Decimal::from(transaction_count))
        };
        let largest = expenses
            .iter()
            .max_by_key(|t| t.amount)
            .map(|t| (*t).clone());

        Summary {
            total_spending,
            transaction_count,
            average_transaction,
            largest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Money,
    pub count: usize,
}

/// Totals per category label, largest first. Ties keep first-seen order.
pub fn category_breakdown(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for tx in transactions {
        let category = if tx.category.trim().is_empty() {
            OTHER_CATEGORY
        } else {
            tx.category.as_str()
        };
        match index.get(category) {
            Some(&i) => {
                totals[i].amount = totals[i].amount + tx.amount;
                totals[i].count += 1;
            }
            None => {
                index.insert(category, totals.len());
                totals.push(CategoryTotal {
                    category: category.to_string(),
                    amount: tx.amount,
                    count: 1,
                });
            }
        }
    }

    totals.sort_by(|a, b| b.amount.cmp(&a.amount));
    totals
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantPoint {
    pub date: NaiveDate,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantSeries {
    pub name: String,
    pub total_spent: Money,
    pub points: Vec<MerchantPoint>,
}

pub const DEFAULT_MERCHANT_LIMIT: usize = 10;

/// Groups transactions by trimmed description. Merchants are ordered by
/// total spent (descending), each merchant's points by date. `search`
/// filters merchant names case-insensitively.
pub fn merchant_timeline(
    transactions: &[Transaction],
    search: Option<&str>,
    limit: usize,
) -> Vec<MerchantSeries> {
    let mut merchants: Vec<MerchantSeries> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for tx in transactions {
        let name = tx.description.trim();
        let i = *index.entry(name.to_string()).or_insert_with(|| {
            merchants.push(MerchantSeries {
                name: name.to_string(),
                total_spent: Money::zero(),
                points: Vec::new(),
            });
            merchants.len() - 1
        });
        let merchant = &mut merchants[i];
        merchant.total_spent = merchant.total_spent + tx.amount;
        merchant.points.push(MerchantPoint {
            date: tx.date,
            amount: tx.amount,
        });
    }

    for merchant in &mut merchants {
        merchant.points.sort_by_key(|p| p.date);
    }
    merchants.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));

    let term = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    merchants
        .into_iter()
        .filter(|m| match &term {
            Some(term) => m.name.to_lowercase().contains(term.as_str()),
            None => true,
        })
        .take(limit)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

pub const DEFAULT_FREQUENCY_DAYS: u32 = 15;

/// Number of transactions on each of the `days` days ending at `today`,
/// oldest first. Days without transactions are reported as zero.
pub fn daily_frequency(transactions: &[Transaction], today: NaiveDate, days: u32) -> Vec<DailyCount> {
    trailing_days(today, days)
        .map(|date| DailyCount {
            date,
            count: transactions.iter().filter(|t| t.date == date).count(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: Money,
}

/// Sum of amounts per day over the time frame ending at `today`.
pub fn spending_trend(transactions: &[Transaction], today: NaiveDate, frame: TimeFrame) -> Vec<DailyTotal> {
    trailing_days(today, frame.days())
        .map(|date| DailyTotal {
            date,
            total: transactions
                .iter()
                .filter(|t| t.date == date)
                .map(|t| t.amount)
                .sum(),
        })
        .collect()
}

fn trailing_days(today: NaiveDate, days: u32) -> impl Iterator<Item = NaiveDate> {
    (0..days)
        .rev()
        .filter_map(move |back| today.checked_sub_days(Days::new(u64::from(back))))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    /// Absolute percentage change.
    pub value: f64,
    pub is_positive: bool,
}

/// Percentage change from `previous` to `current`; zero when there is no
/// previous value to compare against.
pub fn calculate_trend(current: Money, previous: Money) -> Trend {
    if previous.is_zero() {
        return Trend {
            value: 0.0,
            is_positive: false,
        };
    }
    let change = (current.as_decimal() - previous.as_decimal()) / previous.as_decimal()
        * Decimal::from(100);
    Trend {
        value: change.abs().to_f64().unwrap_or_default(),
        is_positive: change >= Decimal::ZERO,
    }
}
