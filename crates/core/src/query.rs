use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::period::DateRange;
use crate::transaction::Transaction;

pub const DEFAULT_PER_PAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "date_desc" => Ok(SortOrder::DateDesc),
            "date_asc" => Ok(SortOrder::DateAsc),
            "amount_desc" => Ok(SortOrder::AmountDesc),
            "amount_asc" => Ok(SortOrder::AmountAsc),
            other => Err(format!("Unknown sort order: '{other}'")),
        }
    }
}

/// Filter, sort and paging options for a transaction list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionQuery {
    pub range: Option<DateRange>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: SortOrder,
    /// 1-based; `None` returns every match on a single page.
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_count: usize,
}

impl TransactionQuery {
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(range) = self.range {
            if !range.contains(tx.date) {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref().filter(|c| *c != "all") {
            if tx.category != category {
                return false;
            }
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let term = term.to_lowercase();
            if !tx.description.to_lowercase().contains(&term)
                && !tx.category.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, transactions: &[Transaction]) -> Page<Transaction> {
        let mut matched: Vec<Transaction> = transactions
            .iter()
            .filter(|t| self.matches(t))
            .cloned()
            .collect();

        match self.sort {
            SortOrder::DateDesc => matched.sort_by(|a, b| b.date.cmp(&a.date)),
            SortOrder::DateAsc => matched.sort_by(|a, b| a.date.cmp(&b.date)),
            SortOrder::AmountDesc => matched.sort_by(|a, b| b.amount.cmp(&a.amount)),
            SortOrder::AmountAsc => matched.sort_by(|a, b| a.amount.cmp(&b.amount)),
        }

        let total = matched.len();
        let Some(page) = self.page else {
            return Page {
                items: matched,
                total,
                page: 1,
                page_count: 1,
            };
        };

        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE).max(1);
        let page_count = total.div_ceil(per_page).max(1);
        let page = page.clamp(1, page_count);
        let items = matched
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();

        Page {
            items,
            total,
            page,
            page_count,
        }
    }
}

/// Sorted, unique, non-empty category labels present in `transactions`.
pub fn categories_of(transactions: &[Transaction]) -> Vec<String> {
    transactions
        .iter()
        .map(|t| t.category.as_str())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
