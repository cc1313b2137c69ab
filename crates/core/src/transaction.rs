use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// One charge, credit or payment taken from a statement row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Primary key, only present once the remote store has inserted the row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
    pub category: String,
    /// Name of the file the transaction was imported from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Identity of a transaction in the local flow, which has no primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionKey {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
}

impl Transaction {
    pub fn new(date: NaiveDate, description: &str, amount: Money, category: &str) -> Self {
        Transaction {
            id: None,
            date,
            description: description.to_string(),
            amount,
            category: category.to_string(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    pub fn key(&self) -> TransactionKey {
        TransactionKey {
            date: self.date,
            description: self.description.clone(),
            amount: self.amount,
        }
    }

    pub fn is_expense(&self) -> bool {
        self.amount.is_expense()
    }
}
