//! The transaction model: what a signed-in user records.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::store::DocumentId;

/// Transactions are addressed by the id the document store gave them.
pub type TransactionId = DocumentId;

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    /// The label shown in the type chip and the type select.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Income => "Inkomst",
            TransactionType::Expense => "Uitgave",
        }
    }
}

impl FromStr for TransactionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            _ => Err(()),
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which transactions the table shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypeFilter {
    #[default]
    All,
    Only(TransactionType),
}

impl TypeFilter {
    /// Parse the value of the filter select. Anything unknown shows everything.
    pub fn parse(value: &str) -> Self {
        value
            .parse::<TransactionType>()
            .map(TypeFilter::Only)
            .unwrap_or(TypeFilter::All)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeFilter::All => "all",
            TypeFilter::Only(type_) => type_.as_str(),
        }
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Only(type_) => transaction.type_ == *type_,
        }
    }
}

/// A validated transaction that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub type_: TransactionType,
    /// Always greater than zero.
    pub amount: f64,
    /// Trimmed and never empty.
    pub category: String,
    pub date: Date,
    pub note: String,
}

/// A stored transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,
    pub type_: TransactionType,
    pub amount: f64,
    pub category: String,
    pub date: Date,
    pub note: String,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}
