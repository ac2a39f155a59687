//! Mapping between transactions and the documents that hold them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;

use crate::{
    identity::UserId,
    store::{CollectionPath, Direction, Document, Fields, Query, QuerySnapshot, StoreError},
};

use super::core::{Transaction, TransactionDraft, TransactionType};

const TRANSACTIONS_COLLECTION: &str = "transactions";

/// The collection that holds the transactions of `user`.
pub fn transactions_collection(user: &UserId) -> CollectionPath {
    CollectionPath::for_user(user, TRANSACTIONS_COLLECTION)
}

/// All transactions of `user`, newest date first.
pub fn transactions_query(user: &UserId) -> Query {
    Query::collection(transactions_collection(user)).order_by("date", Direction::Descending)
}

/// The stored shape of a transaction. Dates are ISO `YYYY-MM-DD` strings so
/// that ordering by the field orders by date.
#[derive(Debug, Serialize, Deserialize)]
struct TransactionFields {
    #[serde(rename = "type")]
    type_: TransactionType,
    amount: f64,
    category: String,
    #[serde(with = "iso_date")]
    date: Date,
    #[serde(default)]
    note: Option<String>,
}

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

impl TransactionDraft {
    pub fn to_fields(&self) -> Fields {
        let fields = TransactionFields {
            type_: self.type_,
            amount: self.amount,
            category: self.category.clone(),
            date: self.date,
            note: Some(self.note.clone()),
        };

        match serde_json::to_value(fields) {
            Ok(Value::Object(fields)) => fields,
            // A struct of plain fields always serializes to an object.
            _ => Fields::new(),
        }
    }
}

impl TryFrom<&Document> for Transaction {
    type Error = StoreError;

    fn try_from(document: &Document) -> Result<Self, Self::Error> {
        let fields: TransactionFields =
            serde_json::from_value(Value::Object(document.fields.clone())).map_err(|error| {
                StoreError::InvalidDocument {
                    id: document.id.clone(),
                    reason: error.to_string(),
                }
            })?;

        Ok(Transaction {
            id: document.id.clone(),
            type_: fields.type_,
            amount: fields.amount,
            category: fields.category,
            date: fields.date,
            note: fields.note.unwrap_or_default(),
            created_at: document.created_at,
            updated_at: document.updated_at,
        })
    }
}

/// Map every document of a snapshot, keeping the snapshot's order.
///
/// # Errors
/// Returns [StoreError::InvalidDocument] for the first document that is not a transaction.
pub fn transactions_from_snapshot(snapshot: &QuerySnapshot) -> Result<Vec<Transaction>, StoreError> {
    snapshot.iter().map(Transaction::try_from).collect()
}
