//! A [DocumentStore] that keeps documents as JSON text in SQLite.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use rusqlite::{Connection, params};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::watch;

use super::{
    CollectionPath, Direction, Document, DocumentId, DocumentStore, Fields, Query, QuerySnapshot,
    SnapshotEvent, SnapshotReceiver, StoreError,
};

pub fn create_document_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS document (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        )",
        (),
    )?;

    Ok(())
}

/// Documents in SQLite plus the live queries that watch them.
#[derive(Debug)]
pub struct SqliteDocumentStore {
    connection: Arc<Mutex<Connection>>,
    /// Lock order: `listeners` before `connection`.
    listeners: Mutex<HashMap<Query, watch::Sender<SnapshotEvent>>>,
}

impl SqliteDocumentStore {
    /// Create a store on a connection that has been through [crate::initialize_db].
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            connection,
            listeners: Mutex::new(HashMap::new()),
        }
    }

    fn lock_connection(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire the database lock: {error}");
            StoreError::Unavailable("de database is vergrendeld".to_owned())
        })
    }

    fn run_query(&self, query: &Query) -> SnapshotEvent {
        let connection = self.lock_connection()?;
        let documents = select_documents(&connection, query)?;

        Ok(Arc::new(documents))
    }

    /// Re-run every live query on `collection` and push the new result sets.
    fn notify(&self, collection: &CollectionPath) {
        let mut listeners = match self.listeners.lock() {
            Ok(listeners) => listeners,
            Err(error) => {
                tracing::error!("could not acquire the listener lock: {error}");
                return;
            }
        };

        listeners.retain(|_, sender| sender.receiver_count() > 0);

        for (query, sender) in listeners.iter() {
            if &query.collection == collection {
                let event = self.run_query(query);

                if let Err(error) = &event {
                    tracing::warn!("live query on {collection} failed: {error}");
                }

                sender.send_replace(event);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn listen(&self, query: Query) -> SnapshotReceiver {
        let mut listeners = match self.listeners.lock() {
            Ok(listeners) => listeners,
            Err(error) => {
                tracing::error!("could not acquire the listener lock: {error}");
                let (_, receiver) = watch::channel(Err(StoreError::StreamClosed));
                return receiver;
            }
        };

        listeners.retain(|_, sender| sender.receiver_count() > 0);

        if let Some(sender) = listeners.get(&query) {
            return sender.subscribe();
        }

        tracing::debug!("starting live query on {}", query.collection);
        let (sender, receiver) = watch::channel(self.run_query(&query));
        listeners.insert(query, sender);

        receiver
    }

    async fn get_documents(&self, query: &Query) -> Result<QuerySnapshot, StoreError> {
        self.run_query(query)
    }

    async fn add_document(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<DocumentId, StoreError> {
        let id = DocumentId::generate();
        let data = Value::Object(fields).to_string();
        let now = OffsetDateTime::now_utc();

        self.lock_connection()?.execute(
            "INSERT INTO document (collection, id, data, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)",
            params![collection.as_str(), id.as_str(), data, now],
        )?;

        self.notify(collection);

        Ok(id)
    }

    async fn update_document(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let data = Value::Object(fields).to_string();
        let now = OffsetDateTime::now_utc();

        let rows_affected = self.lock_connection()?.execute(
            "UPDATE document SET data = ?1, updated_at = ?2 WHERE collection = ?3 AND id = ?4",
            params![data, now, collection.as_str(), id.as_str()],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound(id.clone()));
        }

        self.notify(collection);

        Ok(())
    }

    async fn delete_document(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
    ) -> Result<(), StoreError> {
        let rows_affected = self.lock_connection()?.execute(
            "DELETE FROM document WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id.as_str()],
        )?;

        if rows_affected > 0 {
            self.notify(collection);
        }

        Ok(())
    }
}

fn select_documents(connection: &Connection, query: &Query) -> Result<Vec<Document>, StoreError> {
    let order_clause = match &query.order_by {
        Some(order_by) => {
            // The field name ends up in the SQL text, so only plain identifiers are allowed.
            if order_by.field.is_empty()
                || !order_by
                    .field
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(StoreError::InvalidField(order_by.field.clone()));
            }

            let direction = match order_by.direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };

            format!(
                "ORDER BY json_extract(data, '$.{}') {direction}, created_at {direction}, id",
                order_by.field
            )
        }
        None => "ORDER BY created_at, id".to_owned(),
    };

    let mut statement = connection.prepare(&format!(
        "SELECT id, data, created_at, updated_at FROM document WHERE collection = ?1 {order_clause}"
    ))?;

    let rows = statement.query_map([query.collection.as_str()], |row| {
        let id: String = row.get(0)?;
        let data: String = row.get(1)?;
        let created_at: Option<OffsetDateTime> = row.get(2)?;
        let updated_at: Option<OffsetDateTime> = row.get(3)?;

        Ok((id, data, created_at, updated_at))
    })?;

    rows.map(|row| {
        let (id, data, created_at, updated_at) = row?;
        let id = DocumentId::new(id);
        let fields = serde_json::from_str::<Fields>(&data).map_err(|error| {
            StoreError::InvalidDocument {
                id: id.clone(),
                reason: error.to_string(),
            }
        })?;

        Ok(Document {
            id,
            fields,
            created_at,
            updated_at,
        })
    })
    .collect()
}

#[cfg(test)]
mod sqlite_document_store_tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        db::initialize,
        identity::UserId,
        store::{CollectionPath, Direction, DocumentId, DocumentStore, Fields, Query, StoreError},
    };

    use super::SqliteDocumentStore;

    fn get_test_store() -> SqliteDocumentStore {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        SqliteDocumentStore::new(Arc::new(Mutex::new(connection)))
    }

    fn collection(uid: &str) -> CollectionPath {
        CollectionPath::for_user(&UserId::new(uid), "transactions")
    }

    fn fields_with_date(date: &str) -> Fields {
        json!({ "date": date, "amount": 1.0 })
            .as_object()
            .unwrap()
            .clone()
    }

    fn by_date_descending(collection: CollectionPath) -> Query {
        Query::collection(collection).order_by("date", Direction::Descending)
    }

    #[tokio::test]
    async fn get_documents_orders_by_field() {
        let store = get_test_store();
        let collection = collection("alice");
        for date in ["2024-02-01", "2024-03-15", "2024-01-20"] {
            store
                .add_document(&collection, fields_with_date(date))
                .await
                .unwrap();
        }

        let snapshot = store
            .get_documents(&by_date_descending(collection))
            .await
            .unwrap();

        let dates: Vec<_> = snapshot
            .iter()
            .map(|document| document.fields["date"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(dates, vec!["2024-03-15", "2024-02-01", "2024-01-20"]);
    }

    #[tokio::test]
    async fn add_document_sets_timestamps() {
        let store = get_test_store();
        let collection = collection("alice");

        let id = store
            .add_document(&collection, fields_with_date("2024-03-15"))
            .await
            .unwrap();

        let snapshot = store
            .get_documents(&Query::collection(collection))
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert!(snapshot[0].created_at.is_some());
        assert_eq!(snapshot[0].created_at, snapshot[0].updated_at);
    }

    #[tokio::test]
    async fn collections_are_separate_per_user() {
        let store = get_test_store();
        store
            .add_document(&collection("alice"), fields_with_date("2024-03-15"))
            .await
            .unwrap();

        let snapshot = store
            .get_documents(&Query::collection(collection("bob")))
            .await
            .unwrap();

        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn update_document_replaces_fields() {
        let store = get_test_store();
        let collection = collection("alice");
        let id = store
            .add_document(&collection, fields_with_date("2024-03-15"))
            .await
            .unwrap();

        store
            .update_document(&collection, &id, fields_with_date("2024-04-01"))
            .await
            .unwrap();

        let snapshot = store
            .get_documents(&Query::collection(collection))
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].fields["date"], "2024-04-01");
        assert!(snapshot[0].updated_at >= snapshot[0].created_at);
    }

    #[tokio::test]
    async fn update_missing_document_fails() {
        let store = get_test_store();
        let id = DocumentId::new("missing");

        let result = store
            .update_document(&collection("alice"), &id, fields_with_date("2024-04-01"))
            .await;

        assert_eq!(result, Err(StoreError::NotFound(id)));
    }

    #[tokio::test]
    async fn delete_document_removes_it() {
        let store = get_test_store();
        let collection = collection("alice");
        let id = store
            .add_document(&collection, fields_with_date("2024-03-15"))
            .await
            .unwrap();

        store.delete_document(&collection, &id).await.unwrap();

        let snapshot = store
            .get_documents(&Query::collection(collection))
            .await
            .unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_document_succeeds() {
        let store = get_test_store();

        let result = store
            .delete_document(&collection("alice"), &DocumentId::new("missing"))
            .await;

        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn rejects_unsafe_order_field() {
        let store = get_test_store();
        let query = Query::collection(collection("alice"))
            .order_by("date') --", Direction::Ascending);

        let result = store.get_documents(&query).await;

        assert_eq!(
            result,
            Err(StoreError::InvalidField("date') --".to_owned()))
        );
    }

    #[tokio::test]
    async fn listen_starts_with_current_snapshot() {
        let store = get_test_store();
        let collection = collection("alice");
        store
            .add_document(&collection, fields_with_date("2024-03-15"))
            .await
            .unwrap();

        let mut receiver = store.listen(by_date_descending(collection));

        let snapshot = receiver.borrow_and_update().clone().unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn listen_pushes_full_snapshot_after_each_write() {
        let store = get_test_store();
        let collection = collection("alice");
        let mut receiver = store.listen(by_date_descending(collection.clone()));
        assert!(receiver.borrow_and_update().as_ref().unwrap().is_empty());

        store
            .add_document(&collection, fields_with_date("2024-03-15"))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), receiver.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receiver.borrow_and_update().as_ref().unwrap().len(), 1);

        store
            .add_document(&collection, fields_with_date("2024-03-16"))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), receiver.changed())
            .await
            .unwrap()
            .unwrap();
        let snapshot = receiver.borrow_and_update().clone().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].fields["date"], "2024-03-16");
    }

    #[tokio::test]
    async fn writes_to_other_collections_do_not_push() {
        let store = get_test_store();
        let mut receiver = store.listen(by_date_descending(collection("alice")));
        receiver.borrow_and_update();

        store
            .add_document(&collection("bob"), fields_with_date("2024-03-15"))
            .await
            .unwrap();

        assert!(!receiver.has_changed().unwrap());
    }
}
