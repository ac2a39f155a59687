use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_extra::extract::{PrivateCookieJar, cookie::Cookie};
use rusqlite::Connection;
use time::Date;
use tokio::sync::watch;

use crate::{
    AppState,
    db::initialize,
    identity::{COOKIE_CLIENT_ID, ClientId, IdentityProvider, SqliteIdentityProvider},
    store::{
        CollectionPath, DocumentId, DocumentStore, Fields, Query, QuerySnapshot, SnapshotEvent,
        SnapshotReceiver, SqliteDocumentStore, StoreError,
    },
    transaction::{Transaction, TransactionType},
};

pub(crate) const TEST_EMAIL: &str = "test@example.com";
pub(crate) const TEST_PASSWORD: &str = "roostersgocockledoodledoo";

/// bcrypt's minimum cost, so tests do not spend their time hashing.
pub(crate) const TEST_PASSWORD_COST: u32 = 4;

pub(crate) fn get_test_connection() -> Arc<Mutex<Connection>> {
    let connection = Connection::open_in_memory().unwrap();
    initialize(&connection).unwrap();

    Arc::new(Mutex::new(connection))
}

pub(crate) fn get_test_identity() -> Arc<dyn IdentityProvider> {
    Arc::new(SqliteIdentityProvider::with_password_cost(
        get_test_connection(),
        TEST_PASSWORD_COST,
    ))
}

pub(crate) fn get_test_store() -> Arc<dyn DocumentStore> {
    Arc::new(SqliteDocumentStore::new(get_test_connection()))
}

pub(crate) const TEST_TIMEZONE: &str = "Europe/Amsterdam";

pub(crate) fn get_test_app_state() -> AppState {
    AppState::with_services(
        "nobodywillguessthis",
        TEST_TIMEZONE,
        get_test_identity(),
        get_test_store(),
    )
}

/// A cookie jar for a client that has no session yet.
pub(crate) fn new_client_jar(state: &AppState) -> PrivateCookieJar {
    PrivateCookieJar::new(state.cookie_key.clone())
}

/// Register the test account for a new client and return that client's cookie jar.
pub(crate) async fn signed_in_jar(state: &AppState) -> PrivateCookieJar {
    let client = ClientId::generate();
    state
        .identity
        .register(&client, TEST_EMAIL, TEST_PASSWORD)
        .await
        .unwrap();

    new_client_jar(state).add(Cookie::new(COOKIE_CLIENT_ID, client.as_str().to_owned()))
}

pub(crate) fn create_test_transaction(
    id: &str,
    type_: TransactionType,
    amount: f64,
    category: &str,
    date: Date,
) -> Transaction {
    Transaction {
        id: DocumentId::new(id),
        type_,
        amount,
        category: category.to_owned(),
        date,
        note: String::new(),
        created_at: None,
        updated_at: None,
    }
}

/// The calls a [RecordingStore] has seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct StoreCalls {
    pub listen: usize,
    pub get: usize,
    pub add: usize,
    pub update: Vec<DocumentId>,
    pub delete: Vec<DocumentId>,
}

/// A SQLite store that records every call and can be told to fail.
pub(crate) struct RecordingStore {
    inner: SqliteDocumentStore,
    calls: Mutex<StoreCalls>,
    write_error: Mutex<Option<StoreError>>,
    streams: Mutex<Vec<Arc<watch::Sender<SnapshotEvent>>>>,
}

impl RecordingStore {
    pub(crate) fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            inner: SqliteDocumentStore::new(connection),
            calls: Mutex::new(StoreCalls::default()),
            write_error: Mutex::new(None),
            streams: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> StoreCalls {
        self.calls.lock().unwrap().clone()
    }

    /// Make every following write fail with `error`.
    pub(crate) fn fail_writes_with(&self, error: StoreError) {
        *self.write_error.lock().unwrap() = Some(error);
    }

    /// Push `error` to every live query.
    pub(crate) fn fail_streams_with(&self, error: StoreError) {
        for stream in self.streams.lock().unwrap().iter() {
            stream.send_replace(Err(error.clone()));
        }
    }

    fn write_error(&self) -> Result<(), StoreError> {
        match self.write_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    fn listen(&self, query: Query) -> SnapshotReceiver {
        self.calls.lock().unwrap().listen += 1;

        let mut inner = self.inner.listen(query);
        let (sender, receiver) = watch::channel(inner.borrow_and_update().clone());
        let sender = Arc::new(sender);
        self.streams.lock().unwrap().push(sender.clone());

        tokio::spawn(async move {
            while inner.changed().await.is_ok() {
                let event = inner.borrow_and_update().clone();
                if sender.send(event).is_err() {
                    break;
                }
            }
        });

        receiver
    }

    async fn get_documents(&self, query: &Query) -> Result<QuerySnapshot, StoreError> {
        self.calls.lock().unwrap().get += 1;
        self.inner.get_documents(query).await
    }

    async fn add_document(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<DocumentId, StoreError> {
        self.calls.lock().unwrap().add += 1;
        self.write_error()?;
        self.inner.add_document(collection, fields).await
    }

    async fn update_document(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.calls.lock().unwrap().update.push(id.clone());
        self.write_error()?;
        self.inner.update_document(collection, id, fields).await
    }

    async fn delete_document(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
    ) -> Result<(), StoreError> {
        self.calls.lock().unwrap().delete.push(id.clone());
        self.write_error()?;
        self.inner.delete_document(collection, id).await
    }
}
