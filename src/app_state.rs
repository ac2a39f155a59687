//! Implements a struct that holds the state of the server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};

use crate::{
    Error,
    db::initialize,
    identity::{IdentityProvider, SqliteIdentityProvider},
    session::SessionRegistry,
    store::{DocumentStore, SqliteDocumentStore},
};

/// The state of the server.
#[derive(Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The local timezone as a canonical timezone name, e.g. "Europe/Amsterdam".
    pub local_timezone: String,

    /// Signs users in and tells each client who it is signed in as.
    pub identity: Arc<dyn IdentityProvider>,

    /// Holds the transactions of every user.
    pub store: Arc<dyn DocumentStore>,

    /// The session of every client that has visited since start-up.
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    /// Create a new [AppState] backed by a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// accounts, client sessions and documents. `local_timezone` should be a
    /// valid, canonical timezone name, e.g. "Europe/Amsterdam".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        local_timezone: &str,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(SqliteIdentityProvider::new(connection.clone()));
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(connection));

        Ok(Self::with_services(
            cookie_secret,
            local_timezone,
            identity,
            store,
        ))
    }

    /// Create a new [AppState] on top of existing services.
    pub fn with_services(
        cookie_secret: &str,
        local_timezone: &str,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new(
            identity.clone(),
            store.clone(),
            local_timezone,
        ));

        Self {
            cookie_key: create_cookie_key(cookie_secret),
            local_timezone: local_timezone.to_owned(),
            identity,
            store,
            sessions,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
