//! An [IdentityProvider] with email/password accounts stored in SQLite.
//!
//! Which client is signed in as which account is stored too, so browsers stay
//! signed in when the server restarts.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use email_address::EmailAddress;
use rusqlite::{Connection, OptionalExtension, params};
use time::OffsetDateTime;
use tokio::sync::watch;

use crate::Error;

use super::{
    AuthState, ClientId, FederatedProvider, IdentityError, IdentityProvider, Subject, UserId,
    password::{PasswordHash, ValidatedPassword},
};

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            uid TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

pub fn create_client_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS client_session (
            client_id TEXT PRIMARY KEY,
            uid TEXT NOT NULL,
            FOREIGN KEY(uid) REFERENCES account(uid) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

#[derive(Debug)]
pub struct SqliteIdentityProvider {
    connection: Arc<Mutex<Connection>>,
    /// Lock order: `clients` before `connection`.
    clients: Mutex<HashMap<ClientId, watch::Sender<AuthState>>>,
    password_cost: u32,
}

impl SqliteIdentityProvider {
    /// Create a provider on a connection that has been through [crate::initialize_db].
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self::with_password_cost(connection, PasswordHash::DEFAULT_COST)
    }

    /// Create a provider that hashes passwords with bcrypt `cost`.
    pub fn with_password_cost(connection: Arc<Mutex<Connection>>, cost: u32) -> Self {
        Self {
            connection,
            clients: Mutex::new(HashMap::new()),
            password_cost: cost,
        }
    }

    fn lock_connection(&self) -> Result<MutexGuard<'_, Connection>, IdentityError> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire the database lock: {error}");
            IdentityError::Unavailable("de database is vergrendeld".to_owned())
        })
    }

    /// The state of `client` as stored in the database.
    fn stored_state(&self, client: &ClientId) -> AuthState {
        let subject = self.lock_connection().and_then(|connection| {
            connection
                .query_row(
                    "SELECT account.uid, account.email
                    FROM client_session
                    INNER JOIN account ON account.uid = client_session.uid
                    WHERE client_session.client_id = ?1",
                    [client.as_str()],
                    |row| {
                        Ok(Subject {
                            uid: UserId::new(row.get::<_, String>(0)?),
                            email: row.get(1)?,
                        })
                    },
                )
                .optional()
                .map_err(IdentityError::from)
        });

        match subject {
            Ok(Some(subject)) => AuthState::SignedIn(subject),
            Ok(None) => AuthState::SignedOut,
            Err(error) => {
                tracing::warn!("could not load the session of client {client}: {error}");
                AuthState::SignedOut
            }
        }
    }

    /// Tell the listeners of `client` about `state`.
    ///
    /// A client nobody listens to gets no channel; its state is read from the
    /// database when someone subscribes.
    fn broadcast(&self, client: &ClientId, state: AuthState) {
        match self.clients.lock() {
            Ok(clients) => {
                if let Some(sender) = clients.get(client) {
                    sender.send_replace(state);
                }
            }
            Err(error) => tracing::error!("could not acquire the client lock: {error}"),
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.clients
            .lock()
            .map(|clients| clients.len())
            .unwrap_or_default()
    }

    fn start_client_session(
        &self,
        client: &ClientId,
        subject: &Subject,
    ) -> Result<(), IdentityError> {
        self.lock_connection()?.execute(
            "INSERT INTO client_session (client_id, uid) VALUES (?1, ?2)
            ON CONFLICT(client_id) DO UPDATE SET uid = excluded.uid",
            params![client.as_str(), subject.uid.as_str()],
        )?;

        tracing::info!("client {client} signed in as {}", subject.uid);
        self.broadcast(client, AuthState::SignedIn(subject.clone()));

        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for SqliteIdentityProvider {
    fn auth_state_changes(&self, client: &ClientId) -> watch::Receiver<AuthState> {
        let mut clients = match self.clients.lock() {
            Ok(clients) => clients,
            Err(error) => {
                tracing::error!("could not acquire the client lock: {error}");
                let (_, receiver) = watch::channel(AuthState::SignedOut);
                return receiver;
            }
        };

        if let Some(sender) = clients.get(client) {
            return sender.subscribe();
        }

        clients.retain(|_, sender| sender.receiver_count() > 0);

        let (sender, receiver) = watch::channel(self.stored_state(client));
        clients.insert(client.clone(), sender);

        receiver
    }

    async fn register(
        &self,
        client: &ClientId,
        email: &str,
        password: &str,
    ) -> Result<Subject, IdentityError> {
        let email = normalize_email(email);

        if !EmailAddress::is_valid(&email) {
            return Err(IdentityError::InvalidEmail);
        }

        let password = ValidatedPassword::new(password, &email).map_err(|error| match error {
            Error::TooWeak(feedback) => IdentityError::WeakPassword(feedback),
            error => IdentityError::Unavailable(error.to_string()),
        })?;
        let password_hash = PasswordHash::new(password, self.password_cost).map_err(|error| {
            tracing::error!("could not hash password: {error}");
            IdentityError::Unavailable("het wachtwoord kon niet worden verwerkt".to_owned())
        })?;

        let subject = Subject {
            uid: UserId::generate(),
            email,
        };

        let insert_result = self.lock_connection()?.execute(
            "INSERT INTO account (uid, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                subject.uid.as_str(),
                subject.email,
                password_hash.as_str(),
                OffsetDateTime::now_utc()
            ],
        );

        match insert_result {
            Ok(_) => {}
            // Code 2067 occurs when a UNIQUE constraint failed.
            Err(rusqlite::Error::SqliteFailure(sql_error, Some(ref desc)))
                if sql_error.extended_code == 2067 && desc.contains("email") =>
            {
                return Err(IdentityError::EmailInUse);
            }
            Err(error) => return Err(error.into()),
        }

        tracing::info!("registered account {}", subject.uid);
        self.start_client_session(client, &subject)?;

        Ok(subject)
    }

    async fn sign_in(
        &self,
        client: &ClientId,
        email: &str,
        password: &str,
    ) -> Result<Subject, IdentityError> {
        let email = normalize_email(email);

        let account = self
            .lock_connection()?
            .query_row(
                "SELECT uid, password_hash FROM account WHERE email = ?1",
                [&email],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((uid, password_hash)) = account else {
            return Err(IdentityError::InvalidCredential);
        };

        match PasswordHash::from_stored(password_hash).verify(password) {
            Ok(true) => {}
            Ok(false) => return Err(IdentityError::InvalidCredential),
            Err(error) => {
                tracing::error!("could not verify the password of {uid}: {error}");
                return Err(IdentityError::InvalidCredential);
            }
        }

        let subject = Subject {
            uid: UserId::new(uid),
            email,
        };
        self.start_client_session(client, &subject)?;

        Ok(subject)
    }

    async fn sign_in_federated(
        &self,
        client: &ClientId,
        provider: FederatedProvider,
    ) -> Result<Subject, IdentityError> {
        tracing::debug!("client {client} tried to sign in with {provider}");

        Err(IdentityError::FederatedNotSupported(provider))
    }

    async fn sign_out(&self, client: &ClientId) -> Result<(), IdentityError> {
        self.lock_connection()?.execute(
            "DELETE FROM client_session WHERE client_id = ?1",
            [client.as_str()],
        )?;

        tracing::info!("client {client} signed out");
        self.broadcast(client, AuthState::SignedOut);

        Ok(())
    }
}
