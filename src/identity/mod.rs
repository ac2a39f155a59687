//! Who is signed in: the identity provider seam, its SQLite implementation
//! and the cookie that tells browsers apart.
//!
//! The provider keeps one authentication state per client and broadcasts
//! every change over a [tokio::sync::watch] channel. Sign-in and sign-out
//! calls only change that state; reacting to it is up to whoever listens.

mod client;
mod password;
mod sign_in;
mod sqlite;

use std::{fmt::Display, str::FromStr};

use async_trait::async_trait;
use rand::{Rng, distributions::Alphanumeric};
use tokio::sync::watch;

pub use client::{COOKIE_CLIENT_ID, ClientId, get_or_assign_client_id};
pub use sign_in::{auth_section_view, post_auth, post_federated_sign_in, post_sign_out};
pub use sqlite::{SqliteIdentityProvider, create_account_table, create_client_session_table};

/// The number of characters in a generated user id.
pub const USER_ID_LENGTH: usize = 28;

/// The stable, unique id of a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        let id = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(USER_ID_LENGTH)
            .map(char::from)
            .collect();

        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub uid: UserId,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn(Subject),
}

/// Identity providers other than email and password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FederatedProvider {
    Google,
}

impl FromStr for FederatedProvider {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            other => Err(IdentityError::UnknownProvider(other.to_owned())),
        }
    }
}

impl Display for FederatedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FederatedProvider::Google => write!(f, "Google"),
        }
    }
}

/// Errors reported by the identity provider.
///
/// The message is shown to the user as is.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum IdentityError {
    #[error("Ongeldig e-mailadres.")]
    InvalidEmail,

    #[error("Wachtwoord is te zwak: {0}")]
    WeakPassword(String),

    #[error("Er bestaat al een account met dit e-mailadres.")]
    EmailInUse,

    #[error("Onjuist e-mailadres of wachtwoord.")]
    InvalidCredential,

    #[error("Inloggen met {0} wordt niet ondersteund.")]
    FederatedNotSupported(FederatedProvider),

    #[error("Onbekende inlogdienst \"{0}\".")]
    UnknownProvider(String),

    #[error("De inlogdienst is niet beschikbaar: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for IdentityError {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred in the identity provider: {value}");
        IdentityError::Unavailable(value.to_string())
    }
}

/// Signs clients in and out and broadcasts their authentication state.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The authentication state stream of `client`.
    ///
    /// The receiver holds the current state straight away.
    fn auth_state_changes(&self, client: &ClientId) -> watch::Receiver<AuthState>;

    /// Whether [IdentityProvider::sign_in_federated] can succeed at all.
    fn supports_federated(&self) -> bool {
        false
    }

    /// Create an account and sign `client` in with it.
    async fn register(
        &self,
        client: &ClientId,
        email: &str,
        password: &str,
    ) -> Result<Subject, IdentityError>;

    async fn sign_in(
        &self,
        client: &ClientId,
        email: &str,
        password: &str,
    ) -> Result<Subject, IdentityError>;

    async fn sign_in_federated(
        &self,
        client: &ClientId,
        provider: FederatedProvider,
    ) -> Result<Subject, IdentityError>;

    async fn sign_out(&self, client: &ClientId) -> Result<(), IdentityError>;
}

#[cfg(test)]
mod identity_tests {
    use super::{FederatedProvider, IdentityError, USER_ID_LENGTH, UserId};

    #[test]
    fn generated_user_ids_have_fixed_length() {
        assert_eq!(UserId::generate().as_str().len(), USER_ID_LENGTH);
    }

    #[test]
    fn parses_google_provider() {
        assert_eq!("google".parse(), Ok(FederatedProvider::Google));
    }

    #[test]
    fn rejects_unknown_provider() {
        assert_eq!(
            "myspace".parse::<FederatedProvider>(),
            Err(IdentityError::UnknownProvider("myspace".to_owned()))
        );
    }
}
