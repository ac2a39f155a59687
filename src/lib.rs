//! Kasboek is a web app for keeping track of personal income and expenses.
//!
//! A signed-in user records transactions in a form, sees them in a filterable
//! table, reads global totals and looks at two charts: spending per category
//! and the income/expense trend of the last six months.
//!
//! This library provides a server that directly serves HTML pages and keeps
//! each browser up to date with server-sent events.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::response::{IntoResponse, Response};
use axum_server::Handle;
use tokio::signal;

mod app_state;
mod config;
mod dashboard;
mod db;
mod endpoints;
mod html;
mod identity;
mod internal_server_error;
mod logging;
mod not_found;
mod routing;
mod session;
mod status;
mod store;
mod timezone;
mod transaction;
mod workspace_page;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use config::{ConfigError, Credentials, DEFAULT_TIMEZONE};
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use routing::{build_router, config_error_router};

use crate::{internal_server_error::InternalServerError, not_found::get_404_not_found_response};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The infrastructure errors that may occur in the application.
///
/// Errors that the user can act on (form validation, identity and store
/// failures) are reported in the status area instead, see
/// [crate::status::StatusMessage].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the lock on a client's session state.
    #[error("could not acquire the session lock")]
    SessionLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Ongeldige tijdzone",
                fix: &format!(
                    "De tijdzone \"{timezone}\" is onbekend. Controleer de serverinstellingen \
                    en gebruik een geldige, canonieke tijdzonenaam."
                ),
            }
            .into_response(),
            Error::SessionLockError => {
                InternalServerError::default().into_response()
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}
