//! Tells browsers apart with a private cookie.

use std::fmt::Display;

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use rand::{Rng, distributions::Alphanumeric};
use time::Duration;

pub const COOKIE_CLIENT_ID: &str = "client_id";

const CLIENT_ID_LENGTH: usize = 32;

/// Clients keep their id for a year; signing out does not change it.
const CLIENT_COOKIE_DURATION: Duration = Duration::days(365);

/// One browser. Each client owns one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        let id = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CLIENT_ID_LENGTH)
            .map(char::from)
            .collect();

        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Read the client id from `jar`, or assign a new one.
///
/// Returns the jar to send back with the response, which holds the cookie
/// if it was just assigned.
pub fn get_or_assign_client_id(jar: PrivateCookieJar) -> (PrivateCookieJar, ClientId) {
    if let Some(cookie) = jar
        .get(COOKIE_CLIENT_ID)
        .filter(|cookie| is_valid_client_id(cookie.value()))
    {
        return (jar, ClientId::new(cookie.value()));
    }

    let client_id = ClientId::generate();
    tracing::debug!("assigning new client id {client_id}");

    let jar = jar.add(
        Cookie::build((COOKIE_CLIENT_ID, client_id.as_str().to_owned()))
            .max_age(CLIENT_COOKIE_DURATION)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    );

    (jar, client_id)
}

fn is_valid_client_id(value: &str) -> bool {
    value.len() == CLIENT_ID_LENGTH && value.chars().all(|c| c.is_ascii_alphanumeric())
}
