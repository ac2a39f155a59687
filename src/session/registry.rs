use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum_extra::extract::PrivateCookieJar;

use crate::{
    Error,
    identity::{ClientId, IdentityProvider, get_or_assign_client_id},
    store::DocumentStore,
};

use super::Session;

/// Signed-out sessions nobody has used for this long are dropped.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct Entry {
    session: Arc<Session>,
    last_seen: Instant,
}

/// The sessions of the clients seen recently.
///
/// A signed-out session that has been idle for longer than the idle timeout
/// and is not held by a request or event stream is evicted whenever a new
/// session starts. Signed-in sessions stay, since they keep a live query
/// running for their browser.
pub struct SessionRegistry {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    local_timezone: String,
    idle_timeout: Duration,
    sessions: Mutex<HashMap<ClientId, Entry>>,
}

impl SessionRegistry {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        local_timezone: &str,
    ) -> Self {
        Self::with_idle_timeout(identity, store, local_timezone, SESSION_IDLE_TIMEOUT)
    }

    /// Create a registry that evicts idle signed-out sessions after `idle_timeout`.
    pub fn with_idle_timeout(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        local_timezone: &str,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            identity,
            store,
            local_timezone: local_timezone.to_owned(),
            idle_timeout,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .map(|sessions| sessions.len())
            .unwrap_or_default()
    }

    /// The session of `client`, started on first use.
    pub fn session(&self, client: &ClientId) -> Result<Arc<Session>, Error> {
        let mut sessions = self.sessions.lock().map_err(|error| {
            tracing::error!("could not acquire the session registry lock: {error}");
            Error::SessionLockError
        })?;

        let now = Instant::now();

        if let Some(entry) = sessions.get_mut(client) {
            entry.last_seen = now;
            return Ok(entry.session.clone());
        }

        self.evict_idle(&mut sessions, now);

        let session = Session::start(
            client.clone(),
            self.identity.as_ref(),
            self.store.clone(),
            &self.local_timezone,
        )?;
        sessions.insert(
            client.clone(),
            Entry {
                session: session.clone(),
                last_seen: now,
            },
        );

        Ok(session)
    }

    fn evict_idle(&self, sessions: &mut HashMap<ClientId, Entry>, now: Instant) {
        let before = sessions.len();

        sessions.retain(|_, entry| {
            let idle = now.duration_since(entry.last_seen) >= self.idle_timeout;
            let in_use = Arc::strong_count(&entry.session) > 1;
            let signed_in = entry
                .session
                .read(|workspace| workspace.is_signed_in())
                .unwrap_or(true);

            !idle || in_use || signed_in
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!("evicted {evicted} idle signed-out sessions");
        }
    }

    /// The session of the client that sent `jar`.
    ///
    /// A client without a valid id cookie is given a new id; the returned jar
    /// carries it and must be part of the response.
    pub fn session_for_jar(
        &self,
        jar: PrivateCookieJar,
    ) -> Result<(PrivateCookieJar, Arc<Session>), Error> {
        let (jar, client) = get_or_assign_client_id(jar);
        let session = self.session(&client)?;

        Ok((jar, session))
    }
}
