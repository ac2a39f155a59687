//! Client sessions.
//!
//! Every browser gets one [Session]: the controller that owns the browser's
//! [Workspace] and the two listeners feeding it. The gate follows the client's
//! auth state; on sign-in it opens exactly one live query on the user's
//! transactions (the mirror) and on sign-out it closes that query and clears
//! the workspace.
//!
//! The workspace is behind a synchronous lock that is never held across an
//! `.await`; store calls are made with the lock released and their outcome is
//! applied afterwards.

mod listeners;
mod registry;
mod subscription;
mod workspace;

use std::sync::{Arc, Mutex, MutexGuard};

use time::Date;
use tokio::sync::watch;

use crate::{
    Error,
    identity::{AuthState, ClientId, IdentityProvider, UserId},
    status::StatusMessage,
    store::{DocumentStore, SnapshotEvent},
    timezone,
    transaction::{
        TransactionForm, TransactionId, TypeFilter, transactions_collection,
        transactions_from_snapshot, transactions_query,
    },
};

pub use registry::SessionRegistry;
pub use subscription::{SubscriptionHandle, SubscriptionSlot};
pub use workspace::{Mutation, SIGN_IN_FIRST, TRANSACTION_GONE, Workspace};

use listeners::{spawn_gate, spawn_mirror};

pub const DELETE_NOT_CONFIRMED: &str = "Bevestig eerst dat de transactie weg mag.";

/// Counters that go up whenever a part of the page needs to be redrawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Revisions {
    /// The user line, auth section and workspace controls.
    pub session: u64,
    /// Totals, charts and the table.
    pub data: u64,
    pub status: u64,
}

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotSource {
    Live,
    Refresh,
}

/// The controller for one client.
pub struct Session {
    client: ClientId,
    store: Arc<dyn DocumentStore>,
    local_timezone: String,
    auth_state: watch::Receiver<AuthState>,
    /// Lock order: `subscription` before `workspace`.
    subscription: Mutex<SubscriptionSlot>,
    workspace: Mutex<Workspace>,
    gate: Mutex<Option<SubscriptionHandle>>,
    changes: watch::Sender<Revisions>,
}

impl Session {
    /// Create the session of `client` and start following its auth state.
    ///
    /// The current auth state is applied before this returns, so a client
    /// that is already signed in starts with its snapshot loaded.
    ///
    /// # Errors
    /// Returns an error if `local_timezone` is invalid or a lock is poisoned.
    pub fn start(
        client: ClientId,
        identity: &dyn IdentityProvider,
        store: Arc<dyn DocumentStore>,
        local_timezone: &str,
    ) -> Result<Arc<Self>, Error> {
        let today = timezone::today(local_timezone)?;
        let auth_state = identity.auth_state_changes(&client);
        let (changes, _) = watch::channel(Revisions::default());

        let session = Arc::new(Self {
            client,
            store,
            local_timezone: local_timezone.to_owned(),
            auth_state: auth_state.clone(),
            subscription: Mutex::new(SubscriptionSlot::default()),
            workspace: Mutex::new(Workspace::new(today)),
            gate: Mutex::new(None),
            changes,
        });

        session.sync_auth_state()?;

        let gate = spawn_gate(Arc::downgrade(&session), auth_state);
        *session.gate.lock().map_err(|error| {
            tracing::error!("could not acquire the gate lock: {error}");
            Error::SessionLockError
        })? = Some(gate);

        tracing::debug!("started session for client {}", session.client);

        Ok(session)
    }

    pub fn client(&self) -> &ClientId {
        &self.client
    }

    /// Today's date in the server's timezone.
    pub fn today(&self) -> Result<Date, Error> {
        timezone::today(&self.local_timezone)
    }

    /// Revisions of the parts of the page, see [Revisions].
    pub fn changes(&self) -> watch::Receiver<Revisions> {
        self.changes.subscribe()
    }

    /// Run `f` on the current workspace.
    pub fn read<T>(&self, f: impl FnOnce(&Workspace) -> T) -> Result<T, Error> {
        let workspace = self.lock_workspace()?;
        Ok(f(&workspace))
    }

    /// Show `status` in the status area.
    pub fn report(&self, status: StatusMessage) -> Result<(), Error> {
        self.lock_workspace()?.set_status(status);
        self.bump(|revisions| revisions.status += 1);

        Ok(())
    }

    /// Apply the client's current auth state right away instead of waiting
    /// for the gate to see it.
    pub fn sync_auth_state(self: &Arc<Self>) -> Result<(), Error> {
        let state = self.auth_state.borrow().clone();
        self.apply_auth_state(state)
    }

    /// Validate `form` and create or update a transaction with it.
    pub async fn submit(&self, form: TransactionForm) -> Result<(), Error> {
        let prepared = {
            let mut workspace = self.lock_workspace()?;
            let uid = workspace.subject().map(|subject| subject.uid.clone());
            workspace.prepare_submit(form).zip(uid)
        };

        let Some((mutation, uid)) = prepared else {
            self.bump(|revisions| revisions.status += 1);
            return Ok(());
        };

        let collection = transactions_collection(&uid);
        let result = match &mutation {
            Mutation::Create(draft) => self
                .store
                .add_document(&collection, draft.to_fields())
                .await
                .map(|id| tracing::info!("created transaction {id} for {uid}")),
            Mutation::Update(id, draft) => self
                .store
                .update_document(&collection, id, draft.to_fields())
                .await
                .map(|()| tracing::info!("updated transaction {id} for {uid}")),
        };

        if let Err(error) = &result {
            tracing::warn!("could not save transaction for {uid}: {error}");
        }

        let today = self.today()?;
        self.lock_workspace()?
            .finish_submit(&mutation, result, today);
        self.bump(|revisions| revisions.status += 1);

        Ok(())
    }

    /// Delete the transaction `id` once the user has `confirmed` it.
    ///
    /// An id that is not in the snapshot is ignored without a store call.
    pub async fn delete(&self, id: TransactionId, confirmed: bool) -> Result<(), Error> {
        let uid = {
            let mut workspace = self.lock_workspace()?;

            match workspace.require_signed_in() {
                Some(_) if !confirmed => {
                    workspace.set_status(StatusMessage::error(DELETE_NOT_CONFIRMED));
                    None
                }
                Some(_) if !workspace.contains(&id) => {
                    tracing::debug!("ignoring delete of {id}, it is not in the snapshot");
                    None
                }
                uid => uid,
            }
        };

        let Some(uid) = uid else {
            self.bump(|revisions| revisions.status += 1);
            return Ok(());
        };

        let result = self
            .store
            .delete_document(&transactions_collection(&uid), &id)
            .await;

        match &result {
            Ok(()) => tracing::info!("deleted transaction {id} for {uid}"),
            Err(error) => tracing::warn!("could not delete transaction {id} for {uid}: {error}"),
        }

        let today = self.today()?;
        self.lock_workspace()?.finish_delete(&id, result, today);
        self.bump(|revisions| revisions.status += 1);

        Ok(())
    }

    /// Replace the snapshot with the result of a one-off query.
    ///
    /// The live query, if any, keeps running.
    pub async fn refresh(&self) -> Result<(), Error> {
        let uid = self.lock_workspace()?.require_signed_in();

        let Some(uid) = uid else {
            self.bump(|revisions| revisions.status += 1);
            return Ok(());
        };

        let result = self.store.get_documents(&transactions_query(&uid)).await;
        self.apply_snapshot(&uid, result, SnapshotSource::Refresh)?;

        Ok(())
    }

    /// Load the transaction `id` into the form for editing.
    pub fn begin_edit(&self, id: &TransactionId) -> Result<(), Error> {
        {
            let mut workspace = self.lock_workspace()?;
            if workspace.require_signed_in().is_some() {
                workspace.begin_edit(id);
            }
        }

        self.bump(|revisions| revisions.status += 1);
        Ok(())
    }

    /// Stop editing and restore the form defaults. No store call is made.
    pub fn reset_form(&self) -> Result<(), Error> {
        let today = self.today()?;
        {
            let mut workspace = self.lock_workspace()?;
            if workspace.require_signed_in().is_some() {
                workspace.reset_form(today);
            }
        }

        self.bump(|revisions| revisions.status += 1);
        Ok(())
    }

    /// Change the table filter and render again from the current snapshot.
    pub fn set_filter(&self, filter: TypeFilter) -> Result<(), Error> {
        let today = self.today()?;
        {
            let mut workspace = self.lock_workspace()?;
            if workspace.require_signed_in().is_none() {
                drop(workspace);
                self.bump(|revisions| revisions.status += 1);
                return Ok(());
            }

            workspace.set_filter(filter);
            workspace.render(today);
        }

        self.bump(|revisions| revisions.data += 1);
        Ok(())
    }

    fn apply_auth_state(self: &Arc<Self>, state: AuthState) -> Result<(), Error> {
        let today = self.today()?;
        let mut subscription = self.lock_subscription()?;

        match state {
            AuthState::SignedIn(subject) => {
                let uid = subject.uid.clone();
                {
                    let mut workspace = self.lock_workspace()?;
                    if workspace
                        .subject()
                        .is_some_and(|current| current.uid == uid)
                    {
                        return Ok(());
                    }

                    tracing::info!("client {} signed in as {uid}", self.client);
                    workspace.sign_in(subject, today);
                }

                let mut snapshots = self.store.listen(transactions_query(&uid));
                let initial = snapshots.borrow_and_update().clone();

                if self.apply_snapshot(&uid, initial, SnapshotSource::Live)? {
                    subscription.acquire(spawn_mirror(Arc::downgrade(self), uid, snapshots));
                } else {
                    subscription.release();
                }
            }
            AuthState::SignedOut => {
                subscription.release();

                let mut workspace = self.lock_workspace()?;
                if !workspace.is_signed_in() {
                    return Ok(());
                }

                tracing::info!("client {} signed out", self.client);
                workspace.sign_out(today);
                workspace.render(today);
                drop(workspace);

                self.bump(|revisions| revisions.data += 1);
            }
        }

        self.bump(|revisions| revisions.session += 1);
        Ok(())
    }

    /// Apply a snapshot pushed by the live query.
    ///
    /// Returns whether the mirror should keep listening.
    fn apply_snapshot_event(&self, uid: &UserId, event: SnapshotEvent) -> Result<bool, Error> {
        self.apply_snapshot(uid, event, SnapshotSource::Live)
    }

    fn apply_snapshot(
        &self,
        uid: &UserId,
        event: SnapshotEvent,
        source: SnapshotSource,
    ) -> Result<bool, Error> {
        let today = self.today()?;
        let mut workspace = self.lock_workspace()?;

        if workspace.subject().map(|subject| &subject.uid) != Some(uid) {
            // A snapshot for a user that has since signed out.
            return Ok(false);
        }

        let transactions = event.and_then(|snapshot| transactions_from_snapshot(&snapshot));

        let (keep_listening, data_changed, session_changed) = match transactions {
            Ok(transactions) => {
                let editing_stopped = workspace.replace_snapshot(transactions, today);
                workspace.render(today);

                if source == SnapshotSource::Refresh {
                    workspace.set_status(StatusMessage::info("Transacties vernieuwd."));
                }

                (true, true, editing_stopped)
            }
            Err(error) => {
                let message = match source {
                    SnapshotSource::Live => {
                        tracing::warn!("live query for {uid} failed: {error}");
                        format!("Live bijwerken is gestopt: {error}")
                    }
                    SnapshotSource::Refresh => {
                        tracing::warn!("refresh for {uid} failed: {error}");
                        error.to_string()
                    }
                };
                workspace.set_status(StatusMessage::error(message));

                // A failed refresh leaves the live query alone.
                (source == SnapshotSource::Refresh, false, false)
            }
        };

        drop(workspace);
        self.bump(|revisions| {
            revisions.status += 1;
            if data_changed {
                revisions.data += 1;
            }
            if session_changed {
                revisions.session += 1;
            }
        });

        Ok(keep_listening)
    }

    fn bump(&self, f: impl FnOnce(&mut Revisions)) {
        self.changes.send_modify(f);
    }

    fn lock_workspace(&self) -> Result<MutexGuard<'_, Workspace>, Error> {
        self.workspace.lock().map_err(|error| {
            tracing::error!("could not acquire the session lock: {error}");
            Error::SessionLockError
        })
    }

    fn lock_subscription(&self) -> Result<MutexGuard<'_, SubscriptionSlot>, Error> {
        self.subscription.lock().map_err(|error| {
            tracing::error!("could not acquire the subscription lock: {error}");
            Error::SessionLockError
        })
    }

    #[cfg(test)]
    fn has_live_query(&self) -> bool {
        self.subscription
            .lock()
            .map(|subscription| subscription.is_active())
            .unwrap_or(false)
    }
}
