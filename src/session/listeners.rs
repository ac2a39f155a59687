//! The background tasks that keep a session in step with its sources.

use std::sync::Weak;

use tokio::sync::watch;

use crate::{
    identity::{AuthState, UserId},
    store::SnapshotReceiver,
};

use super::{Session, subscription::SubscriptionHandle};

/// Follow the auth state of the session's client for as long as the session
/// lives.
pub(super) fn spawn_gate(
    session: Weak<Session>,
    mut auth_state: watch::Receiver<AuthState>,
) -> SubscriptionHandle {
    let task = tokio::spawn(async move {
        while auth_state.changed().await.is_ok() {
            let state = auth_state.borrow_and_update().clone();
            let Some(session) = session.upgrade() else {
                break;
            };

            if let Err(error) = session.apply_auth_state(state) {
                tracing::error!("could not apply the auth state of client {}: {error}", session.client());
            }
        }
    });

    SubscriptionHandle::new(task)
}

/// Mirror every snapshot `snapshots` delivers for `uid` into the session.
///
/// The receiver's current snapshot must already have been applied. The task
/// ends on the first stream error.
pub(super) fn spawn_mirror(
    session: Weak<Session>,
    uid: UserId,
    mut snapshots: SnapshotReceiver,
) -> SubscriptionHandle {
    let task = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let event = snapshots.borrow_and_update().clone();
            let Some(session) = session.upgrade() else {
                break;
            };

            match session.apply_snapshot_event(&uid, event) {
                Ok(true) => {}
                Ok(false) => break,
                Err(error) => {
                    tracing::error!("could not mirror snapshot for {uid}: {error}");
                    break;
                }
            }
        }

        tracing::debug!("stopped mirroring transactions of {uid}");
    });

    SubscriptionHandle::new(task)
}
