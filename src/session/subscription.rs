//! Owned handles for background listeners.

use tokio::task::JoinHandle;

/// A running background listener. Dropping the handle stops it.
#[derive(Debug)]
pub struct SubscriptionHandle {
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    /// Whether the listener has stopped on its own, e.g. after a stream error.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Holds at most one [SubscriptionHandle].
#[derive(Debug, Default)]
pub struct SubscriptionSlot {
    current: Option<SubscriptionHandle>,
}

impl SubscriptionSlot {
    /// Store `handle`, stopping the listener it replaces.
    ///
    /// Returns whether a previous listener was stopped.
    pub fn acquire(&mut self, handle: SubscriptionHandle) -> bool {
        self.current.replace(handle).is_some()
    }

    /// Stop the current listener, if any. Safe to call any number of times.
    pub fn release(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[cfg(test)]
mod subscription_slot_tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::{SubscriptionHandle, SubscriptionSlot};

    /// A listener that reports on `stopped` when it is aborted.
    fn pending_listener() -> (SubscriptionHandle, oneshot::Receiver<()>) {
        let (stopped_tx, stopped_rx) = oneshot::channel();
        let signal = DropSignal(Some(stopped_tx));

        let task = tokio::spawn(async move {
            let _signal = signal;
            std::future::pending::<()>().await;
        });

        (SubscriptionHandle::new(task), stopped_rx)
    }

    struct DropSignal(Option<oneshot::Sender<()>>);

    impl Drop for DropSignal {
        fn drop(&mut self) {
            if let Some(sender) = self.0.take() {
                let _ = sender.send(());
            }
        }
    }

    async fn assert_stopped(stopped: oneshot::Receiver<()>) {
        tokio::time::timeout(Duration::from_secs(1), stopped)
            .await
            .expect("listener was not stopped")
            .expect("listener dropped its signal without sending");
    }

    #[tokio::test]
    async fn acquire_stops_previous_listener() {
        let mut slot = SubscriptionSlot::default();
        let (first, first_stopped) = pending_listener();
        let (second, mut second_stopped) = pending_listener();

        assert!(!slot.acquire(first));
        assert!(slot.acquire(second));

        assert_stopped(first_stopped).await;
        assert!(second_stopped.try_recv().is_err());
        assert!(slot.is_active());
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let mut slot = SubscriptionSlot::default();
        let (listener, stopped) = pending_listener();
        slot.acquire(listener);

        assert!(slot.release());
        assert!(!slot.release());
        assert!(!slot.is_active());
        assert_stopped(stopped).await;
    }

    #[test]
    fn release_without_listener_is_noop() {
        let mut slot = SubscriptionSlot::default();

        assert!(!slot.release());
        assert!(!slot.is_active());
    }
}
