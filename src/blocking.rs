//! Predicate waits shared by `WAIT` and blocking `XREAD`.
//!
//! A [`Condition`] owns a piece of state. Mutators change it through
//! [`Condition::update`], which wakes every waiter whose predicate may now
//! hold; waiters call [`Condition::wait_until`] with a predicate and an
//! optional timeout. The predicate is checked against the current state
//! before suspending, so a change made between a caller's own check and the
//! start of its wait is never missed.

use std::time::Duration;

use tokio::sync::watch;

#[derive(Debug)]
pub struct Condition<T> {
    sender: watch::Sender<T>,
}

impl<T> Condition<T> {
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);

        Self { sender }
    }

    /// Applies `mutate` and notifies waiters when it returns `true`.
    pub fn update<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        self.sender.send_if_modified(mutate)
    }

    /// Reads the current state without waiting.
    pub fn with<F, R>(&self, read: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        read(&self.sender.borrow())
    }

    /// Suspends until `predicate` holds or `timeout` elapses.
    ///
    /// `None` waits indefinitely. Returns whether the predicate was satisfied.
    pub async fn wait_until<P>(&self, mut predicate: P, timeout: Option<Duration>) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        let mut receiver = self.sender.subscribe();

        match timeout {
            Some(duration) => matches!(
                tokio::time::timeout(duration, receiver.wait_for(|state| predicate(state))).await,
                Ok(Ok(_))
            ),
            None => receiver.wait_for(|state| predicate(state)).await.is_ok(),
        }
    }
}
