// Control plane: per-sender sequencing
//
// The executor does not coordinate concurrent executions for one sender.
// Callers that may start several payments from the same account take a
// permit here first so those executions run one after another.
//
// Numan Thabit 2025 Nov

use crate::venues::adapter::Account;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

type Lanes = HashMap<Account, Arc<Mutex<()>>>;

/// Per-sender lanes. A lane lives only while a permit for its sender is
/// held or awaited.
#[derive(Clone, Default)]
pub struct SenderSequencer {
    inner: Arc<StdMutex<Lanes>>,
}

/// Held for the duration of one execution; dropping it admits the next one.
pub struct SenderPermit {
    sender: Account,
    lanes: Arc<StdMutex<Lanes>>,
    guard: OwnedMutexGuard<()>,
}

impl SenderPermit {
    pub fn sender(&self) -> &Account {
        &self.sender
    }
}

impl Drop for SenderPermit {
    fn drop(&mut self) {
        let mut lanes = lock_lanes(&self.lanes);
        // map entry plus this guard: nobody else is queued on the lane
        if Arc::strong_count(OwnedMutexGuard::mutex(&self.guard)) <= 2 {
            lanes.remove(&self.sender);
            debug!(sender = %self.sender, "sender lane released");
        }
    }
}

fn lock_lanes(lanes: &StdMutex<Lanes>) -> MutexGuard<'_, Lanes> {
    // map updates cannot panic halfway, so a poisoned map is still consistent
    lanes.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SenderSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other permit for `sender` is outstanding.
    pub async fn acquire(&self, sender: &Account) -> SenderPermit {
        let lane = lock_lanes(&self.inner)
            .entry(sender.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lane.lock_owned().await;
        debug!(sender = %sender, "sender lane acquired");
        SenderPermit {
            sender: sender.clone(),
            lanes: self.inner.clone(),
            guard,
        }
    }

    /// Number of senders with a permit held or awaited.
    pub fn lanes(&self) -> usize {
        lock_lanes(&self.inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_sender_waits_for_release() {
        let seq = SenderSequencer::new();
        let alice = Account::new("alice");

        let first = seq.acquire(&alice).await;
        let blocked = tokio::time::timeout(Duration::from_millis(20), seq.acquire(&alice)).await;
        assert!(blocked.is_err());

        drop(first);
        let second = tokio::time::timeout(Duration::from_millis(20), seq.acquire(&alice)).await;
        assert_eq!(second.unwrap().sender(), &alice);
    }

    #[tokio::test]
    async fn different_senders_do_not_block() {
        let seq = SenderSequencer::new();
        let _a = seq.acquire(&Account::new("alice")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(20),
            seq.acquire(&Account::new("bob")),
        )
        .await;
        assert!(b.is_ok());
        assert_eq!(seq.lanes(), 2);
    }

    #[tokio::test]
    async fn lane_is_dropped_with_its_last_permit() {
        let seq = SenderSequencer::new();
        let alice = Account::new("alice");

        let permit = seq.acquire(&alice).await;
        assert_eq!(seq.lanes(), 1);
        drop(permit);
        assert_eq!(seq.lanes(), 0);

        // reacquiring after cleanup starts a fresh lane
        let again = seq.acquire(&alice).await;
        assert_eq!(again.sender(), &alice);
        assert_eq!(seq.lanes(), 1);
    }

    #[tokio::test]
    async fn lane_survives_while_a_waiter_is_queued() {
        let seq = SenderSequencer::new();
        let alice = Account::new("alice");

        let first = seq.acquire(&alice).await;
        let waiter = {
            let seq = seq.clone();
            let alice = alice.clone();
            tokio::spawn(async move { seq.acquire(&alice).await.sender().clone() })
        };
        tokio::task::yield_now().await;

        drop(first);
        assert_eq!(seq.lanes(), 1);

        assert_eq!(waiter.await.unwrap(), alice);
        assert_eq!(seq.lanes(), 0);
    }
}
