//! Single-slot inboxes between workers and the daemon
//!
//! Each worker owns the sending half of one inbox; the daemon polls the
//! receiving half on a timer. The slot holds at most one unread value and a
//! publish behind an unread value replaces it, so a slow consumer only ever
//! sees the latest reading and intermediate ones are dropped. Orientation
//! changes rely on this: after the post-transition pause the engine acts on
//! where the device is now, not on every position it passed through.

use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    closed: bool,
}

/// Producer half, owned by a worker
#[derive(Debug)]
pub struct Outbox<T> {
    slot: Arc<Mutex<Slot<T>>>,
    name: &'static str,
}

/// Consumer half, owned by the daemon
#[derive(Debug)]
pub struct Inbox<T> {
    slot: Arc<Mutex<Slot<T>>>,
    name: &'static str,
}

/// Create a connected outbox/inbox pair; `name` labels log lines
pub fn channel<T>(name: &'static str) -> (Outbox<T>, Inbox<T>) {
    let slot = Arc::new(Mutex::new(Slot {
        value: None,
        closed: false,
    }));
    (
        Outbox {
            slot: slot.clone(),
            name,
        },
        Inbox { slot, name },
    )
}

impl<T> Outbox<T> {
    /// Store `value`, replacing any unread one.
    ///
    /// Returns `false` once the inbox has been dropped.
    pub fn publish(&self, value: T) -> bool {
        let mut slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.closed {
            return false;
        }
        if slot.value.replace(value).is_some() {
            tracing::trace!("{} inbox: unread event overwritten", self.name);
        }
        true
    }
}

impl<T> Clone for Outbox<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            name: self.name,
        }
    }
}

impl<T> Inbox<T> {
    /// Take the pending value, if any
    pub fn take(&self) -> Option<T> {
        let mut slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.value.take()
    }

    /// Drop any pending value without acting on it
    pub fn clear(&self) {
        if self.take().is_some() {
            tracing::trace!("{} inbox: pending event discarded", self.name);
        }
    }
}

impl<T> Drop for Inbox<T> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            slot.closed = true;
            slot.value = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_inbox() {
        let (_tx, rx) = channel::<u32>("test");
        assert_eq!(rx.take(), None);
    }

    #[test]
    fn test_take_consumes() {
        let (tx, rx) = channel("test");
        assert!(tx.publish(1));
        assert_eq!(rx.take(), Some(1));
        assert_eq!(rx.take(), None);
    }

    #[test]
    fn test_latest_value_wins() {
        let (tx, rx) = channel("test");
        tx.publish("left");
        tx.publish("inverted");
        tx.publish("right");
        assert_eq!(rx.take(), Some("right"));
        assert_eq!(rx.take(), None);
    }

    #[test]
    fn test_publish_after_inbox_dropped() {
        let (tx, rx) = channel("test");
        drop(rx);
        assert!(!tx.publish(7));
    }

    #[test]
    fn test_clear() {
        let (tx, rx) = channel("test");
        tx.publish(true);
        rx.clear();
        assert_eq!(rx.take(), None);
    }

    #[test]
    fn test_cloned_outbox_shares_slot() {
        let (tx, rx) = channel("test");
        let tx2 = tx.clone();
        tx.publish(1);
        tx2.publish(2);
        assert_eq!(rx.take(), Some(2));
    }
}
