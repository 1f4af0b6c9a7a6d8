//! Single-slot "latest value" channel.
//!
//! The analysis thread publishes a result per block; the presentation side
//! only ever cares about the newest one. Publishing into a full slot evicts
//! the unread value instead of queueing behind it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};

/// Creates a connected publisher/reader pair sharing one slot.
pub fn latest_channel<T>() -> (LatestSender<T>, LatestReceiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let alive = Arc::new(());
    let sender = LatestSender {
        tx,
        evict: rx.clone(),
        receiver_alive: Arc::downgrade(&alive),
    };
    let receiver = LatestReceiver { rx, _alive: alive };
    (sender, receiver)
}

pub struct LatestSender<T> {
    tx: Sender<T>,
    // Used only to drop a stale value when the slot is full.
    evict: Receiver<T>,
    receiver_alive: Weak<()>,
}

impl<T> LatestSender<T> {
    /// Stores `value`, replacing any value the reader has not taken yet.
    ///
    /// Returns `false` once the reader has been dropped.
    pub fn publish(&self, value: T) -> bool {
        if self.receiver_alive.strong_count() == 0 {
            return false;
        }

        let mut value = value;
        loop {
            match self.tx.try_send(value) {
                Ok(()) => return true,
                Err(TrySendError::Full(rejected)) => {
                    let _ = self.evict.try_recv();
                    value = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }
}

pub struct LatestReceiver<T> {
    rx: Receiver<T>,
    _alive: Arc<()>,
}

impl<T> LatestReceiver<T> {
    /// Takes the newest value without blocking.
    pub fn latest(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Blocks until a value is published. Returns `None` once the publisher
    /// is gone and the slot is empty.
    pub fn wait(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}
