//! Latest-wins dispatch queue.
//!
//! A single-slot mailbox between any number of producers and the one
//! dispatcher. Submitting while a value is still pending replaces it, so the
//! dispatcher always picks up the most recent desired state. Intermediate
//! submissions may never be observed.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use as3_common::{As3Error, As3Result, Declaration};

#[derive(Debug, Default)]
struct Slot {
    pending: Option<Declaration>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    slot: Mutex<Slot>,
    notify: Notify,
}

/// Creates a connected sender/receiver pair.
pub fn dispatch_channel() -> (DispatchSender, DispatchReceiver) {
    let shared = Arc::new(Shared::default());
    (
        DispatchSender {
            shared: Arc::clone(&shared),
        },
        DispatchReceiver { shared },
    )
}

/// Producer side of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DispatchSender {
    shared: Arc<Shared>,
}

impl DispatchSender {
    /// Puts `declaration` in the slot, replacing any value not yet picked up.
    ///
    /// Never waits on the dispatcher. Returns the displaced declaration, if
    /// there was one.
    ///
    /// # Errors
    ///
    /// Returns [`As3Error::QueueClosed`] once the queue has been closed.
    pub fn submit(&self, declaration: Declaration) -> As3Result<Option<Declaration>> {
        let displaced = {
            let mut slot = self.shared.slot.lock();
            if slot.closed {
                return Err(As3Error::QueueClosed);
            }
            slot.pending.replace(declaration)
        };
        self.shared.notify.notify_one();
        Ok(displaced)
    }

    /// Closes the queue. A pending value is still delivered to the receiver.
    pub fn close(&self) {
        self.shared.slot.lock().closed = true;
        self.shared.notify.notify_one();
    }

    /// Returns true if the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.slot.lock().closed
    }
}

/// Dispatcher side of the queue.
#[derive(Debug)]
pub struct DispatchReceiver {
    shared: Arc<Shared>,
}

impl DispatchReceiver {
    /// Waits for the next declaration.
    ///
    /// Returns `None` once the queue is closed and the slot is empty. The
    /// future is cancel-safe: a value is only taken when it is returned.
    pub async fn recv(&mut self) -> Option<Declaration> {
        loop {
            let notified = self.shared.notify.notified();
            {
                let mut slot = self.shared.slot.lock();
                if let Some(declaration) = slot.pending.take() {
                    return Some(declaration);
                }
                if slot.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Takes the pending declaration without waiting.
    pub fn try_recv(&mut self) -> Option<Declaration> {
        self.shared.slot.lock().pending.take()
    }
}

impl Drop for DispatchReceiver {
    fn drop(&mut self) {
        // Producers must not keep feeding a queue nobody drains.
        self.shared.slot.lock().closed = true;
    }
}
