//! Synchronous signal/slot notification.
//!
//! A [`Signal`] keeps an ordered list of connected slots (closures) and
//! invokes every one of them, on the emitting thread, each time
//! [`Signal::emit`] is called. This is the mechanism collections use to tell
//! their observers about insertions, removals, updates and visibility
//! changes.
//!
//! # Delivery guarantees
//!
//! - Slots run synchronously: `emit` returns only after every slot ran.
//! - Slots run in the order they were connected.
//! - A slot that panics is logged and skipped; the remaining slots still run.
//! - The connection list is snapshotted before dispatch, so a slot may connect,
//!   disconnect or even re-emit on the same signal. Such changes apply to the
//!   next emission.
//!
//! # Example
//!
//! ```
//! use celexta_core::Signal;
//!
//! let name_changed = Signal::<String>::new();
//!
//! let conn_id = name_changed.connect(|name| {
//!     println!("Name changed to: {}", name);
//! });
//!
//! name_changed.emit("GRB 250101A".to_string());
//! name_changed.disconnect(conn_id);
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// Handle of one connected slot, accepted by [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// Connected slots plus their registration order.
///
/// `SlotMap` reuses freed slots, so its iteration order is not the
/// connection order; `order` is.
struct Connections<Args> {
    slots: SlotMap<ConnectionId, Slot<Args>>,
    order: Vec<ConnectionId>,
}

impl<Args> Connections<Args> {
    fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    fn snapshot(&self) -> Vec<Slot<Args>> {
        self.order
            .iter()
            .filter_map(|id| self.slots.get(*id).cloned())
            .collect()
    }
}

/// An ordered list of observers of `Args` values.
///
/// Slots receive `&Args`; collection notifiers use an event enum.
pub struct Signal<Args> {
    connections: Mutex<Connections<Args>>,
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// A signal with no slots.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Connections::new()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Appends `slot` to the delivery list.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let mut connections = self.connections.lock();
        let id = connections.slots.insert(Arc::new(slot));
        connections.order.push(id);
        id
    }

    /// Removes the slot `id`. Returns false if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.lock();
        if connections.slots.remove(id).is_none() {
            return false;
        }
        connections.order.retain(|other| *other != id);
        true
    }

    /// Removes every slot.
    pub fn disconnect_all(&self) {
        let mut connections = self.connections.lock();
        connections.slots.clear();
        connections.order.clear();
    }

    /// Number of slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().slots.len()
    }

    /// Suppresses (or restores) delivery.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Whether delivery is suppressed.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots in connection order.
    ///
    /// Returns the number of slots that completed without panicking. A
    /// blocked signal returns 0 without invoking anything.
    pub fn emit(&self, args: Args) -> usize {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return 0;
        }

        // Release the lock before running slots so they can touch the signal.
        let slots = self.connections.lock().snapshot();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");

        let mut delivered = 0;
        for (position, slot) in slots.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| slot(&args))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::error!(
                        target: targets::SIGNAL,
                        slot = position,
                        reason = %panic_message(payload.as_ref()),
                        "slot panicked during emit, continuing with remaining slots"
                    );
                }
            }
        }
        delivered
    }

    /// Connect a slot that is disconnected when the returned guard is dropped.
    ///
    /// The guard only holds a weak reference, so it never keeps the signal
    /// alive and dropping it after the signal is gone is harmless.
    ///
    /// # Example
    ///
    /// ```
    /// use celexta_core::Signal;
    /// use std::sync::atomic::{AtomicI32, Ordering};
    /// use std::sync::Arc;
    ///
    /// let rows_added = Arc::new(Signal::<i32>::new());
    /// let total = Arc::new(AtomicI32::new(0));
    /// {
    ///     let sum = total.clone();
    ///     let _guard = rows_added.connect_scoped(move |&n| {
    ///         sum.fetch_add(n, Ordering::Relaxed);
    ///     });
    ///     rows_added.emit(3);
    /// }
    /// rows_added.emit(5);
    /// assert_eq!(total.load(Ordering::Relaxed), 3);
    /// ```
    pub fn connect_scoped<F>(self: &Arc<Self>, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard {
            signal: Arc::downgrade(self),
            id,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Disconnects its slot on drop. See [`Signal::connect_scoped`].
pub struct ConnectionGuard<Args: 'static> {
    signal: Weak<Signal<Args>>,
    id: ConnectionId,
}

impl<Args: 'static> ConnectionGuard<Args> {
    /// The id of the guarded connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args: 'static> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(signal) = self.signal.upgrade() {
            signal.disconnect(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_signal_connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(42);
        signal.emit(100);

        let values = received.lock();
        assert_eq!(*values, vec![42, 100]);
    }

    #[test]
    fn test_signal_disconnect() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        let conn_id = signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(1);
        assert!(signal.disconnect(conn_id));
        assert!(!signal.disconnect(conn_id));
        signal.emit(2);

        let values = received.lock();
        assert_eq!(*values, vec![1]);
    }

    #[test]
    fn test_signal_blocked() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(1);
        signal.set_blocked(true);
        assert_eq!(signal.emit(2), 0);
        signal.set_blocked(false);
        signal.emit(3);

        let values = received.lock();
        assert_eq!(*values, vec![1, 3]);
    }

    #[test]
    fn test_delivery_follows_connection_order() {
        let signal = Signal::<()>::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut ids = Vec::new();
        for n in 0..4 {
            let order = order.clone();
            ids.push(signal.connect(move |_| order.lock().push(n)));
        }
        // Free a slot and connect again: the newcomer must still run last.
        signal.disconnect(ids[1]);
        let late = order.clone();
        signal.connect(move |_| late.lock().push(99));

        signal.emit(());
        assert_eq!(*order.lock(), vec![0, 2, 3, 99]);
    }

    #[test]
    fn test_panicking_slot_does_not_stop_delivery() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let first = received.clone();
        signal.connect(move |&v| first.lock().push(("first", v)));
        signal.connect(|_| panic!("observer failure"));
        let last = received.clone();
        signal.connect(move |&v| last.lock().push(("last", v)));

        let delivered = signal.emit(7);

        assert_eq!(delivered, 2);
        assert_eq!(*received.lock(), vec![("first", 7), ("last", 7)]);
    }

    #[test]
    fn test_slot_can_disconnect_itself_during_emit() {
        let signal = Arc::new(Signal::<i32>::new());
        let id_cell = Arc::new(Mutex::new(None::<ConnectionId>));
        let calls = Arc::new(Mutex::new(0));

        let weak = Arc::downgrade(&signal);
        let id_for_slot = id_cell.clone();
        let calls_clone = calls.clone();
        let id = signal.connect(move |_| {
            *calls_clone.lock() += 1;
            if let (Some(signal), Some(id)) = (weak.upgrade(), *id_for_slot.lock()) {
                signal.disconnect(id);
            }
        });
        *id_cell.lock() = Some(id);

        signal.emit(1);
        signal.emit(2);

        assert_eq!(*calls.lock(), 1);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_multiple_connections() {
        let signal = Signal::<String>::new();
        let count = Arc::new(Mutex::new(0));

        for _ in 0..3 {
            let count_clone = count.clone();
            signal.connect(move |_| {
                *count_clone.lock() += 1;
            });
        }

        assert_eq!(signal.connection_count(), 3);
        assert_eq!(signal.emit("test".to_string()), 3);
        assert_eq!(*count.lock(), 3);
    }

    #[test]
    fn test_disconnect_all() {
        let signal = Signal::<()>::new();

        for _ in 0..5 {
            signal.connect(|_| {});
        }

        assert_eq!(signal.connection_count(), 5);
        signal.disconnect_all();
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_connection_guard() {
        let signal = Arc::new(Signal::<i32>::new());
        let received = Arc::new(Mutex::new(Vec::new()));

        {
            let received_clone = received.clone();
            let _guard = signal.connect_scoped(move |&value| {
                received_clone.lock().push(value);
            });
            signal.emit(1);
        }

        signal.emit(2);

        let values = received.lock();
        assert_eq!(*values, vec![1]);
    }

    #[test]
    fn test_guard_outliving_signal() {
        let signal = Arc::new(Signal::<i32>::new());
        let guard = signal.connect_scoped(|_| {});
        drop(signal);
        drop(guard);
    }
}
