//! Single-slot handoff channel between the capture and render threads
//!
//! One producer, one consumer, one buffer deep. The producer blocks in
//! [`Dispatcher::put`] until the consumer has drained the slot, so capture
//! pauses whenever rendering falls behind and the render thread never sees a
//! buffer that was overwritten mid-read. The consumer blocks in
//! [`Dispatcher::get`] only up to a timeout, which keeps window event polling
//! and the periodic re-render running even when no data arrives.
//!
//! Shutdown is cooperative and works from both sides: `close()` wakes a
//! producer stuck in `put` (which then returns `false`), and the consumer
//! observes a producer-side close via `is_closed()`.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::sample::SampleBuffer;
use crate::watchdog::{WaitGuard, Watchdog, WatchdogHandle};

/// Slot contents plus the closed flag, guarded together by one mutex.
struct Slot<T> {
    data: Option<T>,
    closed: bool,
}

/// Single element buffer for synchronizing one producer and one consumer.
pub struct Dispatcher<T> {
    slot: Mutex<Slot<T>>,
    available: Condvar,
    put_handle: Option<WatchdogHandle>,
    get_handle: Option<WatchdogHandle>,
}

/// The dispatcher instance moving [`SampleBuffer`]s from capture to render.
pub type SampleDispatcher = Dispatcher<SampleBuffer>;

impl<T: Clone> Dispatcher<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                data: None,
                closed: false,
            }),
            available: Condvar::new(),
            put_handle: None,
            get_handle: None,
        }
    }

    /// Report stalled `put`/`get` waits to the given watchdog.
    pub fn with_watchdog(mut self, watchdog: &Watchdog) -> Self {
        self.put_handle = Some(watchdog.register("capture", "put"));
        self.get_handle = Some(watchdog.register("render", "get"));
        self
    }

    /// Producer side: store `value` and wait until the consumer has cleared
    /// it. Returns `true` when the channel is still open after unblocking.
    ///
    /// When the channel is already closed the value is dropped and `false`
    /// is returned immediately; producers must check the result and stop.
    pub fn put(&self, value: T) -> bool {
        let mut slot = self.slot.lock().unwrap();
        if slot.closed {
            return false;
        }
        slot.data = Some(value);
        self.available.notify_all();

        let _guard = self.put_handle.as_ref().map(WaitGuard::new);
        while slot.data.is_some() && !slot.closed {
            slot = self.available.wait(slot).unwrap();
        }
        !slot.closed
    }

    /// Consumer side: wait up to `timeout` for data. Returns the slot
    /// contents without emptying the slot; the producer stays blocked until
    /// [`Dispatcher::clear`] is called, so the consumer may keep reading the
    /// buffer until then.
    pub fn get(&self, timeout: Duration) -> Option<T> {
        let slot = self.slot.lock().unwrap();
        let _guard = self.get_handle.as_ref().map(WaitGuard::new);
        let (slot, _) = self
            .available
            .wait_timeout_while(slot, timeout, |slot| {
                slot.data.is_none() && !slot.closed
            })
            .unwrap();
        slot.data.clone()
    }

    /// Consumer side: empty the slot and wake the blocked producer. To be
    /// called once the consumer has fully finished reading the buffer.
    pub fn clear(&self) {
        let mut slot = self.slot.lock().unwrap();
        slot.data = None;
        self.available.notify_all();
    }

    /// Close the channel (producer has no more data or consumer doesn't want
    /// any more). Also clears the slot so a producer blocked in `put` wakes
    /// up and is told to stop. Idempotent; callable from either thread.
    pub fn close(&self) {
        let mut slot = self.slot.lock().unwrap();
        slot.closed = true;
        slot.data = None;
        self.available.notify_all();
    }

    /// Non-blocking status query.
    pub fn is_closed(&self) -> bool {
        self.slot.lock().unwrap().closed
    }
}

impl<T: Clone> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    const SHORT: Duration = Duration::from_millis(10);
    const LONG: Duration = Duration::from_secs(2);

    #[test]
    fn test_buffers_arrive_in_order_and_intact() {
        let dispatcher: Arc<Dispatcher<Vec<u8>>> = Arc::new(Dispatcher::new());
        let producer_side = Arc::clone(&dispatcher);

        let inputs: Vec<Vec<u8>> = (0u8..20).map(|i| vec![i, i ^ 0xff, i * 3]).collect();
        let expected = inputs.clone();

        let producer = thread::spawn(move || {
            for buffer in inputs {
                assert!(producer_side.put(buffer), "channel closed unexpectedly");
            }
            producer_side.close();
        });

        let mut received = Vec::new();
        loop {
            if let Some(buffer) = dispatcher.get(LONG) {
                received.push(buffer);
                dispatcher.clear();
            } else if dispatcher.is_closed() {
                break;
            }
        }

        producer.join().unwrap();
        assert_eq!(received, expected, "buffers skipped, duplicated or reordered");
    }

    #[test]
    fn test_put_after_close_fails_without_blocking() {
        let dispatcher: Dispatcher<Vec<u8>> = Dispatcher::new();
        dispatcher.close();

        let start = Instant::now();
        assert!(!dispatcher.put(vec![1, 2, 3]));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_close_wakes_blocked_producer() {
        let dispatcher: Arc<Dispatcher<Vec<u8>>> = Arc::new(Dispatcher::new());
        let producer_side = Arc::clone(&dispatcher);

        let producer = thread::spawn(move || producer_side.put(vec![42]));

        // Let the producer reach its wait, then close from the consumer side.
        thread::sleep(SHORT);
        dispatcher.close();
        dispatcher.close(); // idempotent

        assert!(!producer.join().unwrap(), "put must report the close");
        assert!(dispatcher.is_closed());
    }

    #[test]
    fn test_get_timeout_returns_none() {
        let dispatcher: Dispatcher<Vec<u8>> = Dispatcher::new();

        let start = Instant::now();
        assert_eq!(dispatcher.get(SHORT), None);
        assert!(start.elapsed() >= SHORT);
    }

    #[test]
    fn test_get_returns_immediately_after_close() {
        let dispatcher: Dispatcher<Vec<u8>> = Dispatcher::new();
        dispatcher.close();

        let start = Instant::now();
        assert_eq!(dispatcher.get(LONG), None);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_slot_stays_populated_until_clear() {
        let dispatcher: Arc<Dispatcher<Vec<u8>>> = Arc::new(Dispatcher::new());
        let producer_side = Arc::clone(&dispatcher);

        let producer = thread::spawn(move || producer_side.put(vec![7]));

        // Repeated gets observe the same buffer until the consumer clears it.
        assert_eq!(dispatcher.get(LONG), Some(vec![7]));
        assert_eq!(dispatcher.get(SHORT), Some(vec![7]));

        dispatcher.clear();
        assert!(producer.join().unwrap(), "producer should unblock on clear");
        assert_eq!(dispatcher.get(SHORT), None);
    }
}
