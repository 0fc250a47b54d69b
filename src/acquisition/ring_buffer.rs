// src/acquisition/ring_buffer.rs
//! Bounded mailbox between pipeline stages
//!
//! One producer and one consumer per instance. The producer never blocks:
//! when the buffer is full the oldest unread element is overwritten, which
//! keeps real-time stages on cadence at the cost of dropped history. The
//! consumer blocks on a condition variable until data arrives or shutdown
//! is signaled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

/// Thread-safe circular buffer with overwrite-on-full and cooperative shutdown
pub struct RingBuffer<T> {
    inner: Mutex<Inner<T>>,
    data_added: Condvar,
    shutdown: AtomicBool,
    capacity: usize,
}

struct Inner<T> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
    full: bool,
}

impl<T> Inner<T> {
    fn is_empty(&self) -> bool {
        !self.full && self.head == self.tail
    }

    fn take_tail(&mut self, capacity: usize) -> Option<T> {
        let tail = self.tail;
        let value = self.slots[tail].take();
        self.full = false;
        self.tail = (tail + 1) % capacity;
        value
    }
}

impl<T> RingBuffer<T> {
    /// Creates a buffer holding at most `capacity` elements.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be positive");

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            inner: Mutex::new(Inner {
                slots,
                head: 0,
                tail: 0,
                full: false,
            }),
            data_added: Condvar::new(),
            shutdown: AtomicBool::new(false),
            capacity,
        }
    }

    /// Adds an element, overwriting the oldest unread one when full.
    ///
    /// Never blocks. After `shutdown` this is a no-op.
    pub fn push(&self, value: T) {
        {
            let mut inner = self.inner.lock().unwrap();

            if self.shutdown.load(Ordering::Acquire) {
                return;
            }

            let head = inner.head;
            inner.slots[head] = Some(value);

            if inner.full {
                inner.tail = (inner.tail + 1) % self.capacity;
            }

            inner.head = (head + 1) % self.capacity;
            inner.full = inner.head == inner.tail;
        }
        self.data_added.notify_one();
    }

    /// Removes and returns the oldest element, blocking while the buffer
    /// is empty. Returns `None` only when the buffer is empty and shutdown
    /// has been signaled.
    pub fn consume(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        inner = self
            .data_added
            .wait_while(inner, |inner| {
                inner.is_empty() && !self.shutdown.load(Ordering::Acquire)
            })
            .unwrap();

        if inner.is_empty() {
            return None;
        }

        inner.take_tail(self.capacity)
    }

    /// Non-blocking variant of [`consume`](Self::consume).
    ///
    /// Elements buffered before shutdown remain consumable; shutdown stops
    /// production, it does not discard data.
    pub fn try_consume(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();

        if inner.is_empty() {
            return None;
        }

        inner.take_tail(self.capacity)
    }

    /// Signals shutdown and wakes every blocked consumer. Idempotent.
    pub fn shutdown(&self) {
        {
            // Taken to serialize with consumers mid-wait
            let _inner = self.inner.lock().unwrap();
            self.shutdown.store(true, Ordering::Release);
        }
        self.data_added.notify_all();
    }

    /// Empties the buffer and clears the shutdown flag.
    ///
    /// Not safe to call while consumers are active.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        for slot in inner.slots.iter_mut() {
            *slot = None;
        }
        inner.head = 0;
        inner.tail = 0;
        inner.full = false;
        self.shutdown.store(false, Ordering::Release);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.lock().unwrap().full
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of unread elements. The value may change immediately after
    /// this returns.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap();

        if inner.full {
            self.capacity
        } else if inner.head >= inner.tail {
            inner.head - inner.tail
        } else {
            self.capacity + inner.head - inner.tail
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_fifo_order() {
        let buffer = RingBuffer::new(8);
        for i in 0..5 {
            buffer.push(i);
        }
        for i in 0..5 {
            assert_eq!(buffer.try_consume(), Some(i));
        }
        assert_eq!(buffer.try_consume(), None);
    }

    #[test]
    fn test_size_tracks_unread_elements() {
        let buffer = RingBuffer::new(4);
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);

        buffer.push(1);
        buffer.push(2);
        assert_eq!(buffer.len(), 2);

        buffer.try_consume();
        assert_eq!(buffer.len(), 1);

        buffer.push(3);
        buffer.push(4);
        buffer.push(5);
        assert!(buffer.is_full());
        assert_eq!(buffer.len(), buffer.capacity());
    }

    #[test]
    fn test_overwrite_keeps_newest() {
        let capacity = 4;
        let buffer = RingBuffer::new(capacity);

        // Push capacity + 3 elements; the first 3 must be dropped
        for i in 0..(capacity + 3) {
            buffer.push(i);
        }
        assert_eq!(buffer.len(), capacity);

        for i in 3..(capacity + 3) {
            assert_eq!(buffer.try_consume(), Some(i));
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_shutdown_wakes_blocked_consumer() {
        let buffer = Arc::new(RingBuffer::<u32>::new(4));
        let consumer_buffer = buffer.clone();

        let consumer = thread::spawn(move || consumer_buffer.consume());

        thread::sleep(Duration::from_millis(50));
        let start = Instant::now();
        buffer.shutdown();

        assert_eq!(consumer.join().unwrap(), None);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_push_after_shutdown_is_noop() {
        let buffer = RingBuffer::new(4);
        buffer.push(1);
        buffer.shutdown();
        buffer.push(2);

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.try_consume(), Some(1));
        assert_eq!(buffer.try_consume(), None);
    }

    #[test]
    fn test_shutdown_does_not_discard_buffered_data() {
        let buffer = RingBuffer::new(4);
        buffer.push(1);
        buffer.push(2);
        buffer.shutdown();

        assert_eq!(buffer.consume(), Some(1));
        assert_eq!(buffer.try_consume(), Some(2));
        assert_eq!(buffer.consume(), None);
    }

    #[test]
    fn test_reset_clears_data_and_shutdown() {
        let buffer = RingBuffer::new(4);
        buffer.push(1);
        buffer.shutdown();

        buffer.reset();
        assert!(buffer.is_empty());
        assert!(!buffer.is_shutdown());

        buffer.push(7);
        assert_eq!(buffer.try_consume(), Some(7));
    }

    #[test]
    fn test_producer_consumer_threads() {
        let buffer = Arc::new(RingBuffer::new(1024));
        let producer_buffer = buffer.clone();

        let producer = thread::spawn(move || {
            for i in 0..1000u32 {
                producer_buffer.push(i);
            }
            producer_buffer.shutdown();
        });

        let mut received = Vec::new();
        while let Some(value) = buffer.consume() {
            received.push(value);
        }
        producer.join().unwrap();

        // Capacity exceeds the element count, so nothing is dropped
        assert_eq!(received.len(), 1000);
        for (i, &value) in received.iter().enumerate() {
            assert_eq!(value, i as u32);
        }
    }
}
