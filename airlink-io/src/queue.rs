//! Thread-safe FIFO queue with blocking pop.
//!
//! `SafeQueue` decouples socket I/O threads from the dispatcher. Handles are
//! cheap clones of one shared queue, so a producer and a consumer thread can
//! each own one.
//!
//! - `push` wakes exactly one waiting consumer
//! - `pop` blocks until an item is available
//! - `pop_timeout` gives up after a deadline so loops can poll a shutdown flag
//!
//! A queue created with [`SafeQueue::bounded`] blocks `push` while full.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Inner<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
}

/// Multi-producer FIFO queue shared between threads
pub struct SafeQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SafeQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SafeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SafeQueue<T> {
    /// Unbounded queue; `push` never blocks
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Bounded queue; `push` blocks while `capacity` items are queued.
    /// A capacity of 0 is treated as 1.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity.max(1)))
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(VecDeque::new()),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                capacity,
            }),
        }
    }

    /// Append an item and wake one waiting consumer
    pub fn push(&self, item: T) {
        let mut items = self.inner.items.lock();
        if let Some(cap) = self.inner.capacity {
            while items.len() >= cap {
                self.inner.not_full.wait(&mut items);
            }
        }
        items.push_back(item);
        drop(items);
        self.inner.not_empty.notify_one();
    }

    /// Remove the oldest item, blocking until one is available
    pub fn pop(&self) -> T {
        let mut items = self.inner.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                drop(items);
                self.inner.not_full.notify_one();
                return item;
            }
            self.inner.not_empty.wait(&mut items);
        }
    }

    /// Remove the oldest item, waiting at most `timeout`
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.inner.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                drop(items);
                self.inner.not_full.notify_one();
                return Some(item);
            }
            if self
                .inner
                .not_empty
                .wait_until(&mut items, deadline)
                .timed_out()
            {
                let item = items.pop_front();
                drop(items);
                if item.is_some() {
                    self.inner.not_full.notify_one();
                }
                return item;
            }
        }
    }

    /// Remove the oldest item without blocking
    pub fn try_pop(&self) -> Option<T> {
        let item = self.inner.items.lock().pop_front();
        if item.is_some() {
            self.inner.not_full.notify_one();
        }
        item
    }

    pub fn len(&self) -> usize {
        self.inner.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.lock().is_empty()
    }

    /// Capacity limit, `None` for an unbounded queue
    pub fn capacity(&self) -> Option<usize> {
        self.inner.capacity
    }
}
