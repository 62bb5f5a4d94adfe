//! A bounded command queue.

use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, MutexGuard},
};

/// A bounded FIFO handing items from a producer to a pool of workers.
///
/// `push` blocks while the queue is full and `pop` blocks while it is
/// empty. After [`close`](Self::close), producers are turned away and
/// consumers drain the backlog before `pop` starts returning `None`.
pub struct Queue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> Queue<T> {
    /// Creates a queue holding at most `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().expect("queue mutex poisoned")
    }

    /// Pushes an item, blocking while the queue is full.
    ///
    /// Hands the item back if the queue has been closed.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut inner = self.inner();
        loop {
            if inner.closed {
                return Err(item);
            }
            if inner.items.len() < self.capacity {
                break;
            }
            inner = self.not_full.wait(inner).expect("queue mutex poisoned");
        }
        inner.items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Pops the oldest item, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner();
        loop {
            if let Some(item) = inner.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if inner.closed {
                return None;
            }
            inner = self.not_empty.wait(inner).expect("queue mutex poisoned");
        }
    }

    /// Closes the queue, waking every blocked producer and consumer.
    pub fn close(&self) {
        let mut inner = self.inner();
        inner.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = Queue::new(4);
        for n in 0..4 {
            queue.push(n).unwrap();
        }
        for n in 0..4 {
            assert_eq!(queue.pop(), Some(n));
        }
    }

    #[test]
    fn test_close_drains_then_ends() {
        let queue = Queue::new(4);
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.close();
        assert_eq!(queue.push(3), Err(3));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_push_blocks_while_full() {
        let queue = Arc::new(Queue::new(1));
        queue.push(0).unwrap();

        let producer = thread::spawn({
            let queue = Arc::clone(&queue);
            move || queue.push(1).unwrap()
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!producer.is_finished());

        assert_eq!(queue.pop(), Some(0));
        producer.join().unwrap();
        assert_eq!(queue.pop(), Some(1));
    }

    #[test]
    fn test_workers_drain_producer() {
        let queue = Arc::new(Queue::new(8));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                thread::spawn({
                    let queue = Arc::clone(&queue);
                    move || {
                        let mut count = 0_usize;
                        while queue.pop().is_some() {
                            count += 1;
                        }
                        count
                    }
                })
            })
            .collect();

        for n in 0..1000 {
            queue.push(n).unwrap();
        }
        queue.close();

        let total: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
        assert_eq!(total, 1000);
    }
}
