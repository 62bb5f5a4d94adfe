use std::sync::{Condvar, Mutex, MutexGuard};

/// Acquisition mode of an [`RwLock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Reader access. Any number of threads may hold the lock at once.
    Shared,
    /// Writer access. A single thread holds the lock, excluding readers.
    Unique,
}

/// A reader/writer lock decoupled from the data it guards.
///
/// Unlike `std::sync::RwLock`, acquisition and release are separate calls
/// and release is unmoded, so a lock can be taken in one function and
/// released in another without threading a guard through. Waiting writers
/// block new readers, so writers make progress under sustained reader load.
///
/// Releasing a lock the thread does not hold is a protocol violation; debug
/// builds assert on it where it is detectable.
pub struct RwLock {
    state: Mutex<State>,
    readers: Condvar,
    writers: Condvar,
}

struct State {
    readers: usize,
    writer: bool,
    waiting_writers: usize,
}

impl RwLock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(State {
                readers: 0,
                writer: false,
                waiting_writers: 0,
            }),
            readers: Condvar::new(),
            writers: Condvar::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A poisoned state mutex means a thread panicked mid-protocol;
        // the lock state is unrecoverable.
        self.state.lock().expect("rw-lock state poisoned")
    }

    /// Acquires the lock with the given access, blocking until available.
    pub fn lock(&self, access: Access) {
        let mut state = self.state();
        match access {
            Access::Shared => {
                while state.writer || state.waiting_writers > 0 {
                    state = self.readers.wait(state).expect("rw-lock state poisoned");
                }
                state.readers += 1;
            }
            Access::Unique => {
                state.waiting_writers += 1;
                while state.writer || state.readers > 0 {
                    state = self.writers.wait(state).expect("rw-lock state poisoned");
                }
                state.waiting_writers -= 1;
                state.writer = true;
            }
        }
    }

    /// Attempts to acquire the lock without blocking.
    #[must_use]
    pub fn try_lock(&self, access: Access) -> bool {
        let mut state = self.state();
        match access {
            Access::Shared => {
                if state.writer || state.waiting_writers > 0 {
                    return false;
                }
                state.readers += 1;
            }
            Access::Unique => {
                if state.writer || state.readers > 0 {
                    return false;
                }
                state.writer = true;
            }
        }
        true
    }

    /// Releases the lock, whichever access it was taken with.
    pub fn unlock(&self) {
        let mut state = self.state();
        if state.writer {
            state.writer = false;
        } else {
            debug_assert!(state.readers > 0, "unlocking an rw-lock that is not held");
            state.readers = state.readers.saturating_sub(1);
        }
        if state.readers == 0 && state.waiting_writers > 0 {
            self.writers.notify_one();
        } else if state.waiting_writers == 0 {
            self.readers.notify_all();
        }
    }
}

impl Default for RwLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_shared_holders_coexist() {
        let lock = RwLock::new();
        lock.lock(Access::Shared);
        assert!(lock.try_lock(Access::Shared));
        lock.unlock();
        lock.unlock();
    }

    #[test]
    fn test_unique_excludes_all() {
        let lock = RwLock::new();
        lock.lock(Access::Unique);
        assert!(!lock.try_lock(Access::Shared));
        assert!(!lock.try_lock(Access::Unique));
        lock.unlock();
        assert!(lock.try_lock(Access::Unique));
        lock.unlock();
    }

    #[test]
    fn test_shared_excludes_unique() {
        let lock = RwLock::new();
        lock.lock(Access::Shared);
        assert!(!lock.try_lock(Access::Unique));
        lock.unlock();
        assert!(lock.try_lock(Access::Unique));
        lock.unlock();
    }

    #[test]
    fn test_writer_blocks_until_readers_leave() {
        let lock = Arc::new(RwLock::new());
        let value = Arc::new(AtomicUsize::new(0));

        lock.lock(Access::Shared);
        let writer = thread::spawn({
            let lock = Arc::clone(&lock);
            let value = Arc::clone(&value);
            move || {
                lock.lock(Access::Unique);
                value.store(1, Ordering::SeqCst);
                lock.unlock();
            }
        });

        // The writer cannot proceed while the reader is inside.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(value.load(Ordering::SeqCst), 0);

        lock.unlock();
        writer.join().unwrap();
        assert_eq!(value.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_writers_make_progress_under_readers() {
        let lock = Arc::new(RwLock::new());
        let writes = Arc::new(AtomicUsize::new(0));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                thread::spawn({
                    let lock = Arc::clone(&lock);
                    let writes = Arc::clone(&writes);
                    move || {
                        while writes.load(Ordering::SeqCst) < 10 {
                            lock.lock(Access::Shared);
                            lock.unlock();
                        }
                    }
                })
            })
            .collect();

        for _ in 0..10 {
            lock.lock(Access::Unique);
            writes.fetch_add(1, Ordering::SeqCst);
            lock.unlock();
        }

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(writes.load(Ordering::SeqCst), 10);
    }
}
