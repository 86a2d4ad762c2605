use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Named mutual exclusion with a bounded acquire wait.
///
/// The finalize coordinator takes one lock per upload id. Callers that miss
/// the bounded wait get a fast `false` instead of blocking indefinitely.
/// Implementations block the calling thread, so async code drives them via
/// `spawn_blocking`.
pub trait LockService: Send + Sync {
    /// Tries to take `name`, waiting at most `wait`. Returns `false` if the
    /// lock is still held by someone else when the wait expires.
    fn try_acquire(&self, name: &str, wait: Duration) -> bool;

    /// Releases `name`. Releasing a name that is not held is a no-op.
    fn release(&self, name: &str);
}

/// Process-local lock table.
///
/// Waiters park on a condvar and wake as soon as a name is released; no
/// fixed-interval polling.
#[derive(Default)]
pub struct MemoryLockService {
    held: Mutex<HashSet<String>>,
    freed: Condvar,
}

impl MemoryLockService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockService for MemoryLockService {
    fn try_acquire(&self, name: &str, wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        let mut held = self.held.lock().unwrap();
        while held.contains(name) {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _timeout) = self.freed.wait_timeout(held, deadline - now).unwrap();
            held = guard;
        }
        held.insert(name.to_string());
        true
    }

    fn release(&self, name: &str) {
        let mut held = self.held.lock().unwrap();
        if held.remove(name) {
            self.freed.notify_all();
        }
    }
}

/// Holds a named lock and releases it on drop, so every exit path (early
/// returns and errors included) gives the lock back.
pub struct LockGuard {
    service: Arc<dyn LockService>,
    name: String,
}

impl LockGuard {
    /// Acquires `name` with a bounded wait. `None` means the lock is busy.
    pub fn acquire(
        service: Arc<dyn LockService>,
        name: impl Into<String>,
        wait: Duration,
    ) -> Option<Self> {
        let name = name.into();
        if service.try_acquire(&name, wait) {
            Some(Self { service, name })
        } else {
            None
        }
    }

    /// The lock name held by this guard.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.service.release(&self.name);
    }
}
