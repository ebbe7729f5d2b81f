/*!
 * Spinlock
 *
 * Busy-wait mutual exclusion for short critical sections. Single-owner:
 * a recursive acquire by the holding thread is a protocol violation and
 * panics instead of deadlocking silently.
 */

use std::cell::UnsafeCell;
use std::hint::spin_loop;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Owner tag meaning "nobody holds the lock"
const NO_OWNER: u64 = 0;

static NEXT_THREAD_TAG: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TAG: u64 = NEXT_THREAD_TAG.fetch_add(1, Ordering::Relaxed);
}

/// Process-wide unique tag for the calling thread
#[inline]
fn current_thread_tag() -> u64 {
    THREAD_TAG.with(|tag| *tag)
}

/// Busy-waiting mutual exclusion primitive
///
/// # Performance
/// Intended for critical sections measured in nanoseconds; a holder that
/// suspends forces every contender to spin.
pub struct SpinLock<T> {
    name: &'static str,
    locked: AtomicBool,
    owner: AtomicU64,
    data: UnsafeCell<T>,
}

// Data is only reachable through the guard, which requires the lock.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Create a named lock; the name appears in violation panics
    pub const fn new(name: &'static str, data: T) -> Self {
        Self {
            name,
            locked: AtomicBool::new(false),
            owner: AtomicU64::new(NO_OWNER),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquire the lock, spinning until it is free
    ///
    /// # Panics
    /// Panics if the calling thread already holds this lock.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let tag = current_thread_tag();
        if self.owner.load(Ordering::Acquire) == tag {
            panic!("spinlock '{}': recursive acquire", self.name);
        }

        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            spin_loop();
        }
        self.owner.store(tag, Ordering::Release);

        SpinLockGuard { lock: self }
    }

    /// Whether the calling thread currently holds the lock
    pub fn holding(&self) -> bool {
        self.locked.load(Ordering::Acquire)
            && self.owner.load(Ordering::Acquire) == current_thread_tag()
    }

    /// Lock name, for diagnostics
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinLock")
            .field("name", &self.name)
            .field("locked", &self.locked.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// RAII guard; releases the lock on drop
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Guard existence proves exclusive ownership.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.owner.store(NO_OWNER, Ordering::Release);
        self.lock.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lock_guards_data() {
        let lock = SpinLock::new("test", 5u32);
        {
            let mut guard = lock.lock();
            *guard += 1;
        }
        assert_eq!(*lock.lock(), 6);
    }

    #[test]
    fn test_holding() {
        let lock = SpinLock::new("test", ());
        assert!(!lock.holding());
        let guard = lock.lock();
        assert!(lock.holding());
        drop(guard);
        assert!(!lock.holding());
    }

    #[test]
    #[should_panic(expected = "recursive acquire")]
    fn test_recursive_acquire_panics() {
        let lock = SpinLock::new("recursive", 0u32);
        let _guard = lock.lock();
        let _second = lock.lock();
    }

    #[test]
    fn test_mutual_exclusion() {
        let lock = Arc::new(SpinLock::new("counter", 0u64));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        *lock.lock() += 1;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*lock.lock(), 4000);
    }

    #[test]
    fn test_other_thread_may_acquire_after_release() {
        let lock = Arc::new(SpinLock::new("handoff", 1u32));
        {
            let _guard = lock.lock();
        }

        let lock2 = Arc::clone(&lock);
        let value = thread::spawn(move || *lock2.lock()).join().unwrap();
        assert_eq!(value, 1);
    }
}
