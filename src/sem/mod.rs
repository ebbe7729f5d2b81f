/*!
 * Counting Semaphore Service
 *
 * Fixed array of named slots built on the sleep/wakeup protocol. Plain
 * counting contract: no ownership, no fairness. Whoever re-checks first
 * after a wakeup proceeds, and any process may release.
 */

use log::{debug, info};

use crate::core::errors::{ProcessError, SemaphoreError};
use crate::core::types::{Channel, KernelResult, SlotIndex};
use crate::kernel::Kernel;
use crate::sync::SpinLock;

/// One semaphore slot
#[derive(Debug)]
pub(crate) struct SemState {
    pub value: i64,
    pub initialized: bool,
}

/// Fixed set of counting semaphores, each behind its own spinlock
pub struct SemaphoreService {
    slots: Vec<SpinLock<SemState>>,
}

impl SemaphoreService {
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count)
                .map(|_| {
                    SpinLock::new(
                        "semaphore",
                        SemState {
                            value: 0,
                            initialized: false,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn slot(&self, id: usize) -> Result<&SpinLock<SemState>, SemaphoreError> {
        self.slots.get(id).ok_or(SemaphoreError::InvalidSlot(id))
    }
}

impl Kernel {
    /// Initialize a semaphore slot exactly once
    pub fn sem_init(&self, id: usize, value: i64) -> KernelResult<()> {
        let lock = self.semaphores.slot(id)?;
        let mut sem = lock.lock();
        if sem.initialized {
            return Err(SemaphoreError::AlreadyInitialized(id).into());
        }
        sem.value = value;
        sem.initialized = true;
        info!("Semaphore {} initialized with value {}", id, value);
        Ok(())
    }

    /// Acquire one unit on behalf of the process in `slot`
    ///
    /// Re-checks the count after every wake: another waiter may have
    /// taken the released unit first. The caller's kill flag is observed
    /// at each suspension.
    pub(crate) fn sem_acquire_slot(&self, slot: SlotIndex, id: usize) -> KernelResult<()> {
        let lock = self.semaphores.slot(id)?;
        let mut sem = lock.lock();
        if !sem.initialized {
            return Err(SemaphoreError::Uninitialized(id).into());
        }

        while sem.value < 1 {
            let killed = { self.table.lock().slots[slot].killed };
            if killed {
                return Err(ProcessError::Interrupted.into());
            }
            sem = self.sleep_on(slot, Channel::Semaphore(id), lock, sem);
        }
        sem.value -= 1;
        debug!("Semaphore {} acquired, value now {}", id, sem.value);
        Ok(())
    }

    /// Release one unit and wake every sleeper on the slot
    pub fn sem_release(&self, id: usize) -> KernelResult<()> {
        let lock = self.semaphores.slot(id)?;
        let mut sem = lock.lock();
        if !sem.initialized {
            return Err(SemaphoreError::Uninitialized(id).into());
        }
        sem.value += 1;
        debug!("Semaphore {} released, value now {}", id, sem.value);
        self.wakeup(Channel::Semaphore(id));
        Ok(())
    }

    /// Current count, for diagnostics
    pub fn sem_value(&self, id: usize) -> KernelResult<i64> {
        let lock = self.semaphores.slot(id)?;
        let sem = lock.lock();
        if !sem.initialized {
            return Err(SemaphoreError::Uninitialized(id).into());
        }
        Ok(sem.value)
    }
}
