/*!
 * Sleep/Wakeup Channel Protocol
 *
 * Blocking primitive underneath wait, timed sleeps, and the semaphore
 * service. The no-missed-wakeup guarantee comes from lock ordering: a
 * sleeper takes the table lock before releasing the lock that guards
 * its condition, and wakeup only ever runs under the table lock.
 */

use crate::core::types::{Channel, ProcState, SlotIndex};
use crate::kernel::Kernel;
use crate::sync::{SpinLock, SpinLockGuard};

use super::table::Table;

impl Kernel {
    /// Make every process sleeping on `channel` runnable. Delivery order
    /// is not specified; the selection algorithm alone decides who runs.
    pub fn wakeup(&self, channel: Channel) {
        let mut table = self.table.lock();
        Self::wakeup_locked(&mut table, channel);
    }

    /// Wakeup body for callers already holding the table lock
    pub(crate) fn wakeup_locked(table: &mut Table, channel: Channel) {
        for entry in table.slots.iter_mut() {
            if entry.state == ProcState::Sleeping && entry.channel == Some(channel) {
                entry.state = ProcState::Runnable;
            }
        }
    }

    /// Sleep on `channel` for a condition guarded by the table lock
    /// itself. Consumes the guard and returns a fresh one once resumed.
    pub(crate) fn sleep_on_table<'a>(
        &'a self,
        slot: SlotIndex,
        channel: Channel,
        mut table: SpinLockGuard<'a, Table>,
    ) -> SpinLockGuard<'a, Table> {
        table.slots[slot].channel = Some(channel);
        table.slots[slot].state = ProcState::Sleeping;
        self.sched(slot, table);

        let mut table = self.table.lock();
        table.slots[slot].channel = None;
        table
    }

    /// Sleep on `channel` for a condition guarded by `lock`
    ///
    /// The condition guard is only released after the table lock is
    /// held, so a concurrent wakeup cannot slip between the check and
    /// the suspension. The original guard is consumed; a fresh one on
    /// the same lock is returned once the process is resumed.
    pub(crate) fn sleep_on<'a, T: Send>(
        &self,
        slot: SlotIndex,
        channel: Channel,
        lock: &'a SpinLock<T>,
        guard: SpinLockGuard<'a, T>,
    ) -> SpinLockGuard<'a, T> {
        let mut table = self.table.lock();
        drop(guard);

        table.slots[slot].channel = Some(channel);
        table.slots[slot].state = ProcState::Sleeping;
        self.sched(slot, table);

        {
            let mut table = self.table.lock();
            table.slots[slot].channel = None;
        }
        lock.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Kernel;

    #[test]
    fn test_wakeup_is_channel_selective() {
        let kernel = Kernel::new();
        {
            let mut table = kernel.table.lock();
            for (slot, chan) in [
                (0, Channel::Proc(7)),
                (1, Channel::Proc(8)),
                (2, Channel::Semaphore(0)),
            ] {
                table.slots[slot].pid = slot as u32 + 1;
                table.slots[slot].state = ProcState::Sleeping;
                table.slots[slot].channel = Some(chan);
            }
        }

        kernel.wakeup(Channel::Proc(7));

        let table = kernel.table.lock();
        assert_eq!(table.slots[0].state, ProcState::Runnable);
        assert_eq!(table.slots[1].state, ProcState::Sleeping);
        assert_eq!(table.slots[2].state, ProcState::Sleeping);
    }

    #[test]
    fn test_wakeup_ignores_non_sleepers() {
        let kernel = Kernel::new();
        {
            let mut table = kernel.table.lock();
            table.slots[0].pid = 1;
            table.slots[0].state = ProcState::Runnable;
            table.slots[0].channel = Some(Channel::Clock);
        }

        kernel.wakeup(Channel::Clock);
        assert_eq!(kernel.table.lock().slots[0].state, ProcState::Runnable);
    }
}
