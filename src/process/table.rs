/*!
 * Process Table
 *
 * Fixed-capacity arena of process control blocks. The table owns every
 * slot; parent and tracer links are slot indices, valid only for lookup.
 * One table-wide spinlock guards all scheduling state, including the
 * per-CPU "currently running" markers.
 */

use std::sync::Arc;

use crate::core::limits::INITIAL_CYCLES;
use crate::core::types::{Channel, CpuId, Pid, ProcState, QueueLevel, SlotIndex, Tick};
use crate::exec::ContextId;

use super::resources::{AddressSpace, FileHandle, WorkingDir};

/// One process control block
#[derive(Debug, Clone)]
pub struct ProcessEntry {
    /// Unique while live; 0 means the slot is free
    pub pid: Pid,
    pub name: String,
    pub state: ProcState,
    pub queue: QueueLevel,

    // Tick snapshots driving the three selection policies
    pub creation_time: Tick,
    pub waiting_time: Tick,
    pub last_run_time: Tick,
    /// Scheduling quanta granted so far (service received)
    pub executed_cycles: u64,
    /// Manually settable MHRRN bias term
    pub bias: i64,

    // Weak relations into the arena; the table owns every slot
    pub parent: Option<SlotIndex>,
    pub is_tracer: bool,
    pub tracer_parent: Option<SlotIndex>,
    pub traced: Option<SlotIndex>,

    /// What a sleeping process is waiting for; None otherwise
    pub channel: Option<Channel>,
    /// Cooperative cancellation flag
    pub killed: bool,

    // Exclusively owned resources, released on reclamation
    pub context: Option<ContextId>,
    pub files: Vec<Arc<FileHandle>>,
    pub cwd: Option<Arc<WorkingDir>>,
    pub addr_space: Option<AddressSpace>,
}

impl ProcessEntry {
    /// A free slot
    pub fn unused() -> Self {
        Self {
            pid: 0,
            name: String::new(),
            state: ProcState::Unused,
            queue: QueueLevel::LatestCreated,
            creation_time: 0,
            waiting_time: 0,
            last_run_time: 0,
            executed_cycles: INITIAL_CYCLES,
            bias: 0,
            parent: None,
            is_tracer: false,
            tracer_parent: None,
            traced: None,
            channel: None,
            killed: false,
            context: None,
            files: Vec::new(),
            cwd: None,
            addr_space: None,
        }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.state == ProcState::Unused
    }

    /// Return the slot to the free pool, dropping identity and resources
    pub fn reclaim(&mut self) {
        *self = Self::unused();
    }
}

/// The arena plus the scheduling state it guards
#[derive(Debug)]
pub struct Table {
    pub slots: Vec<ProcessEntry>,
    pub next_pid: Pid,
    /// Per-CPU running process, at most one each
    pub cpu_current: Vec<Option<SlotIndex>>,
    /// Root process slot, set once at bootstrap
    pub init_slot: Option<SlotIndex>,
}

impl Table {
    pub fn new(capacity: usize, cpus: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| ProcessEntry::unused()).collect(),
            next_pid: 1,
            cpu_current: vec![None; cpus],
            init_slot: None,
        }
    }

    /// First free slot, lowest index
    pub fn find_unused(&self) -> Option<SlotIndex> {
        self.slots.iter().position(ProcessEntry::is_free)
    }

    /// Slot of a live process by pid
    pub fn find_by_pid(&self, pid: Pid) -> Option<SlotIndex> {
        self.slots
            .iter()
            .position(|entry| !entry.is_free() && entry.pid == pid)
    }

    /// Take the next unique pid
    pub fn fresh_pid(&mut self) -> Pid {
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }

    /// Mark `slot` as the process running on `cpu`
    ///
    /// # Panics
    /// Panics if the slot is already running; dispatching the same
    /// process twice is unrecoverable.
    pub fn set_running(&mut self, cpu: CpuId, slot: SlotIndex) {
        if self.slots[slot].state == ProcState::Running {
            panic!("scheduler: process {} already running", self.slots[slot].pid);
        }
        debug_assert!(self.cpu_current[cpu].is_none());
        self.slots[slot].state = ProcState::Running;
        self.cpu_current[cpu] = Some(slot);
    }

    /// CPU whose marker points at `slot`, if any
    pub fn cpu_of(&self, slot: SlotIndex) -> Option<CpuId> {
        self.cpu_current.iter().position(|c| *c == Some(slot))
    }

    /// Drop any per-CPU marker still pointing at `slot`
    ///
    /// Called while the yielding or exiting process still holds the
    /// table lock, so no other loop can select the slot in between.
    pub fn clear_running_slot(&mut self, slot: SlotIndex) {
        for current in self.cpu_current.iter_mut() {
            if *current == Some(slot) {
                *current = None;
            }
        }
    }

    /// Number of slots currently in the Running state
    pub fn running_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.state == ProcState::Running)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(4, 1)
    }

    #[test]
    fn test_new_table_is_all_free() {
        let table = table();
        assert_eq!(table.find_unused(), Some(0));
        assert!(table.slots.iter().all(ProcessEntry::is_free));
    }

    #[test]
    fn test_find_by_pid_skips_free_slots() {
        let mut table = table();
        // A reclaimed slot keeps pid 0; a stale scan must not match it.
        assert_eq!(table.find_by_pid(0), None);

        table.slots[2].pid = 7;
        table.slots[2].state = ProcState::Runnable;
        assert_eq!(table.find_by_pid(7), Some(2));
        assert_eq!(table.find_by_pid(8), None);
    }

    #[test]
    fn test_fresh_pid_is_unique() {
        let mut table = table();
        let a = table.fresh_pid();
        let b = table.fresh_pid();
        assert!(a > 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_reclaim_clears_identity() {
        let mut table = table();
        let entry = &mut table.slots[1];
        entry.pid = 5;
        entry.state = ProcState::Zombie;
        entry.killed = true;
        entry.name = "child".into();

        entry.reclaim();
        assert!(entry.is_free());
        assert_eq!(entry.pid, 0);
        assert!(!entry.killed);
        assert!(entry.name.is_empty());
    }

    #[test]
    fn test_running_markers() {
        let mut table = Table::new(4, 2);
        table.slots[0].state = ProcState::Runnable;
        table.set_running(1, 0);
        assert_eq!(table.cpu_current[1], Some(0));
        assert_eq!(table.cpu_of(0), Some(1));
        assert_eq!(table.running_count(), 1);

        table.clear_running_slot(0);
        assert_eq!(table.cpu_current[1], None);
        assert_eq!(table.cpu_of(0), None);
    }
}
