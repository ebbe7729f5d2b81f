/*!
 * Scheduler Core
 *
 * Three-tier feedback selection with starvation promotion. Every round
 * runs two passes under the table lock: aging, then selection in strict
 * tier order. Tier 1 is longest-idle round robin, tier 2 picks the
 * latest-created runnable process, tier 3 picks the highest modified
 * response ratio. Ties always break toward the lowest slot index.
 */

use log::{debug, info};

use crate::core::errors::ProcessError;
use crate::core::types::{CpuId, KernelResult, Pid, ProcState, QueueLevel, SlotIndex, Tick};
use crate::kernel::Kernel;
use crate::sync::SpinLockGuard;

use super::table::{ProcessEntry, Table};

/// Modified response ratio of one process at `now`
///
/// `ratio = (elapsed - service) / service`, averaged with the manual
/// bias term. Service received is the executed cycle count, never zero.
pub(crate) fn mhrrn_score(entry: &ProcessEntry, now: Tick) -> f64 {
    let elapsed = now.saturating_sub(entry.creation_time) as f64;
    let service = entry.executed_cycles as f64;
    let response_ratio = (elapsed - service) / service;
    (response_ratio + entry.bias as f64) / 2.0
}

/// Aging pass: one waiting tick per round for every runnable process
/// below tier 1; past the starvation threshold the process is promoted
/// and its wait timer cleared
pub(crate) fn age_runnable(table: &mut Table, threshold: Tick) {
    for entry in table.slots.iter_mut() {
        if entry.queue == QueueLevel::RoundRobin {
            continue;
        }
        if entry.state != ProcState::Runnable {
            continue;
        }
        if entry.waiting_time > threshold {
            entry.waiting_time = 0;
            entry.queue = QueueLevel::RoundRobin;
            debug!("Process {} promoted to queue 1 by aging", entry.pid);
            continue;
        }
        entry.waiting_time += 1;
    }
}

/// Tier 1: runnable process idle the longest
fn rr_next(table: &Table, now: Tick) -> Option<SlotIndex> {
    let mut best: Option<(SlotIndex, Tick)> = None;
    for (slot, entry) in table.slots.iter().enumerate() {
        if entry.state != ProcState::Runnable || entry.queue != QueueLevel::RoundRobin {
            continue;
        }
        let idle = now.saturating_sub(entry.last_run_time);
        if best.map_or(true, |(_, max)| idle > max) {
            best = Some((slot, idle));
        }
    }
    best.map(|(slot, _)| slot)
}

/// Tier 2: latest created, first chosen
fn lcfc_next(table: &Table) -> Option<SlotIndex> {
    let mut best: Option<(SlotIndex, Tick)> = None;
    for (slot, entry) in table.slots.iter().enumerate() {
        if entry.state != ProcState::Runnable || entry.queue != QueueLevel::LatestCreated {
            continue;
        }
        if best.map_or(true, |(_, max)| entry.creation_time > max) {
            best = Some((slot, entry.creation_time));
        }
    }
    best.map(|(slot, _)| slot)
}

/// Tier 3: highest modified response ratio
fn mhrrn_next(table: &Table, now: Tick) -> Option<SlotIndex> {
    let mut best: Option<(SlotIndex, f64)> = None;
    for (slot, entry) in table.slots.iter().enumerate() {
        if entry.state != ProcState::Runnable || entry.queue != QueueLevel::ResponseRatio {
            continue;
        }
        let score = mhrrn_score(entry, now);
        if best.map_or(true, |(_, max)| score > max) {
            best = Some((slot, score));
        }
    }
    best.map(|(slot, _)| slot)
}

/// One selection round: first non-empty tier wins
pub(crate) fn select_next(table: &Table, now: Tick) -> Option<SlotIndex> {
    rr_next(table, now)
        .or_else(|| lcfc_next(table))
        .or_else(|| mhrrn_next(table, now))
}

impl Kernel {
    /// One scheduler loop; returns once shutdown is requested and
    /// nothing is left to run
    pub(crate) fn run_cpu(&self, cpu: CpuId) {
        info!("Scheduler loop {} started", cpu);
        loop {
            // Tick counters live under their own lock, read before the
            // table lock per the lock order.
            let now = self.clock.now();

            let mut table = self.table.lock();
            age_runnable(&mut table, self.config.starvation_threshold);

            match select_next(&table, now) {
                Some(slot) => {
                    table.slots[slot].waiting_time = 0;
                    table.set_running(cpu, slot);
                    debug_assert!(table.running_count() <= self.config.cpus);
                    let ctx = table.slots[slot]
                        .context
                        .expect("runnable process without context");
                    drop(table);

                    // Control comes back once the process has changed
                    // its own state away from Running.
                    self.dispatcher.resume(cpu, ctx);
                }
                None => {
                    drop(table);
                    if self.is_shutdown() {
                        break;
                    }
                    // Idle round; an external timer keeps ticks moving.
                    std::thread::yield_now();
                }
            }
        }
        info!("Scheduler loop {} stopped", cpu);
    }

    /// Switch from a process back to the scheduler loop that resumed it
    ///
    /// The caller must already have moved the process out of Running.
    /// Consumes the table guard: the hand-off signal is raised under the
    /// lock so no loop can re-select the slot before its old marker is
    /// gone.
    pub(crate) fn sched(&self, slot: SlotIndex, mut table: SpinLockGuard<'_, Table>) {
        let entry = &table.slots[slot];
        if entry.state == ProcState::Running {
            panic!("sched: process {} still running", entry.pid);
        }
        let ctx = entry.context.expect("sched: process without context");
        let cpu = table.cpu_of(slot).expect("sched: process not on a cpu");

        table.clear_running_slot(slot);
        self.dispatcher.handoff(cpu);
        drop(table);

        self.dispatcher.yield_back(ctx);
    }

    /// Cooperative yield: give up the CPU for one scheduling round
    pub(crate) fn yield_slot(&self, slot: SlotIndex) {
        let now = self.clock.now();
        let mut table = self.table.lock();
        let entry = &mut table.slots[slot];
        entry.state = ProcState::Runnable;
        entry.last_run_time = now;
        entry.executed_cycles += 1;
        self.sched(slot, table);
    }

    /// Move a process to another feedback queue, clearing its wait timer
    pub fn set_queue(&self, pid: Pid, level: u8) -> KernelResult<()> {
        let queue = QueueLevel::from_level(level)?;
        let mut table = self.table.lock();
        let slot = table
            .find_by_pid(pid)
            .ok_or(ProcessError::NotFound(pid))?;
        let entry = &mut table.slots[slot];
        entry.queue = queue;
        entry.waiting_time = 0;
        info!("Process {} moved to queue {}", pid, level);
        Ok(())
    }

    /// Set one process's MHRRN bias term
    pub fn set_bias(&self, pid: Pid, bias: i64) -> KernelResult<()> {
        let mut table = self.table.lock();
        let slot = table
            .find_by_pid(pid)
            .ok_or(ProcessError::NotFound(pid))?;
        table.slots[slot].bias = bias;
        info!("Process {} bias set to {}", pid, bias);
        Ok(())
    }

    /// Set the MHRRN bias term for every live process
    pub fn set_bias_all(&self, bias: i64) {
        let mut table = self.table.lock();
        for entry in table.slots.iter_mut() {
            if !entry.is_free() {
                entry.bias = bias;
            }
        }
        info!("All live processes bias set to {}", bias);
    }
}
