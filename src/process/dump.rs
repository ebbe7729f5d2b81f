/*!
 * Table Dump
 * Fixed-width diagnostic snapshot of every live slot, in slot order
 */

use serde::Serialize;
use std::fmt::Write;

use crate::core::types::{Pid, ProcState, Tick};
use crate::kernel::Kernel;

use super::scheduler::mhrrn_score;

/// Serializable view of one live process
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessSnapshot {
    pub slot: usize,
    pub name: String,
    pub pid: Pid,
    pub state: ProcState,
    pub queue: u8,
    pub executed_cycles: u64,
    pub creation_time: Tick,
    pub bias: i64,
    pub mhrrn: f64,
}

impl Kernel {
    /// Snapshot of every live slot, ordered by slot index
    pub fn snapshot(&self) -> Vec<ProcessSnapshot> {
        let now = self.clock.now();
        let table = self.table.lock();
        table
            .slots
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_free())
            .map(|(slot, entry)| ProcessSnapshot {
                slot,
                name: entry.name.clone(),
                pid: entry.pid,
                state: entry.state,
                queue: entry.queue.level(),
                executed_cycles: entry.executed_cycles,
                creation_time: entry.creation_time,
                bias: entry.bias,
                mhrrn: mhrrn_score(entry, now),
            })
            .collect()
    }

    /// Fixed-width text rendering of the live table
    pub fn dump_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<16} {:>6} {:<10} {:>5} {:>8} {:>9} {:>6} {:>9}",
            "name", "pid", "state", "queue", "cycles", "arrival", "bias", "mhrrn"
        );
        let _ = writeln!(out, "{}", "-".repeat(76));

        for snap in self.snapshot() {
            let _ = writeln!(
                out,
                "{:<16} {:>6} {:<10} {:>5} {:>8} {:>9} {:>6} {:>9.2}",
                snap.name,
                snap.pid,
                snap.state.label(),
                snap.queue,
                snap.executed_cycles,
                snap.creation_time,
                snap.bias,
                snap.mhrrn,
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::QueueLevel;
    use crate::kernel::Kernel;

    fn seeded_kernel() -> Kernel {
        let kernel = Kernel::new();
        {
            let mut table = kernel.table.lock();
            table.slots[0].pid = 1;
            table.slots[0].name = "init".into();
            table.slots[0].state = ProcState::Sleeping;

            table.slots[2].pid = 4;
            table.slots[2].name = "worker".into();
            table.slots[2].state = ProcState::Runnable;
            table.slots[2].queue = QueueLevel::ResponseRatio;
            table.slots[2].executed_cycles = 4;
            table.slots[2].bias = 2;
        }
        kernel
    }

    #[test]
    fn test_snapshot_skips_free_slots_and_keeps_order() {
        let kernel = seeded_kernel();
        let snaps = kernel.snapshot();
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].slot, 0);
        assert_eq!(snaps[0].pid, 1);
        assert_eq!(snaps[1].slot, 2);
        assert_eq!(snaps[1].queue, 3);
    }

    #[test]
    fn test_snapshot_mhrrn_matches_definition() {
        let kernel = seeded_kernel();
        for _ in 0..20 {
            kernel.clock.advance();
        }
        let snaps = kernel.snapshot();
        // elapsed 20, service 4, bias 2: ((20-4)/4 + 2) / 2 = 3.
        assert_eq!(snaps[1].mhrrn, 3.0);
    }

    #[test]
    fn test_dump_contains_live_rows() {
        let kernel = seeded_kernel();
        let dump = kernel.dump_table();
        assert!(dump.contains("init"));
        assert!(dump.contains("SLEEPING"));
        assert!(dump.contains("worker"));
        assert!(dump.contains("RUNNABLE"));
        // Two rows plus header and rule.
        assert_eq!(dump.lines().count(), 4);
    }

    #[test]
    fn test_snapshot_serializes() {
        let kernel = seeded_kernel();
        let json = serde_json::to_string(&kernel.snapshot()).unwrap();
        assert!(json.contains("\"pid\":1"));
        assert!(json.contains("\"state\":\"sleeping\""));
    }
}
