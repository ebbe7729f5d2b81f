/*!
 * Tracer / Reparenting
 *
 * A tracer substitutes itself as another process's parent, remembering
 * the true parent so ancestry queries still resolve through it. Because
 * the tracer becomes the literal parent, its next wait naturally reaps
 * the traced process. The original parent is not restored if the tracer
 * exits first.
 */

use log::info;

use crate::core::errors::ProcessError;
use crate::core::types::{KernelResult, Pid, SlotIndex};
use crate::kernel::Kernel;

impl Kernel {
    /// Reparent the target under the caller, keeping the true parent in
    /// the caller's tracer fields
    pub(crate) fn trace_slot(&self, slot: SlotIndex, target_pid: Pid) -> KernelResult<()> {
        let mut table = self.table.lock();
        let target = table
            .find_by_pid(target_pid)
            .ok_or(ProcessError::NotFound(target_pid))?;

        let true_parent = table.slots[target].parent;
        table.slots[slot].is_tracer = true;
        table.slots[slot].tracer_parent = true_parent;
        table.slots[slot].traced = Some(target);
        table.slots[target].parent = Some(slot);

        info!(
            "Process {} now traces process {}",
            table.slots[slot].pid, target_pid
        );
        Ok(())
    }

    /// Pid of the caller's nearest non-tracer ancestor; `None` for the
    /// root process
    pub(crate) fn logical_parent_slot(&self, slot: SlotIndex) -> Option<Pid> {
        let table = self.table.lock();
        let mut current = table.slots[slot].parent?;
        while table.slots[current].is_tracer {
            current = table.slots[current].tracer_parent?;
        }
        Some(table.slots[current].pid)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::types::ProcState;
    use crate::kernel::Kernel;

    /// Hand-build a live slot without going through the dispatcher
    fn seed(kernel: &Kernel, slot: usize, pid: u32, parent: Option<usize>) {
        let mut table = kernel.table.lock();
        table.slots[slot].pid = pid;
        table.slots[slot].state = ProcState::Runnable;
        table.slots[slot].parent = parent;
    }

    #[test]
    fn test_trace_reparents_target() {
        let kernel = Kernel::new();
        seed(&kernel, 0, 1, None); // root
        seed(&kernel, 1, 2, Some(0)); // target
        seed(&kernel, 2, 3, Some(0)); // tracer

        kernel.trace_slot(2, 2).unwrap();

        let table = kernel.table.lock();
        assert_eq!(table.slots[1].parent, Some(2));
        assert!(table.slots[2].is_tracer);
        assert_eq!(table.slots[2].tracer_parent, Some(0));
        assert_eq!(table.slots[2].traced, Some(1));
    }

    #[test]
    fn test_logical_parent_walks_tracer_links() {
        let kernel = Kernel::new();
        seed(&kernel, 0, 1, None);
        seed(&kernel, 1, 2, Some(0));
        seed(&kernel, 2, 3, Some(0));

        kernel.trace_slot(2, 2).unwrap();

        // The literal parent is the tracer; the logical one is still
        // the root.
        assert_eq!(kernel.logical_parent_slot(1), Some(1));
        // A plain child just reports its parent.
        assert_eq!(kernel.logical_parent_slot(2), Some(1));
        // The root has no parent at all.
        assert_eq!(kernel.logical_parent_slot(0), None);
    }

    #[test]
    fn test_trace_unknown_pid_is_an_error() {
        let kernel = Kernel::new();
        seed(&kernel, 0, 1, None);
        assert!(kernel.trace_slot(0, 42).is_err());
    }
}
