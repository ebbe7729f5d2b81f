/*!
 * Process Handle
 *
 * Capability passed to every process body. All operations act on behalf
 * of the owning process; kernel-wide operations live on [`Kernel`],
 * reachable through [`Process::kernel`].
 */

use std::panic::resume_unwind;

use crate::core::types::{KernelResult, Pid, SlotIndex, Tick};
use crate::kernel::Kernel;

use super::lifecycle::ExitUnwind;

/// Handle to the calling process
pub struct Process {
    kernel: Kernel,
    slot: SlotIndex,
    pid: Pid,
}

impl Process {
    pub(crate) fn new(kernel: Kernel, slot: SlotIndex, pid: Pid) -> Self {
        Self { kernel, slot, pid }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The kernel this process belongs to
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Fork a child running `body`. Returns the child's pid; the caller
    /// keeps running.
    pub fn spawn<F>(&self, name: &str, body: F) -> KernelResult<Pid>
    where
        F: FnOnce(&Process) + Send + 'static,
    {
        self.kernel.spawn_slot(Some(self.slot), name, body)
    }

    /// Block until a child exits, then reap it and return its pid
    pub fn wait(&self) -> KernelResult<Pid> {
        self.kernel.wait_slot(self.slot)
    }

    /// Give up the CPU for one scheduling round
    pub fn yield_now(&self) {
        self.kernel.yield_slot(self.slot);
    }

    /// Suspend until `ticks` clock ticks have passed. Interrupted early
    /// if the process is killed.
    pub fn sleep_ticks(&self, ticks: Tick) -> KernelResult<()> {
        self.kernel.sleep_ticks_slot(self.slot, ticks)
    }

    /// Whether this process has been marked for termination
    pub fn killed(&self) -> bool {
        self.kernel.table.lock().slots[self.slot].killed
    }

    /// Exit immediately; never returns. Fatal when called by the root
    /// process. A process body that simply returns exits the same way.
    pub fn terminate(&self) -> ! {
        self.kernel.exit_slot(self.slot);
        // Unwind the body without running it any further; the wrapper
        // recognizes the payload and skips the duplicate exit.
        resume_unwind(Box::new(ExitUnwind))
    }

    /// Become the tracer of `pid`, substituting this process as its
    /// parent
    pub fn trace(&self, pid: Pid) -> KernelResult<()> {
        self.kernel.trace_slot(self.slot, pid)
    }

    /// Pid of the nearest non-tracer ancestor; `None` for the root
    pub fn logical_parent(&self) -> Option<Pid> {
        self.kernel.logical_parent_slot(self.slot)
    }

    /// Acquire one unit from a counting semaphore, blocking while the
    /// count is exhausted
    pub fn sem_acquire(&self, id: usize) -> KernelResult<()> {
        self.kernel.sem_acquire_slot(self.slot, id)
    }

    /// Release one unit to a counting semaphore
    pub fn sem_release(&self, id: usize) -> KernelResult<()> {
        self.kernel.sem_release(id)
    }
}
