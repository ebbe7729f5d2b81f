/*!
 * Process Lifecycle
 *
 * Allocation, fork, exit, wait, and kill over the process table. Only
 * this module creates or destroys slots; the scheduler core owns the
 * Runnable/Running transitions.
 */

use log::{debug, info, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::core::errors::ProcessError;
use crate::core::limits::PROC_NAME_MAX;
use crate::core::types::{Channel, KernelResult, Pid, ProcState, QueueLevel, SlotIndex};
use crate::kernel::Kernel;

use super::handle::Process;
use super::resources::{AddressSpace, FileHandle, WorkingDir};

/// Unwind payload used by `Process::terminate` after the exit protocol
/// has already run
pub(crate) struct ExitUnwind;

/// Initial address-space size handed to the root process
const ROOT_ADDR_SPACE: usize = 4096;

impl Kernel {
    /// Bootstrap the root process. Its body runs like any other process;
    /// when the body returns the root reaps orphans until none remain,
    /// then requests shutdown. The root must never terminate.
    ///
    /// # Panics
    /// Panics if a root process was already started.
    pub fn start<F>(&self, body: F) -> KernelResult<Pid>
    where
        F: FnOnce(&Process) + Send + 'static,
    {
        if self.table.lock().init_slot.is_some() {
            panic!("kernel: root process already started");
        }
        self.spawn_slot(None, "init", body)
    }

    /// Create a new process. With a parent, this is fork: the parent's
    /// address space is duplicated and its file handles and working
    /// directory are shared by reference count. Without one, this is the
    /// root bootstrap.
    pub(crate) fn spawn_slot<F>(
        &self,
        parent: Option<SlotIndex>,
        name: &str,
        body: F,
    ) -> KernelResult<Pid>
    where
        F: FnOnce(&Process) + Send + 'static,
    {
        let now = self.clock.now();

        // Claim a slot and inherit resources in one critical section so
        // a failed fork leaves nothing behind.
        let (slot, pid) = {
            let mut table = self.table.lock();
            let slot = table.find_unused().ok_or(ProcessError::TableFull)?;
            let pid = table.fresh_pid();

            let (files, cwd, addr_space) = match parent {
                Some(parent_slot) => {
                    let parent_entry = &table.slots[parent_slot];
                    let addr_space = match parent_entry.addr_space.as_ref() {
                        Some(space) => Some(space.duplicate()?),
                        None => None,
                    };
                    (
                        parent_entry.files.clone(),
                        parent_entry.cwd.clone(),
                        addr_space,
                    )
                }
                None => (
                    vec![Arc::new(FileHandle::new("console"))],
                    Some(Arc::new(WorkingDir::new("/"))),
                    Some(AddressSpace::new(ROOT_ADDR_SPACE)),
                ),
            };

            let entry = &mut table.slots[slot];
            entry.pid = pid;
            entry.name = truncated(name);
            entry.state = ProcState::Embryo;
            entry.queue = QueueLevel::LatestCreated;
            entry.creation_time = now;
            entry.waiting_time = 0;
            entry.last_run_time = now;
            entry.executed_cycles = crate::core::limits::INITIAL_CYCLES;
            entry.bias = 0;
            entry.parent = parent;
            entry.files = files;
            entry.cwd = cwd;
            entry.addr_space = addr_space;

            if parent.is_none() {
                table.init_slot = Some(slot);
            }
            (slot, pid)
        };

        // Context allocation happens outside the table lock; on failure
        // the slot goes back to the free pool.
        let is_root = parent.is_none();
        let kernel = self.clone();
        let entry_fn = Box::new(move || {
            kernel.run_process(slot, pid, is_root, body);
        });

        let Some(ctx) = self.dispatcher.allocate(entry_fn) else {
            let mut table = self.table.lock();
            table.slots[slot].reclaim();
            if is_root {
                table.init_slot = None;
            }
            return Err(ProcessError::ContextExhausted.into());
        };

        let mut table = self.table.lock();
        table.slots[slot].context = Some(ctx);
        table.slots[slot].state = ProcState::Runnable;
        info!(
            "Process {} '{}' spawned (parent: {:?})",
            pid,
            table.slots[slot].name,
            parent.map(|p| table.slots[p].pid)
        );
        Ok(pid)
    }

    /// Body wrapper running inside the process's own context
    fn run_process<F>(&self, slot: SlotIndex, pid: Pid, is_root: bool, body: F)
    where
        F: FnOnce(&Process) + Send + 'static,
    {
        debug!("Process {} first scheduled", pid);
        let process = Process::new(self.clone(), slot, pid);

        let outcome = catch_unwind(AssertUnwindSafe(|| body(&process)));
        match outcome {
            Ok(()) if is_root => self.root_epilogue(slot, &process),
            Ok(()) => self.exit_slot(slot),
            Err(payload) => {
                if payload.downcast_ref::<ExitUnwind>().is_some() {
                    // terminate() already ran the exit protocol.
                    return;
                }
                warn!("Process {} body panicked; treating as exit", pid);
                self.exit_slot(slot);
            }
        }
    }

    /// After the root body returns: reap orphans until no children are
    /// left, then stop the machine. The root context parks forever.
    fn root_epilogue(&self, slot: SlotIndex, process: &Process) {
        use crate::core::errors::KernelError;

        debug!("Root process entering reaper loop");
        loop {
            match process.wait() {
                Ok(child) => debug!("Root reaped orphan {}", child),
                Err(KernelError::Process(ProcessError::Interrupted)) => {
                    // The root never terminates; a kill against it is
                    // dropped so orphans still get reaped.
                    self.table.lock().slots[slot].killed = false;
                }
                Err(_) => break,
            }
        }
        info!("Root process idle; requesting shutdown");
        self.shutdown();

        let mut table = self.table.lock();
        let pid = table.slots[slot].pid;
        table.slots[slot].state = ProcState::Sleeping;
        table.slots[slot].channel = Some(Channel::Proc(pid));
        let cpu = table.cpu_of(slot).expect("root not on a cpu");
        table.clear_running_slot(slot);
        self.dispatcher.handoff(cpu);
    }

    /// Exit protocol. Releases file handles and the working directory,
    /// wakes the parent, hands abandoned children to the root, and turns
    /// the slot into a zombie. The caller's context never runs again.
    ///
    /// # Panics
    /// Panics if the root process attempts to exit.
    pub(crate) fn exit_slot(&self, slot: SlotIndex) {
        let mut table = self.table.lock();
        if table.init_slot == Some(slot) {
            panic!("init exiting");
        }
        let pid = table.slots[slot].pid;

        table.slots[slot].files.clear();
        table.slots[slot].cwd = None;

        // Parent might be sleeping in wait.
        let parent = table.slots[slot]
            .parent
            .expect("non-root process without parent");
        let parent_pid = table.slots[parent].pid;
        Self::wakeup_locked(&mut table, Channel::Proc(parent_pid));

        // Pass abandoned children to the root.
        let init = table.init_slot.expect("exit before root bootstrap");
        let init_pid = table.slots[init].pid;
        let mut orphaned_zombie = false;
        for child in 0..table.slots.len() {
            if table.slots[child].parent == Some(slot) {
                table.slots[child].parent = Some(init);
                if table.slots[child].state == ProcState::Zombie {
                    orphaned_zombie = true;
                }
            }
        }
        if orphaned_zombie {
            Self::wakeup_locked(&mut table, Channel::Proc(init_pid));
        }

        info!("Process {} exited", pid);
        table.slots[slot].state = ProcState::Zombie;
        let cpu = table.cpu_of(slot).expect("exit: process not on a cpu");
        table.clear_running_slot(slot);
        self.dispatcher.handoff(cpu);
        // Table guard drops here; resources beyond files and cwd stay
        // allocated until the parent reaps the zombie.
    }

    /// Wait for a child to exit and reap it
    pub(crate) fn wait_slot(&self, slot: SlotIndex) -> KernelResult<Pid> {
        let mut table = self.table.lock();
        loop {
            let mut have_children = false;
            let mut zombie = None;
            for child in 0..table.slots.len() {
                let entry = &table.slots[child];
                if entry.is_free() || entry.parent != Some(slot) {
                    continue;
                }
                have_children = true;
                if entry.state == ProcState::Zombie {
                    zombie = Some(child);
                    break;
                }
            }

            if let Some(child) = zombie {
                let pid = table.slots[child].pid;
                let ctx = table.slots[child].context.take();
                table.slots[child].reclaim();
                drop(table);
                // Join the retired context outside the table lock.
                if let Some(ctx) = ctx {
                    self.dispatcher.release(ctx);
                }
                debug!("Reaped child {}", pid);
                return Ok(pid);
            }

            let me = &table.slots[slot];
            if !have_children {
                return Err(ProcessError::NoChildren(me.pid).into());
            }
            if me.killed {
                return Err(ProcessError::Interrupted.into());
            }

            // Wait for a child to exit; exit wakes this channel.
            let channel = Channel::Proc(me.pid);
            table = self.sleep_on_table(slot, channel, table);
        }
    }

    /// Mark a process for cooperative termination; a sleeper is forced
    /// runnable so it can observe the flag at its next checkpoint
    pub fn kill(&self, pid: Pid) -> KernelResult<()> {
        let mut table = self.table.lock();
        let slot = table
            .find_by_pid(pid)
            .ok_or(ProcessError::NotFound(pid))?;
        let entry = &mut table.slots[slot];
        entry.killed = true;
        if entry.state == ProcState::Sleeping {
            entry.state = ProcState::Runnable;
        }
        info!("Process {} killed", pid);
        Ok(())
    }

    /// Timed sleep: suspend until `ticks` more clock ticks have passed,
    /// or until killed
    pub(crate) fn sleep_ticks_slot(&self, slot: SlotIndex, ticks: u64) -> KernelResult<()> {
        let lock = self.clock.counter();
        let mut counter = lock.lock();
        let deadline = counter.saturating_add(ticks);
        while *counter < deadline {
            let killed = { self.table.lock().slots[slot].killed };
            if killed {
                return Err(ProcessError::Interrupted.into());
            }
            counter = self.sleep_on(slot, Channel::Clock, lock, counter);
        }
        Ok(())
    }
}

/// Clamp a process name to the table's name limit
fn truncated(name: &str) -> String {
    name.chars().take(PROC_NAME_MAX).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Kernel;

    #[test]
    #[should_panic(expected = "init exiting")]
    fn test_root_exit_is_fatal() {
        let kernel = Kernel::new();
        kernel.start(|_| {}).unwrap();
        let init_slot = kernel.table.lock().init_slot.unwrap();
        kernel.exit_slot(init_slot);
    }

    #[test]
    #[should_panic(expected = "root process already started")]
    fn test_double_bootstrap_is_fatal() {
        let kernel = Kernel::new();
        kernel.start(|_| {}).unwrap();
        let _ = kernel.start(|_| {});
    }

    #[test]
    fn test_name_truncation() {
        assert_eq!(truncated("short"), "short");
        let long = "a".repeat(40);
        assert_eq!(truncated(&long).len(), PROC_NAME_MAX);
    }

    #[test]
    fn test_kill_unknown_pid_is_an_error() {
        let kernel = Kernel::new();
        assert!(kernel.kill(999).is_err());
    }
}
