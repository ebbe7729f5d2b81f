/*!
 * Dispatcher Trait
 *
 * The opaque "transfer control, regain control later" primitive the
 * scheduler core is built on. A platform collaborator supplies the
 * mechanics; the kernel only ever sees context handles and CPU ids.
 */

use crate::core::types::CpuId;

/// Opaque handle to one execution context
pub type ContextId = usize;

/// Entry function bound to a freshly allocated context
pub type EntryPoint = Box<dyn FnOnce() + Send + 'static>;

/// Control-transfer primitive between scheduler loops and contexts
///
/// The hand-off back to the scheduler is addressed by CPU, mirroring a
/// per-CPU scheduler context: `handoff(cpu)` releases exactly the loop
/// that dispatched the caller, so a context re-selected by another CPU
/// in the same instant cannot steal the signal. `handoff` must happen
/// while the scheduler's bookkeeping lock is held; `yield_back` then
/// parks the context until its next `resume`. An exiting context calls
/// `handoff` alone and never parks.
pub trait Dispatcher: Send + Sync + 'static {
    /// Allocate context memory for a new process and bind its entry
    /// function. Returns `None` when context memory is exhausted.
    ///
    /// The entry function is not run until the first `resume`.
    fn allocate(&self, entry: EntryPoint) -> Option<ContextId>;

    /// Hand `cpu` to the context; blocks the calling scheduler loop
    /// until the context calls `handoff(cpu)`
    fn resume(&self, cpu: CpuId, ctx: ContextId);

    /// Signal that the CPU is free again. Non-blocking; the signal is
    /// buffered until the blocked `resume` on that CPU consumes it
    fn handoff(&self, cpu: CpuId);

    /// Park the context until the next `resume`. Must follow `handoff`
    fn yield_back(&self, ctx: ContextId);

    /// Reclaim a retired context's resources; called by the parent's
    /// reap, not by the exiting context itself
    fn release(&self, ctx: ContextId);
}
