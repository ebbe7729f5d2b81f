/*!
 * Triq Kernel Library
 *
 * Process table, three-tier feedback scheduler, sleep/wakeup
 * synchronization, counting semaphores, and the tracer subsystem of a
 * teaching kernel, runnable entirely in user space. Context switching
 * is abstracted behind the [`Dispatcher`] trait; the bundled
 * [`ThreadDispatcher`] backs each process with an OS thread.
 */

pub mod core;
pub mod exec;
pub mod kernel;
pub mod process;
pub mod sem;
pub mod sync;
pub mod time;

// Re-exports
pub use crate::core::errors::{KernelError, ProcessError, SemaphoreError};
pub use crate::core::types::{Channel, CpuId, KernelResult, Pid, ProcState, QueueLevel, Tick};
pub use exec::{ContextId, Dispatcher, EntryPoint, ThreadDispatcher};
pub use kernel::{Kernel, KernelBuilder, KernelConfig};
pub use process::{Process, ProcessSnapshot};
pub use sem::SemaphoreService;
pub use sync::{Gate, SpinLock, SpinLockGuard};
pub use time::TickClock;
