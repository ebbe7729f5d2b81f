/*!
 * Process Management
 * Table, lifecycle, scheduler core, sleep/wakeup, tracer, and dump
 */

mod dump;
mod handle;
mod lifecycle;
mod resources;
mod scheduler;
mod sleep;
mod tracer;

pub(crate) mod table;

pub use dump::ProcessSnapshot;
pub use handle::Process;
pub use resources::{AddressSpace, FileHandle, WorkingDir};
