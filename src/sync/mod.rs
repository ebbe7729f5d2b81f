/*!
 * Synchronization Primitives
 * Spinlock and the gate used for context hand-off
 */

pub mod gate;
pub mod spinlock;

pub use gate::Gate;
pub use spinlock::{SpinLock, SpinLockGuard};
