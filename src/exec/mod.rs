/*!
 * Execution Platform
 * Context-transfer abstraction and the thread-backed implementation
 */

pub mod dispatcher;
pub mod threaded;

pub use dispatcher::{ContextId, Dispatcher, EntryPoint};
pub use threaded::ThreadDispatcher;
