/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::Pid;

/// Process-related errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ProcessError {
    #[error("Process table full")]
    #[diagnostic(
        code(process::table_full),
        help("Every slot is occupied. Reap zombie children or raise max_processes.")
    )]
    TableFull,

    #[error("No execution context available")]
    #[diagnostic(
        code(process::context_exhausted),
        help("The platform dispatcher is out of context memory.")
    )]
    ContextExhausted,

    #[error("Address space duplication failed")]
    #[diagnostic(
        code(process::address_space_exhausted),
        help("The parent's address space could not be copied for the child.")
    )]
    AddressSpaceExhausted,

    #[error("Process {0} not found")]
    #[diagnostic(
        code(process::not_found),
        help("The process may have been reaped or never existed. Check PID validity.")
    )]
    NotFound(Pid),

    #[error("Process {0} has no children to wait for")]
    #[diagnostic(
        code(process::no_children),
        help("wait only succeeds for a process with live or zombie children.")
    )]
    NoChildren(Pid),

    #[error("Blocking operation interrupted by kill")]
    #[diagnostic(
        code(process::interrupted),
        help("The caller's kill flag was set while it was suspended.")
    )]
    Interrupted,

    #[error("Invalid queue level {0}")]
    #[diagnostic(
        code(process::invalid_queue),
        help("Feedback queue levels are 1, 2, and 3.")
    )]
    InvalidQueue(u8),
}

/// Semaphore-related errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SemaphoreError {
    #[error("Semaphore slot {0} out of range")]
    #[diagnostic(
        code(semaphore::invalid_slot),
        help("Slot ids range over the configured semaphore_slots count.")
    )]
    InvalidSlot(usize),

    #[error("Semaphore slot {0} already initialized")]
    #[diagnostic(
        code(semaphore::already_initialized),
        help("Each slot accepts init exactly once.")
    )]
    AlreadyInitialized(usize),

    #[error("Semaphore slot {0} not initialized")]
    #[diagnostic(
        code(semaphore::uninitialized),
        help("Call semaphore init before acquire or release.")
    )]
    Uninitialized(usize),
}

/// Top-level kernel error
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum KernelError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Semaphore(#[from] SemaphoreError),
}
