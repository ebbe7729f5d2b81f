/*!
 * Core Types
 * Common types used across the kernel
 */

use serde::{Deserialize, Serialize};

use super::errors::ProcessError;

/// Process ID type
pub type Pid = u32;

/// Tick counter type (monotonically increasing)
pub type Tick = u64;

/// Index of a slot in the process table arena
pub type SlotIndex = usize;

/// Logical CPU core identifier
pub type CpuId = usize;

/// Common result type for kernel operations
pub type KernelResult<T> = Result<T, super::errors::KernelError>;

/// Process lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcState {
    /// Slot is free
    Unused,
    /// Allocated but not yet runnable
    Embryo,
    /// Eligible for selection
    Runnable,
    /// Currently holding a CPU
    Running,
    /// Blocked on a wake channel
    Sleeping,
    /// Exited, awaiting reap by parent
    Zombie,
}

impl ProcState {
    /// Fixed-width label used by the table dump
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unused => "UNUSED",
            Self::Embryo => "EMBRYO",
            Self::Runnable => "RUNNABLE",
            Self::Running => "RUNNING",
            Self::Sleeping => "SLEEPING",
            Self::Zombie => "ZOMBIE",
        }
    }
}

/// Feedback queue tier
///
/// Tier 1 preempts tier 2 preempts tier 3 in every selection round.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueLevel {
    /// Longest-idle round robin
    RoundRobin = 1,
    /// Latest created, first chosen
    LatestCreated = 2,
    /// Modified highest response-ratio next
    ResponseRatio = 3,
}

impl QueueLevel {
    /// Numeric tier as exposed to callers (1..=3)
    #[inline(always)]
    pub const fn level(self) -> u8 {
        self as u8
    }

    /// Parse a caller-supplied tier number
    pub fn from_level(level: u8) -> Result<Self, ProcessError> {
        match level {
            1 => Ok(Self::RoundRobin),
            2 => Ok(Self::LatestCreated),
            3 => Ok(Self::ResponseRatio),
            other => Err(ProcessError::InvalidQueue(other)),
        }
    }
}

/// Identity of what a sleeping process is waiting for
///
/// The channel is an opaque token: `wakeup` makes every sleeper whose
/// channel compares equal runnable again, nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// A process identity; used by wait/exit handshaking
    Proc(Pid),
    /// A semaphore slot identity
    Semaphore(usize),
    /// The global tick counter; used by timed sleeps
    Clock,
}
