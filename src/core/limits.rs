/*!
 * System Limits and Constants
 *
 * Centralized location for all system-wide limits and thresholds,
 * grouped by domain.
 */

use super::types::Tick;

// =============================================================================
// PROCESS TABLE
// =============================================================================

/// Default process table capacity
/// One slot per process control block; the arena never grows
pub const DEFAULT_MAX_PROCESSES: usize = 64;

/// Upper bound on process names kept in the table dump
pub const PROC_NAME_MAX: usize = 16;

// =============================================================================
// SCHEDULING
// =============================================================================

/// Starvation threshold in aging rounds
/// A runnable process below tier 1 that waits longer than this is promoted
pub const STARVATION_THRESHOLD: Tick = 8000;

/// Service count granted to a fresh process
/// Keeps the MHRRN denominator nonzero from the first round
pub const INITIAL_CYCLES: u64 = 1;

/// Default number of scheduler loops (logical CPU cores)
pub const DEFAULT_CPUS: usize = 1;

// =============================================================================
// SEMAPHORE SERVICE
// =============================================================================

/// Default semaphore slot count
/// Matches the reference workload (one slot per chopstick, six philosophers)
pub const DEFAULT_SEMAPHORE_SLOTS: usize = 6;
