/*!
 * System Limits and Constants
 *
 * Centralized location for limits and tuning knobs shared by the
 * synchronizers. Organized by domain for discoverability.
 */

// =============================================================================
// WAIT LIST
// =============================================================================

/// Initial slot capacity of a wait list arena
/// [PERF] Covers the common case of a handful of blocked threads without
/// reallocating the arena
pub const WAIT_LIST_INITIAL_CAPACITY: usize = 8;

/// Index of the sentinel node in every wait list arena
pub const WAIT_LIST_SENTINEL: usize = 0;

// =============================================================================
// SEMAPHORE
// =============================================================================

/// Units of a binary semaphore
pub const BINARY_SEMAPHORE_UNITS: usize = 1;

/// Name used in tracing events when a synchronizer was not given one
pub const DEFAULT_SYNC_NAME: &str = "anonymous";
