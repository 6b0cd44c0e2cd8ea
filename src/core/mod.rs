/*!
 * Core Module
 * Synchronizers, error types and tunable limits
 */

pub mod errors;
pub mod limits;
pub mod sync;

// Re-export for convenience
pub use errors::*;
