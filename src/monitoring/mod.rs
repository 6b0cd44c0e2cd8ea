/*!
 * Monitoring
 * Tracing subscriber setup and per-synchronizer wait statistics
 */

mod stats;
mod tracer;

pub use stats::{StatsSnapshot, WaitStats};
pub use tracer::{init_tracing, try_init_tracing, TracingConfig, DEFAULT_FILTER, TRACE_JSON_ENV};
