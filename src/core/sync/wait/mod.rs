/*!
 * Wait Infrastructure
 *
 * The pieces every blocking synchronizer is assembled from:
 * - An intrusive, arena-backed wait list with O(1) arbitrary removal
 * - Timeouts and absolute deadlines
 * - Cooperative cancellation tokens
 * - Per-request wake handles and the shared wait loop
 */

mod cancel;
mod deadline;
mod list;
pub(crate) mod request;

pub use cancel::CancellationToken;
pub use deadline::{Deadline, Remaining, Timeout};
pub use list::{Iter, WaitHandle, WaitList};
pub use request::Outcome;
