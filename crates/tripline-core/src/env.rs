//! Environment abstraction for deterministic testing.
//!
//! Decouples sync logic from the wall clock. Production uses system time;
//! simulation uses a virtual clock that only moves when the test advances it.

use tripline_proto::Timestamp;

/// Abstract environment providing time.
///
/// # Invariants
///
/// - `now()` is wall-clock time comparable with server timestamps, since
///   reconciliation measures the distance between the two.
/// - Within one execution context, successive calls never go backwards.
pub trait Environment: Clone + 'static {
    /// Current wall-clock time.
    fn now(&self) -> Timestamp;
}
