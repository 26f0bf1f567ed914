//! Chat message synchronization.
//!
//! - [`record`]: pending and confirmed message records
//! - [`room`]: thread keys and room membership
//! - [`buffer`]: the active thread's messages and reconciliation
//! - [`threads`]: conversation list upkeep
//! - [`engine`]: [`MessageSyncEngine`] tying them together

pub mod buffer;
pub mod engine;
pub mod record;
pub mod room;
pub mod threads;

pub use buffer::{Reconciliation, ThreadBuffer};
pub use engine::{DEFAULT_RECONCILE_WINDOW, MessageSyncEngine, SyncConfig};
pub use record::{ConfirmedMessage, Draft, Message, PendingMessage, TempId};
pub use room::{Membership, ThreadKey};
pub use threads::ThreadList;
