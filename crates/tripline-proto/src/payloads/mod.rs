//! Event payload types.
//!
//! Payloads are plain serde structs. Field names are camelCase on the wire to
//! match the server; optional fields are omitted when absent so the encoding
//! stays compact.

pub mod community;
pub mod dm;
pub mod map;
pub mod session;

use serde::{Deserialize, Serialize};

/// Content type of a chat message (`type` on the wire).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text.
    #[default]
    Text,
    /// Image reference; the content carries a caption or the URL.
    Image,
}
