//! Deterministic simulation harness for Tripline.
//!
//! In-memory implementations of the Environment, Transport, Directory and
//! Driver seams, plus an in-process relay server, so the production session
//! and runtime code can be exercised with reproducible timing and delivery.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks behavioural properties against snapshots
//! of every session. Use [`InvariantRegistry::standard()`] for the common
//! message and map invariants.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cluster;
pub mod invariants;
pub mod sim_directory;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_relay;
pub mod sim_transport;

pub use cluster::{SimCluster, SimPeer, SimRuntime};
pub use invariants::{
    EntrySnapshot, Invariant, InvariantRegistry, InvariantResult, ListenerBound,
    RouteEndpointsFixed, RouteSnapshot, SessionSnapshot, SystemSnapshot, UniqueConfirmedIds,
    UniquePendingIds, Violation,
};
pub use sim_directory::{DirectoryUnavailable, MessageStore, SharedStore, SimDirectory};
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::SimEnv;
pub use sim_relay::{Room, SimRelay};
pub use sim_transport::{SimLink, SimTransport, TransportOp};
