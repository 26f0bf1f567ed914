//! Multi-peer simulation.
//!
//! A [`SimCluster`] runs one production [`Runtime`] per simulated user, all
//! connected to one [`SimRelay`] and sharing one [`SimEnv`]. Tests issue
//! commands to individual peers and call [`SimCluster::settle`] to let the
//! relay and every runtime process until nothing moves.

use std::{collections::BTreeMap, time::Duration};

use tripline_app::{Command, Input, Runtime, Session, SessionConfig};
use tripline_core::SyncAction;
use tripline_proto::UserId;

use crate::{
    SimDirectory, SimDriver, SimDriverError, SimEnv, SimLink, SimRelay, SimTransport,
    invariants::{SessionSnapshot, SystemSnapshot},
    sim_directory::{MessageStore, SharedStore},
};

/// Upper bound on relay rounds per settle; a run that keeps producing events
/// after this many rounds is reported as a livelock.
const MAX_ROUNDS: usize = 64;

/// Runtime type of a simulated peer.
pub type SimRuntime = Runtime<SimDriver, SimDirectory, SimTransport, SimEnv>;

/// One simulated user.
pub struct SimPeer {
    runtime: SimRuntime,
    driver: SimDriver,
    link: SimLink,
    directory: SimDirectory,
}

impl SimPeer {
    /// The peer's session.
    pub fn session(&self) -> &Session<SimTransport, SimEnv> {
        self.runtime.session()
    }

    /// Relay side of the peer's transport.
    pub fn link(&self) -> &SimLink {
        &self.link
    }

    /// The peer's directory.
    pub fn directory(&self) -> &SimDirectory {
        &self.directory
    }

    /// Take the actions presented to this peer's frontend.
    pub fn take_presented(&self) -> Vec<SyncAction> {
        self.driver.take_presented()
    }
}

/// Deterministic multi-peer simulation.
pub struct SimCluster {
    env: SimEnv,
    store: SharedStore,
    relay: SimRelay,
    peers: BTreeMap<UserId, SimPeer>,
    config: SessionConfig,
}

impl SimCluster {
    /// Empty cluster with clock at `start_millis` and chaos seeded by `seed`.
    pub fn new(start_millis: u64, seed: u64) -> Self {
        let env = SimEnv::new(start_millis, seed);
        let store = MessageStore::shared();
        let relay = SimRelay::new(env.clone(), store.clone());
        let config = SessionConfig { endpoint: "sim://relay".into(), ..SessionConfig::default() };
        Self { env, store, relay, peers: BTreeMap::new(), config }
    }

    /// Use `window` as reconciliation window for peers added afterwards.
    #[must_use]
    pub fn with_reconcile_window(mut self, window: Duration) -> Self {
        self.config.reconcile_window = window;
        self
    }

    /// Add a peer for `user`. Not logged in yet.
    pub fn add_peer(&mut self, user: impl Into<UserId>) -> UserId {
        let user = user.into();
        let (transport, link) = SimTransport::pair();
        let config = SessionConfig { user_id: user.clone(), ..self.config.clone() };
        let session = Session::new(transport, self.env.clone(), config);
        let driver = SimDriver::new();
        let directory = SimDirectory::new(user.clone(), self.store.clone());
        let runtime = Runtime::new(driver.clone(), directory.clone(), session);

        self.relay.attach(user.clone(), link.clone());
        self.peers.insert(user.clone(), SimPeer { runtime, driver, link, directory });
        user
    }

    /// Shared environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// The relay.
    pub fn relay(&self) -> &SimRelay {
        &self.relay
    }

    /// The relay, mutably.
    pub fn relay_mut(&mut self) -> &mut SimRelay {
        &mut self.relay
    }

    /// Message store behind every directory.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Peer of `user`.
    ///
    /// # Panics
    ///
    /// Panics if `user` was never added; a scenario addressing an unknown
    /// peer is a bug in the scenario.
    #[allow(clippy::panic)]
    pub fn peer(&self, user: &str) -> &SimPeer {
        match self.peers.get(&UserId::new(user)) {
            Some(peer) => peer,
            None => panic!("unknown peer {user}"),
        }
    }

    /// Session of `user`.
    pub fn session(&self, user: &str) -> &Session<SimTransport, SimEnv> {
        self.peer(user).session()
    }

    /// Move the shared clock forward.
    pub fn advance(&self, by: Duration) {
        self.env.advance(by);
    }

    /// Run `command` on `user`'s runtime, without settling.
    pub async fn command(&mut self, user: &str, command: Command) -> Result<(), SimDriverError> {
        let Some(peer) = self.peers.get_mut(&UserId::new(user)) else {
            return Err(SimDriverError::UnknownPeer(user.to_string()));
        };
        peer.runtime.step(Input::Command(command)).await
    }

    /// Run `command` on `user` and settle.
    pub async fn run(&mut self, user: &str, command: Command) -> Result<(), SimDriverError> {
        self.command(user, command).await?;
        self.settle().await
    }

    /// Log `user` in and settle.
    pub async fn login(&mut self, user: &str) -> Result<(), SimDriverError> {
        self.run(user, Command::Login { credential: Some(format!("token-{user}")) }).await
    }

    /// Drop `user`'s connection from the server side (without settling).
    pub fn drop_connection(&mut self, user: &str, reason: &str) {
        self.relay.drop_peer(&UserId::new(user), reason);
    }

    /// Pump the relay and deliver events until nothing moves.
    pub async fn settle(&mut self) -> Result<(), SimDriverError> {
        for _ in 0..MAX_ROUNDS {
            let mut moved = self.relay.pump();
            for peer in self.peers.values_mut() {
                for event in peer.link.drain_inbox() {
                    moved += 1;
                    peer.runtime.step(Input::Event(event)).await?;
                }
            }
            if moved == 0 {
                return Ok(());
            }
        }
        Err(SimDriverError::NoQuiescence(MAX_ROUNDS))
    }

    /// Deliver only the events already queued for `user`, without pumping the
    /// relay.
    pub async fn deliver_pending(&mut self, user: &str) -> Result<usize, SimDriverError> {
        let Some(peer) = self.peers.get_mut(&UserId::new(user)) else {
            return Err(SimDriverError::UnknownPeer(user.to_string()));
        };
        let events = peer.link.drain_inbox();
        let count = events.len();
        for event in events {
            peer.runtime.step(Input::Event(event)).await?;
        }
        Ok(count)
    }

    /// Snapshot of every session.
    pub fn snapshot(&self) -> SystemSnapshot {
        let mut snapshot = SystemSnapshot::empty();
        for peer in self.peers.values() {
            snapshot.add_session(SessionSnapshot::from_session(peer.session()));
        }
        snapshot
    }
}
