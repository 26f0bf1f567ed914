//! Scripted multi-peer scenario on the in-process relay.
//!
//! Every peer joins a shared community room and a shared trip, chats, edits
//! the route, and one peer loses its connection halfway. The standard
//! invariants are checked after every step.

use std::time::Duration;

use thiserror::Error;
use tripline_app::Command;
use tripline_core::{Draft, ThreadBuffer, ThreadKey};
use tripline_harness::{InvariantRegistry, SimCluster, SimDriverError};
use tripline_proto::{
    TripId,
    payloads::map::{Coordinate, Waypoint},
};

/// Scenario parameters.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Number of simulated users.
    pub peers: usize,
    /// Seed for timing and chaos.
    pub seed: u64,
    /// Probability of a duplicated echo.
    pub duplicate_rate: f64,
    /// Reconciliation window of every session.
    pub reconcile_window: Duration,
}

/// Scenario failure.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// Fewer than two peers leave nothing to synchronize.
    #[error("at least 2 peers are needed, got {0}")]
    TooFewPeers(usize),

    /// The simulation itself failed.
    #[error(transparent)]
    Sim(#[from] SimDriverError),

    /// An invariant was violated.
    #[error("after {step}: {violations}")]
    Invariant {
        /// Step after which the check failed.
        step: &'static str,
        /// Violations, joined.
        violations: String,
    },
}

/// What every peer ended up with.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerSummary {
    /// User id.
    pub user: String,
    /// Messages in the community buffer.
    pub messages: usize,
    /// Messages still awaiting their echo.
    pub pending: usize,
    /// Interior route stops.
    pub stops: usize,
    /// Peers seen online.
    pub online: usize,
}

/// Scenario outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Per-peer results, in user order.
    pub peers: Vec<PeerSummary>,
    /// Events that crossed the relay.
    pub relayed: usize,
}

impl Summary {
    /// Log the outcome.
    pub fn log(&self) {
        for peer in &self.peers {
            tracing::info!(
                user = %peer.user,
                messages = peer.messages,
                pending = peer.pending,
                stops = peer.stops,
                online = peer.online,
                "peer state"
            );
        }
        tracing::info!(relayed = self.relayed, "scenario complete");
    }
}

const COMMUNITY: &str = "demo";
const TRIP: &str = "demo-trip";

fn user(i: usize) -> String {
    format!("user-{i}")
}

fn mount_map() -> Command {
    Command::MountMap {
        trip_id: TripId::new(TRIP),
        start: Waypoint::new(Coordinate::new(47.22, -1.55), "Nantes"),
        end: Waypoint::new(Coordinate::new(44.84, -0.58), "Bordeaux"),
        waypoints: Vec::new(),
        read_only: false,
    }
}

fn check(cluster: &SimCluster, step: &'static str) -> Result<(), ScenarioError> {
    InvariantRegistry::standard().check_all(&cluster.snapshot()).map_err(|violations| {
        let violations: Vec<String> = violations.iter().map(ToString::to_string).collect();
        ScenarioError::Invariant { step, violations: violations.join("; ") }
    })
}

/// Run the scenario.
pub async fn run(config: &ScenarioConfig) -> Result<Summary, ScenarioError> {
    if config.peers < 2 {
        return Err(ScenarioError::TooFewPeers(config.peers));
    }

    let mut cluster =
        SimCluster::new(0, config.seed).with_reconcile_window(config.reconcile_window);
    cluster.relay_mut().set_duplicate_rate(config.duplicate_rate);
    let users: Vec<String> = (0..config.peers).map(user).collect();
    for name in &users {
        cluster.add_peer(name.as_str());
    }

    tracing::info!(peers = config.peers, seed = config.seed, "starting scenario");
    for name in &users {
        cluster.login(name).await?;
        cluster.run(name, Command::MountMessages).await?;
        cluster.run(name, Command::OpenThread(ThreadKey::community(COMMUNITY))).await?;
        cluster.run(name, mount_map()).await?;
    }
    check(&cluster, "login")?;

    for name in &users {
        cluster.command(name, Command::Send(Draft::text(format!("hello from {name}")))).await?;
        cluster.advance(Duration::from_millis(cluster.env().gen_range(50..500)));
    }
    cluster.settle().await?;
    check(&cluster, "greetings")?;

    for name in &users {
        let lat = 44.0 + cluster.env().gen_range(0..300) as f64 / 100.0;
        let lng = -1.5 + cluster.env().gen_range(0..100) as f64 / 100.0;
        cluster.command(name, Command::AddWaypoint(Coordinate::new(lat, lng))).await?;
    }
    cluster.settle().await?;
    check(&cluster, "route edits")?;

    let dropped = &users[1];
    cluster.drop_connection(dropped, "ping timeout");
    cluster.settle().await?;
    cluster.run(dropped, Command::Send(Draft::text("anyone there?"))).await?;
    cluster.advance(Duration::from_secs(1));
    cluster.login(dropped).await?;
    cluster.run(&users[0], Command::Send(Draft::text("welcome back"))).await?;
    check(&cluster, "reconnect")?;

    let peers = users
        .iter()
        .map(|name| {
            let state = cluster.session(name).state();
            let buffer = state.messages().and_then(|engine| engine.buffer());
            PeerSummary {
                user: name.clone(),
                messages: buffer.map_or(0, ThreadBuffer::len),
                pending: buffer.map_or(0, ThreadBuffer::pending_count),
                stops: state.map().map_or(0, |engine| engine.route().waypoints().len()),
                online: state.presence().len(),
            }
        })
        .collect();

    Ok(Summary { peers, relayed: cluster.relay().transcript().len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(peers: usize, seed: u64) -> ScenarioConfig {
        ScenarioConfig {
            peers,
            seed,
            duplicate_rate: 0.5,
            reconcile_window: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn scenario_runs_clean() {
        let summary = run(&config(3, 7)).await.unwrap();

        assert_eq!(summary.peers.len(), 3);
        for peer in &summary.peers {
            assert_eq!(peer.online, 2, "{peer:?}");
        }
        // the message sent while offline never got an echo
        assert_eq!(summary.peers[1].pending, 1);
        assert_eq!(summary.peers[0].pending, 0);
    }

    #[tokio::test]
    async fn same_seed_same_outcome() {
        let a = run(&config(4, 99)).await.unwrap();
        let b = run(&config(4, 99)).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn single_peer_is_rejected() {
        assert!(matches!(run(&config(1, 0)).await, Err(ScenarioError::TooFewPeers(1))));
    }
}
