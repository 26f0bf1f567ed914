//! Live session against a realtime endpoint.
//!
//! Lines read from stdin are sent to the open thread. Thread summaries,
//! history and read receipts need the REST service, which this driver does
//! not talk to; [`OfflineDirectory`] answers those requests with empty
//! results.

use std::{convert::Infallible, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tripline_app::{
    ChannelDriver, Command, Directory, Runtime, Session, SessionConfig, SystemEnv, WsTransport,
};
use tripline_core::{ConfirmedMessage, Draft, Notice, SyncAction, ThreadKey};
use tripline_proto::{ThreadId, UserId, payloads::dm::ThreadSummary};

/// Live mode parameters.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Realtime endpoint URL.
    pub endpoint: String,
    /// Local user id.
    pub user: String,
    /// Bearer token; without it the session never connects.
    pub token: Option<String>,
    /// Peer of the direct thread to open.
    pub peer: Option<String>,
    /// Community room to open instead.
    pub community: Option<String>,
    /// Reconciliation window.
    pub reconcile_window: Duration,
}

impl LiveConfig {
    fn thread(&self) -> Option<ThreadKey> {
        if let Some(community) = &self.community {
            return Some(ThreadKey::community(community.as_str()));
        }
        let peer = self.peer.as_deref()?;
        let (a, b) = if self.user.as_str() < peer { (&*self.user, peer) } else { (peer, &*self.user) };
        Some(ThreadKey::direct(format!("{a}:{b}"), peer))
    }
}

/// Directory used when no REST service is configured.
#[derive(Debug, Default)]
pub struct OfflineDirectory;

impl Directory for OfflineDirectory {
    type Error = Infallible;

    async fn fetch_threads(&mut self) -> Result<Vec<ThreadSummary>, Self::Error> {
        tracing::debug!("thread list not available offline");
        Ok(Vec::new())
    }

    async fn fetch_history(
        &mut self,
        thread: &ThreadKey,
    ) -> Result<Vec<ConfirmedMessage>, Self::Error> {
        tracing::debug!(%thread, "history not available offline");
        Ok(Vec::new())
    }

    async fn mark_read(&mut self, thread: &ThreadId) -> Result<(), Self::Error> {
        tracing::debug!(%thread, "read receipt not sent offline");
        Ok(())
    }
}

/// Run until stdin closes.
pub async fn run(config: LiveConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (transport, events) = WsTransport::new();
    let session_config = SessionConfig {
        endpoint: config.endpoint.clone(),
        reconcile_window: config.reconcile_window,
        user_id: UserId::new(config.user.as_str()),
    };
    let session = Session::new(transport, SystemEnv, session_config);

    let (commands, command_rx) = mpsc::unbounded_channel();
    let (presented_tx, mut presented) = mpsc::unbounded_channel();

    commands.send(Command::Login { credential: config.token.clone() })?;
    commands.send(Command::MountMessages)?;
    if let Some(thread) = config.thread() {
        tracing::info!(%thread, "opening thread");
        commands.send(Command::OpenThread(thread))?;
    } else {
        tracing::warn!("no --peer or --community given, input lines will be rejected");
    }

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if commands.send(Command::Send(Draft::text(line))).is_err() {
                break;
            }
        }
        let _ = commands.send(Command::Logout);
    });

    tokio::spawn(async move {
        while let Some(action) = presented.recv().await {
            match action {
                SyncAction::Notify(Notice::ConnectionError { message }) => {
                    tracing::warn!(%message, "connection error");
                },
                SyncAction::Notify(Notice::Rejected { reason }) => {
                    tracing::warn!(%reason, "rejected");
                },
                other => tracing::debug!(action = ?other, "presented"),
            }
        }
    });

    let driver = ChannelDriver::new(command_rx, events, presented_tx);
    let session = Runtime::new(driver, OfflineDirectory, session).run().await?;

    if let Some(engine) = session.state().messages() {
        for message in engine.messages() {
            tracing::info!(
                author = %message.author(),
                pending = message.is_pending(),
                "{}",
                message.content()
            );
        }
    }
    Ok(())
}
