//! Channel-backed driver.

use std::{convert::Infallible, future::Future};

use tokio::sync::mpsc;
use tripline_core::SyncAction;
use tripline_proto::InboundEvent;

use crate::{Command, Driver, Input, SessionState};

/// Where a [`ChannelDriver`] reads transport events from.
///
/// `recv` must be cancel safe: the driver races it against the command
/// channel.
pub trait EventSource {
    /// Next event, or `None` once the source is closed.
    fn recv(&mut self) -> impl Future<Output = Option<InboundEvent>>;
}

impl EventSource for mpsc::UnboundedReceiver<InboundEvent> {
    async fn recv(&mut self) -> Option<InboundEvent> {
        mpsc::UnboundedReceiver::recv(self).await
    }
}

/// Driver fed by channels.
///
/// Commands come from the frontend, events from the transport (a plain
/// receiver, or the event stream of a WebSocket transport). Presented actions
/// are forwarded to the frontend. Transport events are preferred when both
/// are ready so user operations always see the newest server state.
#[derive(Debug)]
pub struct ChannelDriver<S = mpsc::UnboundedReceiver<InboundEvent>> {
    commands: mpsc::UnboundedReceiver<Command>,
    events: S,
    presented: mpsc::UnboundedSender<SyncAction>,
    events_open: bool,
}

impl<S: EventSource> ChannelDriver<S> {
    /// Driver over the given channels.
    pub fn new(
        commands: mpsc::UnboundedReceiver<Command>,
        events: S,
        presented: mpsc::UnboundedSender<SyncAction>,
    ) -> Self {
        Self { commands, events, presented, events_open: true }
    }
}

impl<S: EventSource> Driver for ChannelDriver<S> {
    type Error = Infallible;

    async fn next_input(&mut self) -> Result<Option<Input>, Self::Error> {
        loop {
            tokio::select! {
                biased;

                event = self.events.recv(), if self.events_open => match event {
                    Some(event) => return Ok(Some(Input::Event(event))),
                    None => {
                        tracing::debug!("transport event channel closed");
                        self.events_open = false;
                    },
                },
                command = self.commands.recv() => return Ok(command.map(Input::Command)),
            }
        }
    }

    fn present(&mut self, _state: &SessionState, action: &SyncAction) -> Result<(), Self::Error> {
        if self.presented.send(action.clone()).is_err() {
            tracing::trace!("frontend dropped its receiver");
        }
        Ok(())
    }
}
