//! In-memory transport connected to the [`crate::SimRelay`].
//!
//! A [`SimTransport`] and its [`SimLink`] share one buffer. The session side
//! writes through the transport; the relay side reads outgoing events and
//! writes inbound events through the link.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use tripline_core::{Transport, TransportError};
use tripline_proto::{InboundEvent, OutboundEvent};

/// Operation performed on a transport, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportOp {
    /// `open` succeeded.
    Open {
        /// Endpoint passed to `open`.
        endpoint: String,
    },
    /// `send` handed an event to the link.
    Send(OutboundEvent),
    /// `close` was called.
    Close,
}

#[derive(Debug, Default)]
struct LinkState {
    ops: Vec<TransportOp>,
    outgoing: VecDeque<OutboundEvent>,
    inbox: VecDeque<InboundEvent>,
    open: bool,
    open_requested: bool,
    close_requested: bool,
    refuse_open: bool,
    fail_sends: bool,
}

/// Session-side half of a simulated connection.
#[derive(Debug)]
pub struct SimTransport {
    link: Rc<RefCell<LinkState>>,
}

/// Relay-side half of a simulated connection.
#[derive(Debug, Clone)]
pub struct SimLink {
    link: Rc<RefCell<LinkState>>,
}

impl SimTransport {
    /// Connected transport/link pair.
    pub fn pair() -> (Self, SimLink) {
        let link = Rc::new(RefCell::new(LinkState::default()));
        (Self { link: Rc::clone(&link) }, SimLink { link })
    }
}

impl Transport for SimTransport {
    fn open(&mut self, endpoint: &str, _credential: &str) -> Result<(), TransportError> {
        let mut link = self.link.borrow_mut();
        if link.refuse_open {
            return Err(TransportError::Connection(format!("{endpoint} refused the connection")));
        }
        link.ops.push(TransportOp::Open { endpoint: endpoint.to_string() });
        link.inbox.clear();
        link.open = true;
        link.open_requested = true;
        Ok(())
    }

    fn send(&mut self, event: &OutboundEvent) -> Result<(), TransportError> {
        let mut link = self.link.borrow_mut();
        if !link.open {
            return Err(TransportError::Closed);
        }
        if link.fail_sends {
            return Err(TransportError::Connection("write failed".into()));
        }
        // Round-trip through the codec so the wire format is exercised.
        let decoded = OutboundEvent::decode(&event.encode()?)?;
        link.ops.push(TransportOp::Send(event.clone()));
        link.outgoing.push_back(decoded);
        Ok(())
    }

    fn close(&mut self) {
        let mut link = self.link.borrow_mut();
        link.ops.push(TransportOp::Close);
        if link.open {
            link.open = false;
            link.close_requested = true;
        }
        link.outgoing.clear();
        link.inbox.clear();
    }
}

impl SimLink {
    /// Every operation performed on the transport so far.
    pub fn ops(&self) -> Vec<TransportOp> {
        self.link.borrow().ops.clone()
    }

    /// Events sent so far, in order.
    pub fn sent(&self) -> Vec<OutboundEvent> {
        self.link
            .borrow()
            .ops
            .iter()
            .filter_map(|op| match op {
                TransportOp::Send(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        self.link.borrow().ops.iter().filter(|op| matches!(op, TransportOp::Open { .. })).count()
    }

    /// Make subsequent opens fail.
    pub fn refuse_open(&self, refuse: bool) {
        self.link.borrow_mut().refuse_open = refuse;
    }

    /// Make subsequent sends fail.
    pub fn fail_sends(&self, fail: bool) {
        self.link.borrow_mut().fail_sends = fail;
    }

    /// Whether the transport is open.
    pub fn is_open(&self) -> bool {
        self.link.borrow().open
    }

    /// Consume a pending open request.
    pub(crate) fn take_open_request(&self) -> bool {
        std::mem::take(&mut self.link.borrow_mut().open_requested)
    }

    /// Consume a pending close request.
    pub(crate) fn take_close_request(&self) -> bool {
        std::mem::take(&mut self.link.borrow_mut().close_requested)
    }

    /// Drop the connection from the relay side.
    pub(crate) fn sever(&self) {
        let mut link = self.link.borrow_mut();
        link.open = false;
        link.open_requested = false;
        link.outgoing.clear();
    }

    /// Take events the session sent.
    pub(crate) fn drain_outgoing(&self) -> Vec<OutboundEvent> {
        self.link.borrow_mut().outgoing.drain(..).collect()
    }

    /// Queue an event for the session.
    pub(crate) fn deliver(&self, event: InboundEvent) {
        self.link.borrow_mut().inbox.push_back(event);
    }

    /// Take events queued for the session.
    pub fn drain_inbox(&self) -> Vec<InboundEvent> {
        self.link.borrow_mut().inbox.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use tripline_proto::{TripId, payloads::map::TripRef};

    use super::*;

    fn join() -> OutboundEvent {
        OutboundEvent::JoinSquad(TripRef { trip_id: TripId::new("t1") })
    }

    #[test]
    fn send_before_open_is_closed() {
        let (mut transport, _link) = SimTransport::pair();
        assert_eq!(transport.send(&join()), Err(TransportError::Closed));
    }

    #[test]
    fn ops_are_logged_in_order() {
        let (mut transport, link) = SimTransport::pair();
        transport.open("sim://relay", "token").unwrap();
        transport.send(&join()).unwrap();
        transport.close();

        assert_eq!(
            link.ops(),
            [
                TransportOp::Open { endpoint: "sim://relay".into() },
                TransportOp::Send(join()),
                TransportOp::Close,
            ]
        );
        assert!(link.take_close_request());
    }

    #[test]
    fn close_discards_undelivered_events() {
        let (mut transport, link) = SimTransport::pair();
        transport.open("sim://relay", "token").unwrap();
        link.deliver(InboundEvent::Connect);
        link.deliver(InboundEvent::disconnect("io client disconnect"));
        transport.close();

        transport.open("sim://relay", "token").unwrap();
        link.deliver(InboundEvent::Connect);
        assert_eq!(link.drain_inbox(), [InboundEvent::Connect]);
    }

    #[test]
    fn open_starts_from_a_clean_inbox() {
        let (mut transport, link) = SimTransport::pair();
        transport.open("sim://relay", "token").unwrap();
        transport.close();
        link.deliver(InboundEvent::disconnect("io client disconnect"));

        transport.open("sim://relay", "token").unwrap();
        assert!(link.drain_inbox().is_empty());
    }

    #[test]
    fn refused_open_is_a_connection_error() {
        let (mut transport, link) = SimTransport::pair();
        link.refuse_open(true);
        let err = transport.open("sim://relay", "token").unwrap_err();
        assert!(err.is_transient());
        assert_eq!(link.open_count(), 0);
    }
}
