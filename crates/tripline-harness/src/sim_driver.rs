//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` lets the production [`tripline_app::Runtime`] run against
//! scripted inputs. Presented actions are recorded for assertions, and an
//! optional [`InvariantRegistry`] is checked against the session state on
//! every presentation.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use thiserror::Error;
use tripline_app::{Command, Driver, Input, SessionState};
use tripline_core::{Notice, SyncAction};
use tripline_proto::InboundEvent;

use crate::invariants::{InvariantRegistry, SessionSnapshot, SystemSnapshot};

/// Error type for simulation runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimDriverError {
    /// An invariant failed after a presentation.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// A scenario addressed a peer that was never added.
    #[error("unknown peer {0}")]
    UnknownPeer(String),

    /// Events kept flowing after the given number of relay rounds.
    #[error("no quiescence after {0} rounds")]
    NoQuiescence(usize),
}

#[derive(Default)]
struct Shared {
    inputs: VecDeque<Input>,
    presented: Vec<SyncAction>,
}

/// Scripted driver for deterministic tests.
///
/// Clones share the same input queue and presentation log, so a test can keep
/// a handle after moving the driver into a runtime.
#[derive(Clone)]
pub struct SimDriver {
    shared: Rc<RefCell<Shared>>,
    invariants: Option<Rc<InvariantRegistry>>,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDriver {
    /// Driver with an empty script.
    pub fn new() -> Self {
        Self { shared: Rc::new(RefCell::new(Shared::default())), invariants: None }
    }

    /// Check `registry` on every presentation.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(Rc::new(registry));
        self
    }

    /// Queue a user operation.
    pub fn push_command(&self, command: Command) {
        self.shared.borrow_mut().inputs.push_back(Input::Command(command));
    }

    /// Queue a transport event.
    pub fn push_event(&self, event: InboundEvent) {
        self.shared.borrow_mut().inputs.push_back(Input::Event(event));
    }

    /// Whether scripted inputs remain.
    pub fn has_pending(&self) -> bool {
        !self.shared.borrow().inputs.is_empty()
    }

    /// Take everything presented so far.
    pub fn take_presented(&self) -> Vec<SyncAction> {
        std::mem::take(&mut self.shared.borrow_mut().presented)
    }

    /// Notices presented so far, without consuming the log.
    pub fn notices(&self) -> Vec<Notice> {
        self.shared
            .borrow()
            .presented
            .iter()
            .filter_map(|a| match a {
                SyncAction::Notify(notice) => Some(notice.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn next_input(&mut self) -> Result<Option<Input>, Self::Error> {
        Ok(self.shared.borrow_mut().inputs.pop_front())
    }

    fn present(&mut self, state: &SessionState, action: &SyncAction) -> Result<(), Self::Error> {
        self.shared.borrow_mut().presented.push(action.clone());

        if let Some(registry) = &self.invariants {
            let snapshot = SystemSnapshot::single(SessionSnapshot::from_state(state));
            if let Err(violations) = registry.check_all(&snapshot) {
                let messages: Vec<String> = violations.iter().map(ToString::to_string).collect();
                return Err(SimDriverError::Invariant(messages.join("; ")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tripline_proto::UserId;

    use super::*;
    use crate::invariants::{Invariant, InvariantResult, Violation};

    struct AlwaysFails;

    impl Invariant for AlwaysFails {
        fn name(&self) -> &'static str {
            "always_fails"
        }

        fn check(&self, _state: &SystemSnapshot) -> InvariantResult {
            Err(Violation { invariant: self.name(), message: "by construction".into() })
        }
    }

    #[tokio::test]
    async fn inputs_come_out_in_order() {
        let mut driver = SimDriver::new();
        driver.push_command(Command::MountMessages);
        driver.push_event(InboundEvent::Connect);

        assert_eq!(driver.next_input().await.unwrap(), Some(Input::Command(Command::MountMessages)));
        assert_eq!(driver.next_input().await.unwrap(), Some(Input::Event(InboundEvent::Connect)));
        assert_eq!(driver.next_input().await.unwrap(), None);
    }

    #[test]
    fn presentation_checks_invariants() {
        let mut registry = InvariantRegistry::new();
        registry.add(AlwaysFails);
        let mut driver = SimDriver::new().with_invariants(registry);
        let state = SessionState::new(UserId::new("alice"));

        let err = driver.present(&state, &SyncAction::Render).unwrap_err();
        assert!(matches!(err, SimDriverError::Invariant(ref m) if m.contains("always_fails")));
        assert_eq!(driver.take_presented(), [SyncAction::Render]);
    }
}
