//! Generic runtime for session orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`Session`]: connection, listeners and engines
//! - [`Driver`]: platform-specific inputs and presentation
//! - [`Directory`]: REST collaborators

use tripline_core::{Environment, SyncAction, Transport};

use crate::{Command, Directory, Driver, Input, Session};

/// Generic runtime that orchestrates Session, Driver and Directory.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `R`: REST directory
/// - `T`: Realtime transport
/// - `E`: Environment providing time
pub struct Runtime<D, R, T, E>
where
    D: Driver,
    R: Directory,
    T: Transport,
    E: Environment,
{
    driver: D,
    directory: R,
    session: Session<T, E>,
}

impl<D, R, T, E> Runtime<D, R, T, E>
where
    D: Driver,
    R: Directory,
    T: Transport,
    E: Environment,
{
    /// Create a runtime around a session that is not logged in yet.
    pub fn new(driver: D, directory: R, session: Session<T, E>) -> Self {
        Self { driver, directory, session }
    }

    /// Run until the driver has no more input.
    ///
    /// Each input is applied to the session, then every resulting action is
    /// executed before the next input is read. Rejected operations and
    /// directory failures are reported but never end the loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    pub async fn run(mut self) -> Result<Session<T, E>, D::Error> {
        while let Some(input) = self.driver.next_input().await? {
            self.step(input).await?;
        }

        tracing::debug!("driver closed, logging out");
        self.session.logout();
        self.process_actions().await?;
        Ok(self.session)
    }

    /// Apply one input and execute the resulting actions.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    pub async fn step(&mut self, input: Input) -> Result<(), D::Error> {
        match input {
            Input::Event(event) => {
                tracing::trace!(event = %event.name(), "inbound");
                self.session.handle_event(&event);
            },
            Input::Command(command) => self.execute(command),
        }
        self.process_actions().await
    }

    fn execute(&mut self, command: Command) {
        if let Err(e) = self.session.execute(command) {
            self.session.reject(&e);
        }
    }

    /// Execute actions until the session has none left.
    async fn process_actions(&mut self) -> Result<(), D::Error> {
        loop {
            let actions = self.session.take_actions();
            if actions.is_empty() {
                return Ok(());
            }

            for action in actions {
                match action {
                    SyncAction::FetchHistory { thread } => {
                        match self.directory.fetch_history(&thread).await {
                            Ok(history) => self.session.load_history(&thread, history),
                            Err(e) => tracing::warn!(%thread, error = %e, "history fetch failed"),
                        }
                    },
                    SyncAction::RefreshThreads => match self.directory.fetch_threads().await {
                        Ok(threads) => self.session.apply_thread_list(threads),
                        Err(e) => tracing::warn!(error = %e, "thread list fetch failed"),
                    },
                    SyncAction::MarkRead { thread } => {
                        if let Err(e) = self.directory.mark_read(&thread).await {
                            tracing::warn!(%thread, error = %e, "read receipt failed");
                        }
                    },
                    SyncAction::Emit(event) => {
                        // take_actions sends emits itself
                        tracing::warn!(event = %event.name(), "unflushed emit");
                    },
                    SyncAction::RouteChanged { .. } | SyncAction::Notify(_) | SyncAction::Render => {
                        self.driver.present(self.session.state(), &action)?;
                    },
                }
            }
        }
    }

    /// The session being driven.
    pub fn session(&self) -> &Session<T, E> {
        &self.session
    }

    /// The driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The directory.
    pub fn directory(&self) -> &R {
        &self.directory
    }
}
