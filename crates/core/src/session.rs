use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapter::{BoxedAdapter, ConnectionError, TableContent};
use crate::params::ConnectionParameters;
use crate::registry::AdapterFactory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Testing,
    Connected,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Testing => "testing",
            Self::Connected => "connected",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        state: SessionState,
        operation: &'static str,
    },
    #[error("test attempt {attempt} was superseded by attempt {current}")]
    StaleAttempt { attempt: u64, current: u64 },
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Ticket for one connection test, handed out by
/// [`ConnectionSession::begin_test`] and redeemed by
/// [`ConnectionSession::on_test_result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestAttempt {
    id: u64,
    parameters: ConnectionParameters,
}

impl TestAttempt {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn parameters(&self) -> &ConnectionParameters {
        &self.parameters
    }
}

/// Connection lifecycle for one interaction surface.
///
/// ```text
/// Disconnected -> Testing -> Connected | Failed
/// Connected | Failed -> Testing        (new attempt)
/// any -> Disconnected                  (disconnect)
/// ```
///
/// The session owns at most one adapter, and every path that replaces or
/// drops it calls `disconnect` on it first.
#[derive(Debug)]
pub struct ConnectionSession {
    state: SessionState,
    parameters: Option<ConnectionParameters>,
    adapter: Option<BoxedAdapter>,
    last_error: Option<ConnectionError>,
    current_attempt: u64,
}

impl Default for ConnectionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            parameters: None,
            adapter: None,
            last_error: None,
            current_attempt: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Parameters of the live connection, including the selected database.
    #[must_use]
    pub fn parameters(&self) -> Option<&ConnectionParameters> {
        self.parameters.as_ref()
    }

    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.parameters.as_ref().and_then(ConnectionParameters::database)
    }

    /// Error of the last failed attempt, kept until the next attempt starts.
    #[must_use]
    pub fn last_error(&self) -> Option<&ConnectionError> {
        self.last_error.as_ref()
    }

    /// Starts a new attempt. Any adapter held by the session is disconnected
    /// before this returns, and an attempt still in flight is superseded.
    pub async fn begin_test(&mut self, parameters: ConnectionParameters) -> TestAttempt {
        self.release_adapter().await;

        self.current_attempt += 1;
        self.state = SessionState::Testing;
        self.parameters = None;
        self.last_error = None;
        debug!(
            attempt = self.current_attempt,
            server = %parameters.label(),
            "connection test started"
        );

        TestAttempt {
            id: self.current_attempt,
            parameters,
        }
    }

    /// Records the outcome of `attempt`.
    ///
    /// Results for superseded attempts, or arriving outside `Testing`, are
    /// rejected and any adapter they carry is disconnected.
    pub async fn on_test_result(
        &mut self,
        attempt: TestAttempt,
        outcome: Result<BoxedAdapter, ConnectionError>,
    ) -> Result<(), SessionError> {
        let rejection = if attempt.id != self.current_attempt {
            Some(SessionError::StaleAttempt {
                attempt: attempt.id,
                current: self.current_attempt,
            })
        } else if self.state != SessionState::Testing {
            Some(SessionError::InvalidTransition {
                state: self.state,
                operation: "record a test result",
            })
        } else {
            None
        };

        if let Some(error) = rejection {
            if let Ok(mut adapter) = outcome {
                adapter.disconnect().await;
            }
            warn!(attempt = attempt.id, %error, "discarded connection test result");
            return Err(error);
        }

        match outcome {
            Ok(adapter) => {
                info!(
                    engine = adapter.engine(),
                    server = %attempt.parameters.label(),
                    database = attempt.parameters.database().unwrap_or("-"),
                    "connected"
                );
                self.adapter = Some(adapter);
                self.parameters = Some(attempt.parameters);
                self.state = SessionState::Connected;
            }
            Err(error) => {
                warn!(server = %attempt.parameters.label(), %error, "connection test failed");
                self.last_error = Some(error);
                self.state = SessionState::Failed;
            }
        }
        Ok(())
    }

    /// Runs a complete attempt with a fresh adapter from `factory`.
    ///
    /// On a failed connect the session ends in `Failed` and the connection
    /// error is returned.
    pub async fn test(
        &mut self,
        parameters: ConnectionParameters,
        factory: &AdapterFactory,
    ) -> Result<(), SessionError> {
        let attempt = self.begin_test(parameters).await;

        let mut adapter = (**factory)();
        let outcome = match adapter.connect(attempt.parameters()).await {
            Ok(()) => Ok(adapter),
            Err(error) => {
                adapter.disconnect().await;
                Err(error)
            }
        };
        let failure = outcome.as_ref().err().cloned();

        self.on_test_result(attempt, outcome).await?;
        match failure {
            Some(error) => Err(SessionError::Connection(error)),
            None => Ok(()),
        }
    }

    /// Switches the default database of the live connection. The stored
    /// parameters only change when the adapter accepts the switch.
    pub async fn select_database(&mut self, name: &str) -> Result<(), SessionError> {
        if self.state != SessionState::Connected {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                operation: "select a database",
            });
        }

        let adapter = self.adapter.as_mut().ok_or(ConnectionError::NotConnected)?;
        adapter.select_database(name).await?;

        if let Some(parameters) = self.parameters.as_mut() {
            parameters.set_database(Some(name.to_string()));
        }
        info!(database = name, "database selected");
        Ok(())
    }

    pub async fn disconnect(&mut self) {
        self.release_adapter().await;
        // Results of an attempt still in flight must not revive the session.
        self.current_attempt += 1;
        self.state = SessionState::Disconnected;
        self.parameters = None;
        self.last_error = None;
    }

    pub async fn list_databases(&mut self) -> Vec<String> {
        match self.live_adapter() {
            Some(adapter) => adapter.list_databases().await,
            None => Vec::new(),
        }
    }

    pub async fn list_tables(&mut self) -> Vec<String> {
        match self.live_adapter() {
            Some(adapter) => adapter.list_tables().await,
            None => Vec::new(),
        }
    }

    pub async fn get_table_content(&mut self, table_name: &str) -> Option<TableContent> {
        self.live_adapter()?.get_table_content(table_name).await
    }

    fn live_adapter(&mut self) -> Option<&mut BoxedAdapter> {
        if self.state != SessionState::Connected {
            return None;
        }
        self.adapter.as_mut()
    }

    async fn release_adapter(&mut self) {
        let Some(mut adapter) = self.adapter.take() else {
            return;
        };
        adapter.disconnect().await;
        info!(engine = adapter.engine(), "disconnected");
    }
}
