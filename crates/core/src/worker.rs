use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::adapter::{ConnectionError, TableContent};
use crate::params::ConnectionParameters;
use crate::registry::AdapterFactory;
use crate::session::{ConnectionSession, SessionError};

pub enum SessionCommand {
    Test {
        parameters: ConnectionParameters,
        factory: AdapterFactory,
    },
    ListDatabases,
    SelectDatabase(String),
    ListTables,
    LoadTable(String),
    Disconnect,
}

impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test { parameters, .. } => f
                .debug_struct("Test")
                .field("parameters", parameters)
                .finish_non_exhaustive(),
            Self::ListDatabases => f.write_str("ListDatabases"),
            Self::SelectDatabase(name) => f.debug_tuple("SelectDatabase").field(name).finish(),
            Self::ListTables => f.write_str("ListTables"),
            Self::LoadTable(name) => f.debug_tuple("LoadTable").field(name).finish(),
            Self::Disconnect => f.write_str("Disconnect"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TestFinished(Result<(), ConnectionError>),
    Databases(Vec<String>),
    DatabaseSelected {
        database: String,
        result: Result<(), ConnectionError>,
    },
    Tables {
        database: Option<String>,
        tables: Vec<String>,
    },
    TableLoaded {
        table: String,
        content: Option<TableContent>,
    },
    Disconnected,
    Rejected(SessionError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("session worker has stopped")]
    Closed,
}

/// Handle to a session running on its own task.
///
/// Commands are executed one at a time in the order they were sent, and each
/// produces exactly one [`SessionEvent`].
#[derive(Debug)]
pub struct SessionHandle {
    commands: UnboundedSender<SessionCommand>,
    events: UnboundedReceiver<SessionEvent>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn send(&self, command: SessionCommand) -> Result<(), WorkerError> {
        self.commands.send(command).map_err(|_| WorkerError::Closed)
    }

    /// Non-blocking poll for the draw loop.
    pub fn try_next_event(&mut self) -> Result<Option<SessionEvent>, WorkerError> {
        match self.events.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerError::Closed),
        }
    }

    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Stops accepting commands, releases the connection and waits for the
    /// task to finish.
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(error) = task.await {
            debug!(%error, "session worker ended abnormally");
        }
    }
}

/// Spawns the worker on the current tokio runtime.
#[must_use]
pub fn spawn_session_worker() -> SessionHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_worker(ConnectionSession::new(), command_rx, event_tx));

    SessionHandle {
        commands: command_tx,
        events: event_rx,
        task,
    }
}

async fn run_worker(
    mut session: ConnectionSession,
    mut commands: UnboundedReceiver<SessionCommand>,
    events: UnboundedSender<SessionEvent>,
) {
    while let Some(command) = commands.recv().await {
        debug!(?command, "session command");
        let event = execute(&mut session, command).await;
        if events.send(event).is_err() {
            break;
        }
    }

    session.disconnect().await;
    debug!("session worker stopped");
}

async fn execute(session: &mut ConnectionSession, command: SessionCommand) -> SessionEvent {
    match command {
        SessionCommand::Test {
            parameters,
            factory,
        } => match session.test(parameters, &factory).await {
            Ok(()) => SessionEvent::TestFinished(Ok(())),
            Err(SessionError::Connection(error)) => SessionEvent::TestFinished(Err(error)),
            Err(error) => SessionEvent::Rejected(error),
        },
        SessionCommand::ListDatabases => SessionEvent::Databases(session.list_databases().await),
        SessionCommand::SelectDatabase(database) => {
            match session.select_database(&database).await {
                Ok(()) => SessionEvent::DatabaseSelected {
                    database,
                    result: Ok(()),
                },
                Err(SessionError::Connection(error)) => SessionEvent::DatabaseSelected {
                    database,
                    result: Err(error),
                },
                Err(error) => SessionEvent::Rejected(error),
            }
        }
        SessionCommand::ListTables => {
            let tables = session.list_tables().await;
            SessionEvent::Tables {
                database: session.database().map(str::to_string),
                tables,
            }
        }
        SessionCommand::LoadTable(table) => {
            let content = session.get_table_content(&table).await;
            SessionEvent::TableLoaded { table, content }
        }
        SessionCommand::Disconnect => {
            session.disconnect().await;
            SessionEvent::Disconnected
        }
    }
}
