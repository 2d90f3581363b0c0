pub mod adapter;
pub mod config;
pub mod params;
pub mod registry;
pub mod session;
pub mod sql;
pub mod worker;

#[cfg(test)]
mod fake;

pub use adapter::{BoxedAdapter, CellValue, ConnectionError, DatabaseAdapter, TableContent};
pub use config::AppConfig;
pub use params::{ConnectionParameters, ParametersError, Password};
pub use registry::{AdapterFactory, AdapterRegistry, RegistryError};
pub use session::{ConnectionSession, SessionError, SessionState, TestAttempt};
pub use worker::{spawn_session_worker, SessionCommand, SessionEvent, SessionHandle};
