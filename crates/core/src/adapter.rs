use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::params::ConnectionParameters;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("access denied: check the user name and password")]
    AccessDenied,
    #[error("database does not exist")]
    UnknownDatabase,
    #[error("{0}")]
    Other(String),
    #[error("not connected")]
    NotConnected,
}

impl ConnectionError {
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// A single cell of a previewed row. No schema is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl CellValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Headers plus rows of a table preview.
///
/// A successful preview of an empty table keeps its headers and has no rows;
/// failures are reported as `None` by [`DatabaseAdapter::get_table_content`]
/// and never as an empty `TableContent`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableContent {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl TableContent {
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Capability set over one database engine.
///
/// Every method reports failure through its return value. Listing methods
/// return an empty vector when not connected, and
/// [`get_table_content`](Self::get_table_content) returns `None` on any
/// query failure.
#[async_trait]
pub trait DatabaseAdapter: Send {
    fn engine(&self) -> &str;

    fn is_connected(&self) -> bool;

    async fn connect(&mut self, parameters: &ConnectionParameters) -> Result<(), ConnectionError>;

    /// Idempotent.
    async fn disconnect(&mut self);

    async fn list_databases(&mut self) -> Vec<String>;

    async fn list_tables(&mut self) -> Vec<String>;

    async fn get_table_content(&mut self, table_name: &str) -> Option<TableContent>;

    /// Makes `name` the default database of the live connection. Engines that
    /// cannot switch in place reconnect here, releasing the old connection
    /// first.
    async fn select_database(&mut self, name: &str) -> Result<(), ConnectionError>;
}

pub type BoxedAdapter = Box<dyn DatabaseAdapter>;

impl fmt::Debug for dyn DatabaseAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseAdapter")
            .field("engine", &self.engine())
            .field("is_connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{CellValue, ConnectionError, TableContent};

    #[test]
    fn cell_values_render_like_the_driver_text_protocol() {
        assert_eq!(CellValue::Null.to_string(), "NULL");
        assert_eq!(CellValue::Int(-8).to_string(), "-8");
        assert_eq!(CellValue::UInt(8).to_string(), "8");
        assert_eq!(CellValue::Float(1.5).to_string(), "1.5");
        assert_eq!(CellValue::from("alpha").to_string(), "alpha");
        assert!(CellValue::Null.is_null());
    }

    #[test]
    fn empty_table_keeps_headers() {
        let content = TableContent::new(vec!["id".to_string()], Vec::new());
        assert!(content.is_empty());
        assert_eq!(content.headers, vec!["id".to_string()]);
        assert_eq!(content.row_count(), 0);
    }

    #[test]
    fn connection_errors_have_readable_messages() {
        assert_eq!(
            ConnectionError::other("socket closed").to_string(),
            "socket closed"
        );
        assert_eq!(ConnectionError::NotConnected.to_string(), "not connected");
    }
}
