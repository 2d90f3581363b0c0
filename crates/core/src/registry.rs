use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::adapter::BoxedAdapter;

pub type AdapterFactory = Arc<dyn Fn() -> BoxedAdapter + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("database type `{0}` is not supported")]
    UnsupportedEngine(String),
}

/// Engine identifier to adapter constructor.
///
/// Keys are stored lowercase; [`AdapterRegistry::engines`] reports the names
/// as they were registered.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, (String, AdapterFactory)>,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("engines", &self.engines())
            .finish()
    }
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, engine: impl Into<String>, factory: F)
    where
        F: Fn() -> BoxedAdapter + Send + Sync + 'static,
    {
        let engine = engine.into();
        let factory: AdapterFactory = Arc::new(factory);
        self.factories
            .insert(engine.to_ascii_lowercase(), (engine, factory));
    }

    #[must_use]
    pub fn engines(&self) -> Vec<&str> {
        self.factories
            .values()
            .map(|(engine, _)| engine.as_str())
            .collect()
    }

    /// Resolves a display label such as `"MySQL (8.x)"` to its factory. Only
    /// the first word of the label identifies the engine.
    pub fn factory(&self, label: &str) -> Result<AdapterFactory, RegistryError> {
        let engine = engine_identifier(label);
        self.factories
            .get(&engine.to_ascii_lowercase())
            .map(|(_, factory)| Arc::clone(factory))
            .ok_or_else(|| RegistryError::UnsupportedEngine(engine.to_string()))
    }

    pub fn create(&self, label: &str) -> Result<BoxedAdapter, RegistryError> {
        self.factory(label).map(|factory| (*factory)())
    }
}

fn engine_identifier(label: &str) -> &str {
    label.split_whitespace().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::{AdapterRegistry, RegistryError};
    use crate::adapter::{BoxedAdapter, ConnectionError, DatabaseAdapter, TableContent};
    use crate::params::ConnectionParameters;

    #[derive(Debug, Default)]
    struct NullAdapter;

    #[async_trait]
    impl DatabaseAdapter for NullAdapter {
        fn engine(&self) -> &str {
            "Null"
        }

        fn is_connected(&self) -> bool {
            false
        }

        async fn connect(&mut self, _parameters: &ConnectionParameters) -> Result<(), ConnectionError> {
            Ok(())
        }

        async fn disconnect(&mut self) {}

        async fn list_databases(&mut self) -> Vec<String> {
            Vec::new()
        }

        async fn list_tables(&mut self) -> Vec<String> {
            Vec::new()
        }

        async fn get_table_content(&mut self, _table_name: &str) -> Option<TableContent> {
            None
        }

        async fn select_database(&mut self, _name: &str) -> Result<(), ConnectionError> {
            Err(ConnectionError::NotConnected)
        }
    }

    fn null_adapter() -> BoxedAdapter {
        Box::new(NullAdapter)
    }

    #[test]
    fn resolves_labels_by_first_word_case_insensitively() {
        let mut registry = AdapterRegistry::new();
        registry.register("Null", null_adapter);

        assert_eq!(registry.engines(), vec!["Null"]);
        assert!(registry.create("Null").is_ok());
        assert!(registry.create("null (in-memory)").is_ok());
    }

    #[test]
    fn unknown_engines_are_reported_by_identifier() {
        let registry = AdapterRegistry::new();
        let err = registry
            .create("PostgreSQL (not implemented)")
            .expect_err("empty registry cannot create adapters");
        assert_eq!(err, RegistryError::UnsupportedEngine("PostgreSQL".to_string()));

        let err = registry.create("   ").expect_err("blank label is unsupported");
        assert_eq!(err, RegistryError::UnsupportedEngine(String::new()));
    }
}
