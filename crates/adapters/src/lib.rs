pub mod mysql;

use ulti_core::adapter::BoxedAdapter;
use ulti_core::config::AppConfig;
use ulti_core::registry::AdapterRegistry;

use crate::mysql::{MysqlAdapter, ENGINE_NAME as MYSQL};

/// Registry with every engine this build supports, configured from `config`.
#[must_use]
pub fn default_registry(config: &AppConfig) -> AdapterRegistry {
    let preview_row_limit = config.browser.preview_row_limit;
    let connect_timeout = config.connection.connect_timeout();

    let mut registry = AdapterRegistry::new();
    registry.register(MYSQL, move || -> BoxedAdapter {
        Box::new(
            MysqlAdapter::new()
                .with_preview_row_limit(preview_row_limit)
                .with_connect_timeout(connect_timeout),
        )
    });
    registry
}

#[cfg(test)]
mod tests {
    use ulti_core::adapter::DatabaseAdapter;
    use ulti_core::config::AppConfig;

    use super::default_registry;

    #[test]
    fn default_registry_offers_mysql() {
        let registry = default_registry(&AppConfig::default());
        assert_eq!(registry.engines(), vec!["MySQL"]);

        let adapter = registry.create("MySQL (8.x)").expect("mysql is registered");
        assert_eq!(adapter.engine(), "MySQL");
        assert!(!adapter.is_connected());
        assert!(registry.create("PostgreSQL").is_err());
    }
}
