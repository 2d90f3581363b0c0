//! In-memory adapter used by the unit tests of this crate.

use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use crate::adapter::{BoxedAdapter, CellValue, ConnectionError, DatabaseAdapter, TableContent};
use crate::params::{ConnectionParameters, Password};
use crate::registry::AdapterRegistry;

pub const FAKE_PASSWORD: &str = "x";

#[derive(Debug, Default)]
pub struct FakeServer {
    databases: BTreeMap<String, BTreeMap<String, TableContent>>,
    live: AtomicUsize,
    max_live: AtomicUsize,
    created: AtomicUsize,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl FakeServer {
    /// `sales` with `orders`, and `hr` with `employees` and `departments`.
    pub fn sample() -> Arc<Self> {
        let mut databases = BTreeMap::new();

        let mut sales = BTreeMap::new();
        sales.insert(
            "orders".to_string(),
            TableContent::new(
                vec!["id".to_string(), "total".to_string()],
                vec![vec![CellValue::Int(1), CellValue::Float(9.5)]],
            ),
        );
        databases.insert("sales".to_string(), sales);

        let mut hr = BTreeMap::new();
        hr.insert(
            "employees".to_string(),
            TableContent::new(
                vec!["id".to_string(), "name".to_string(), "manager".to_string()],
                vec![
                    vec![CellValue::Int(1), CellValue::from("Ada"), CellValue::Null],
                    vec![CellValue::Int(2), CellValue::from("Linus"), CellValue::Int(1)],
                ],
            ),
        );
        hr.insert(
            "departments".to_string(),
            TableContent::new(vec!["id".to_string(), "name".to_string()], Vec::new()),
        );
        databases.insert("hr".to_string(), hr);

        Arc::new(Self {
            databases,
            ..Self::default()
        })
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().expect("fake log poisoned").clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().expect("fake log poisoned").push(entry);
    }

    pub fn adapter(self: &Arc<Self>) -> FakeAdapter {
        FakeAdapter {
            server: Arc::clone(self),
            id: self.created.fetch_add(1, Ordering::SeqCst) + 1,
            connected: false,
            database: None,
        }
    }

    pub fn registry(self: &Arc<Self>) -> AdapterRegistry {
        let server = Arc::clone(self);
        let mut registry = AdapterRegistry::new();
        registry.register("Fake", move || -> BoxedAdapter { Box::new(server.adapter()) });
        registry
    }
}

#[derive(Debug)]
pub struct FakeAdapter {
    server: Arc<FakeServer>,
    id: usize,
    connected: bool,
    database: Option<String>,
}

#[async_trait]
impl DatabaseAdapter for FakeAdapter {
    fn engine(&self) -> &str {
        "Fake"
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self, parameters: &ConnectionParameters) -> Result<(), ConnectionError> {
        self.disconnect().await;

        if parameters.password().expose() != FAKE_PASSWORD {
            return Err(ConnectionError::AccessDenied);
        }
        if let Some(database) = parameters.database() {
            if !self.server.databases.contains_key(database) {
                return Err(ConnectionError::UnknownDatabase);
            }
        }

        let live = self.server.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.server.max_live.fetch_max(live, Ordering::SeqCst);
        self.server.connects.fetch_add(1, Ordering::SeqCst);
        self.server.record(format!("connect {}", self.id));
        self.connected = true;
        self.database = parameters.database().map(str::to_string);
        Ok(())
    }

    async fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        self.server.live.fetch_sub(1, Ordering::SeqCst);
        self.server.disconnects.fetch_add(1, Ordering::SeqCst);
        self.server.record(format!("disconnect {}", self.id));
    }

    async fn list_databases(&mut self) -> Vec<String> {
        if !self.connected {
            return Vec::new();
        }
        self.server.databases.keys().rev().cloned().collect()
    }

    async fn list_tables(&mut self) -> Vec<String> {
        if !self.connected {
            return Vec::new();
        }
        let Some(tables) = self
            .database
            .as_ref()
            .and_then(|database| self.server.databases.get(database))
        else {
            return Vec::new();
        };
        tables.keys().rev().cloned().collect()
    }

    async fn get_table_content(&mut self, table_name: &str) -> Option<TableContent> {
        if !self.connected {
            return None;
        }
        self.server
            .databases
            .get(self.database.as_ref()?)?
            .get(table_name)
            .cloned()
    }

    async fn select_database(&mut self, name: &str) -> Result<(), ConnectionError> {
        if !self.connected {
            return Err(ConnectionError::NotConnected);
        }
        if !self.server.databases.contains_key(name) {
            return Err(ConnectionError::UnknownDatabase);
        }
        self.database = Some(name.to_string());
        Ok(())
    }
}

pub fn sample_parameters() -> ConnectionParameters {
    ConnectionParameters::new("127.0.0.1", 3306, "root", Password::new(FAKE_PASSWORD))
        .expect("sample parameters are valid")
}

pub fn wrong_password_parameters() -> ConnectionParameters {
    ConnectionParameters::new("127.0.0.1", 3306, "root", Password::new("nope"))
        .expect("sample parameters are valid")
}
