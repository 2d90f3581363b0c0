use std::fmt;

use thiserror::Error;

pub const DEFAULT_MYSQL_PORT: u16 = 3306;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParametersError {
    #[error("host cannot be empty")]
    EmptyHost,
    #[error("port must be between 1 and 65535, got `{0}`")]
    InvalidPort(String),
}

/// Connection secret. Never printed by `Debug` or `Display`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Everything an adapter needs to open a connection.
///
/// Fields are private so that a value can only be obtained through
/// [`ConnectionParameters::new`] or [`ConnectionParameters::parse`], both of
/// which reject an empty host and port 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    host: String,
    port: u16,
    user: String,
    password: Password,
    database: Option<String>,
}

impl ConnectionParameters {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: Password,
    ) -> Result<Self, ParametersError> {
        let host = host.into().trim().to_string();
        if host.is_empty() {
            return Err(ParametersError::EmptyHost);
        }
        if port == 0 {
            return Err(ParametersError::InvalidPort(port.to_string()));
        }

        Ok(Self {
            host,
            port,
            user: user.into(),
            password,
            database: None,
        })
    }

    /// Builds parameters from raw form input, where the port is still text.
    pub fn parse(
        host: &str,
        port: &str,
        user: &str,
        password: Password,
    ) -> Result<Self, ParametersError> {
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ParametersError::InvalidPort(port.trim().to_string()))?;
        Self::new(host, port, user, password)
    }

    #[must_use]
    pub fn with_database(mut self, database: Option<&str>) -> Self {
        self.database = normalize_database(database.map(str::to_string));
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn password(&self) -> &Password {
        &self.password
    }

    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub(crate) fn set_database(&mut self, database: Option<String>) {
        self.database = normalize_database(database);
    }

    /// `user@host:port`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }

    /// `user@host : database : table`, omitting the parts that are unknown.
    #[must_use]
    pub fn location_label(&self, table: Option<&str>) -> String {
        let mut label = format!("{}@{}", self.user, self.host);
        if let Some(database) = self.database() {
            label.push_str(" : ");
            label.push_str(database);
            if let Some(table) = table {
                label.push_str(" : ");
                label.push_str(table);
            }
        }
        label
    }
}

fn normalize_database(database: Option<String>) -> Option<String> {
    database.and_then(|raw| {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
