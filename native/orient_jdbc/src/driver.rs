/// Driver entry point and data source
///
/// URLs have the form `jdbc:orient:<engine>:<database>`. The engine part
/// selects a backend from the process-wide registry; the remainder (engine
/// prefix included) is handed to that backend's `open`.
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendError};
use crate::connection::Connection;
use crate::constants::{
    property, DRIVER_MAJOR_VERSION, DRIVER_MINOR_VERSION, DRIVER_NAME, ENGINE_REGISTRY,
    URL_PREFIX,
};
use crate::decode::decode_connection_kind;
use crate::error::{message, JdbcError, Result};
use crate::utils::safe_lock;

/// String key/value connection properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    values: HashMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Properties::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Stateless driver; all state lives in the engine registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Driver;

impl Driver {
    pub fn new() -> Self {
        Driver
    }

    /// Register (or replace) the backend serving `engine` URLs.
    pub fn register_engine(engine: &str, backend: Arc<dyn Backend>) -> Result<()> {
        let mut registry = safe_lock(&ENGINE_REGISTRY, "Driver::register_engine")?;
        registry.insert(engine.to_string(), backend);
        info!(engine, "storage engine registered");
        Ok(())
    }

    /// Backend registered for `engine`, if any.
    pub fn engine(engine: &str) -> Result<Option<Arc<dyn Backend>>> {
        let registry = safe_lock(&ENGINE_REGISTRY, "Driver::engine")?;
        Ok(registry.get(engine).cloned())
    }

    pub fn accepts_url(&self, url: &str) -> bool {
        url.starts_with(URL_PREFIX)
    }

    /// Open a connection.
    ///
    /// # Arguments
    /// - `url`: `jdbc:orient:<engine>:<database>`
    /// - `info`: `user`, `password` and optionally `type`
    ///
    /// Returns `Ok(None)` when the URL belongs to another driver.
    pub fn connect(&self, url: &str, info: &Properties) -> Result<Option<Connection>> {
        if url.is_empty() {
            return Err(JdbcError::argument("Driver.emptyUrl", &[]));
        }
        let Some(location) = url.strip_prefix(URL_PREFIX) else {
            debug!(url, "url not handled by this driver");
            return Ok(None);
        };

        let (engine, database) = location.split_once(':').unwrap_or((location, ""));
        if engine.is_empty() || database.is_empty() {
            return Err(JdbcError::argument("Driver.malformedUrl", &[&url, &URL_PREFIX]));
        }

        let backend = Self::engine(engine)?.ok_or_else(|| {
            warn!(engine, "no storage engine registered");
            JdbcError::Backend {
                message: message("Driver.unknownEngine", &[&engine]),
                source: BackendError::NotFound(engine.to_string()),
            }
        })?;

        let kind = decode_connection_kind(info.get(property::CONNECTION_TYPE))?;
        let user = info.get(property::USER).unwrap_or_default();
        let password = info.get(property::PASSWORD).unwrap_or_default();

        Connection::open(kind, backend, location, user, password).map(Some)
    }

    /// Full driver name and version.
    pub fn version() -> String {
        format!("{DRIVER_NAME} v{DRIVER_MAJOR_VERSION}.{DRIVER_MINOR_VERSION}")
    }

    pub fn get_major_version(&self) -> i32 {
        DRIVER_MAJOR_VERSION
    }

    pub fn get_minor_version(&self) -> i32 {
        DRIVER_MINOR_VERSION
    }

    pub fn jdbc_compliant(&self) -> bool {
        false
    }
}

/// Connection factory with preset URL and credentials.
#[derive(Debug, Clone)]
pub struct DataSource {
    url: String,
    username: String,
    password: String,
    info: Option<Properties>,
    login_timeout: i32,
}

impl DataSource {
    pub fn new(url: &str, username: &str, password: &str) -> Self {
        DataSource {
            url: url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            info: None,
            login_timeout: 0,
        }
    }

    /// Base properties merged into every connection request.
    pub fn with_info(mut self, info: Properties) -> Self {
        self.info = Some(info);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn get_connection(&self) -> Result<Connection> {
        self.get_connection_with(&self.username, &self.password)
    }

    /// Connect with explicit credentials, overriding the preset ones.
    pub fn get_connection_with(&self, username: &str, password: &str) -> Result<Connection> {
        let info = self
            .info
            .clone()
            .unwrap_or_default()
            .with(property::USER, username)
            .with(property::PASSWORD, password);

        Driver::new()
            .connect(&self.url, &info)?
            .ok_or_else(|| JdbcError::argument("Driver.malformedUrl", &[&self.url, &URL_PREFIX]))
    }

    pub fn get_login_timeout(&self) -> i32 {
        self.login_timeout
    }

    pub fn set_login_timeout(&mut self, seconds: i32) {
        self.login_timeout = seconds;
    }
}
