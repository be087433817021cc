//! Database server access
//!
//! Provides a trait pair for talking to the server, with:
//! - Real implementation over a single `sqlx` MySQL connection
//! - Mock implementation for testing
//! - Connect timeout enforcement

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection;
use tracing::debug;

use crate::config::ConnectionSettings;
use crate::error::{BootstrapError, Result};

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Opens sessions against a server (testable)
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to the server itself; no database is selected.
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn ServerSession>>;
}

/// One exclusively owned server connection
#[async_trait]
pub trait ServerSession: Send {
    /// Names of all databases visible to this user
    async fn list_databases(&mut self) -> Result<Vec<String>>;

    /// Run one statement (DDL or directive) through the text protocol
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Commit whatever the session has pending
    async fn commit(&mut self) -> Result<()>;

    /// Release the connection. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}

// ============================================================================
// MySQL
// ============================================================================

/// Real connector using a single `MySqlConnection`
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    timeout: Duration,
}

impl Default for MySqlConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
    }
}

impl MySqlConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn options(settings: &ConnectionSettings) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn ServerSession>> {
        let options = Self::options(settings);
        debug!(host = %settings.host, port = settings.port, "opening server connection");

        match tokio::time::timeout(self.timeout, MySqlConnection::connect_with(&options)).await {
            Ok(Ok(conn)) => Ok(Box::new(MySqlSession { conn: Some(conn) })),
            Ok(Err(e)) => Err(BootstrapError::connection(e.to_string())),
            Err(_) => Err(BootstrapError::connection(format!(
                "timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

/// Session over one MySQL connection
pub struct MySqlSession {
    conn: Option<MySqlConnection>,
}

impl MySqlSession {
    fn conn(&mut self) -> Result<&mut MySqlConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| BootstrapError::connection("session already closed"))
    }
}

#[async_trait]
impl ServerSession for MySqlSession {
    async fn list_databases(&mut self) -> Result<Vec<String>> {
        const SQL: &str = "SHOW DATABASES";
        let conn = self.conn()?;
        sqlx::query_scalar::<_, String>(SQL)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| BootstrapError::statement(SQL, e))
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        let conn = self.conn()?;
        // No bound arguments, so this goes over the text protocol (USE needs it)
        sqlx::Executor::execute(&mut *conn, sql)
            .await
            .map_err(|e| BootstrapError::statement(sql, e))?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT").await
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| BootstrapError::connection(e.to_string()))?;
        }
        Ok(())
    }
}

// ============================================================================
// Mock
// ============================================================================

/// Observable state of a [`MockConnector`]'s fake server
#[derive(Debug, Default)]
pub struct MockServer {
    reachable: bool,
    databases: BTreeMap<String, BTreeSet<String>>,
    current: Option<String>,
    statements: Vec<String>,
    failing_patterns: Vec<String>,
    connects: usize,
    commits: usize,
    closes: usize,
    schema_changes: usize,
}

/// Mock connector for testing
///
/// Understands just enough SQL to follow the bootstrap flow and records
/// every statement it receives.
#[derive(Debug, Clone)]
pub struct MockConnector {
    server: Arc<Mutex<MockServer>>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            server: Arc::new(Mutex::new(MockServer {
                reachable: true,
                ..Default::default()
            })),
        }
    }

    /// A server that refuses every connection
    pub fn unreachable() -> Self {
        let mock = Self::new();
        mock.state().reachable = false;
        mock
    }

    /// Pre-create a database
    pub fn with_database(self, name: &str) -> Self {
        self.state().databases.entry(name.to_string()).or_default();
        self
    }

    /// Any statement containing `pattern` fails with a server error
    pub fn fail_statements_containing(self, pattern: &str) -> Self {
        self.state().failing_patterns.push(pattern.to_string());
        self
    }

    fn state(&self) -> MutexGuard<'_, MockServer> {
        self.server.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn statements(&self) -> Vec<String> {
        self.state().statements.clone()
    }

    pub fn databases(&self) -> Vec<String> {
        self.state().databases.keys().cloned().collect()
    }

    pub fn has_table(&self, database: &str, table: &str) -> bool {
        self.state()
            .databases
            .get(database)
            .is_some_and(|tables| tables.contains(table))
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    pub fn commits(&self) -> usize {
        self.state().commits
    }

    pub fn closes(&self) -> usize {
        self.state().closes
    }

    /// Databases or tables actually created (not counting IF NOT EXISTS no-ops)
    pub fn schema_changes(&self) -> usize {
        self.state().schema_changes
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _settings: &ConnectionSettings) -> Result<Box<dyn ServerSession>> {
        let mut state = self.state();
        state.connects += 1;
        if !state.reachable {
            return Err(BootstrapError::connection("connection refused"));
        }
        Ok(Box::new(MockSession {
            server: Arc::clone(&self.server),
            open: true,
        }))
    }
}

impl MockServer {
    /// Log a statement, failing it if it matches a configured pattern
    fn record(&mut self, sql: &str) -> Result<()> {
        self.statements.push(sql.to_string());
        if self.failing_patterns.iter().any(|p| sql.contains(p.as_str())) {
            return Err(BootstrapError::statement(
                sql,
                mock_error("You have an error in your SQL syntax"),
            ));
        }
        Ok(())
    }
}

struct MockSession {
    server: Arc<Mutex<MockServer>>,
    open: bool,
}

impl MockSession {
    fn state(&self) -> MutexGuard<'_, MockServer> {
        self.server.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Strip one pair of backticks
fn unquote(name: &str) -> String {
    name.trim().trim_matches('`').to_string()
}

fn mock_error(msg: impl Into<String>) -> sqlx::Error {
    sqlx::Error::Protocol(msg.into())
}

#[async_trait]
impl ServerSession for MockSession {
    async fn list_databases(&mut self) -> Result<Vec<String>> {
        let mut state = self.state();
        state.record("SHOW DATABASES")?;
        Ok(state.databases.keys().cloned().collect())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        let mut state = self.state();
        state.record(sql)?;

        if let Some(name) = sql.strip_prefix("CREATE DATABASE IF NOT EXISTS ") {
            let name = unquote(name);
            if !state.databases.contains_key(&name) {
                state.databases.insert(name, BTreeSet::new());
                state.schema_changes += 1;
            }
        } else if let Some(name) = sql.strip_prefix("USE ") {
            let name = unquote(name);
            if !state.databases.contains_key(&name) {
                return Err(BootstrapError::statement(
                    sql,
                    mock_error(format!("Unknown database '{}'", name)),
                ));
            }
            state.current = Some(name);
        } else if let Some(rest) = sql.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
            let table = rest.split_whitespace().next().map(unquote).unwrap_or_default();
            let Some(current) = state.current.clone() else {
                return Err(BootstrapError::statement(sql, mock_error("No database selected")));
            };
            let tables = state.databases.entry(current).or_default();
            if tables.insert(table) {
                state.schema_changes += 1;
            }
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let mut state = self.state();
        state.record("COMMIT")?;
        state.commits += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.state().closes += 1;
        }
        Ok(())
    }
}
