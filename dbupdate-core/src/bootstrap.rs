//! The bootstrap run
//!
//! One linear pass: connect, make sure the target database exists, select
//! it, read the descriptor, create the events table, commit, close.
//! Every path that opened a session closes it exactly once.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::backend::{Connector, ServerSession};
use crate::config::ConnectionSettings;
use crate::console::Console;
use crate::ddl;
use crate::descriptor::{DescriptorEntry, SchemaDescriptor};
use crate::error::{BootstrapError, Result};

/// Where the run was when it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connecting,
    LocatingDatabase,
    CreatingDatabase,
    SelectingDatabase,
    LocatingConfig,
    ApplyingUpdates,
    Committed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::LocatingDatabase => "locating database",
            Self::CreatingDatabase => "creating database",
            Self::SelectingDatabase => "selecting database",
            Self::LocatingConfig => "locating configuration",
            Self::ApplyingUpdates => "applying updates",
            Self::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// Result of a single descriptor entry
#[derive(Debug)]
pub struct EntryReport {
    pub index: usize,
    pub result: std::result::Result<String, BootstrapError>,
}

impl EntryReport {
    pub fn is_applied(&self) -> bool {
        self.result.is_ok()
    }
}

/// What a committed run did
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub database_created: bool,
    pub entries: Vec<EntryReport>,
}

impl UpdateReport {
    pub fn applied(&self) -> usize {
        self.entries.iter().filter(|e| e.is_applied()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.applied()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

/// Terminal state of a run
#[derive(Debug)]
pub enum Outcome {
    /// Loop finished and the session was committed
    Committed(UpdateReport),
    /// Server could not be reached; nothing else was attempted
    ConnectionFailed { reason: String },
    /// Descriptor file absent; nothing was committed
    ConfigNotFound { path: PathBuf },
    /// Anything else that stopped the update phase
    UpdateFailed { stage: Stage, error: BootstrapError },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

/// Turn one descriptor entry into its `CREATE TABLE` statement.
///
/// Fails for a missing key or a refused identifier; nothing is executed.
pub fn plan_entry(index: usize, entry: &DescriptorEntry) -> Result<String> {
    let columns = entry.event_columns(index)?;
    ddl::create_events_table(&columns)
}

/// Plan every entry of a descriptor without touching a server
pub fn plan(descriptor: &SchemaDescriptor) -> Vec<EntryReport> {
    descriptor
        .entries
        .iter()
        .enumerate()
        .map(|(index, entry)| EntryReport {
            index,
            result: plan_entry(index, entry),
        })
        .collect()
}

/// Drives one run against a server
pub struct Bootstrapper<'a> {
    settings: &'a ConnectionSettings,
    descriptor_path: PathBuf,
    connector: &'a dyn Connector,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(
        settings: &'a ConnectionSettings,
        descriptor_path: impl Into<PathBuf>,
        connector: &'a dyn Connector,
    ) -> Self {
        Self {
            settings,
            descriptor_path: descriptor_path.into(),
            connector,
        }
    }

    pub fn descriptor_path(&self) -> &Path {
        &self.descriptor_path
    }

    pub async fn run(&self, console: &mut Console) -> Outcome {
        console.opening_banner();
        console.step("ESTABLISHING CONNECTIONS");
        info!(
            host = %self.settings.host,
            port = self.settings.port,
            user = %self.settings.user,
            "connecting to server"
        );

        let mut session = match self.connector.connect(self.settings).await {
            Ok(session) => session,
            Err(e) => {
                let reason = match e {
                    BootstrapError::Connection { reason } => reason,
                    other => other.to_string(),
                };
                error!(
                    host = %self.settings.host,
                    port = self.settings.port,
                    database = %self.settings.database,
                    "connection failed: {}",
                    reason
                );
                console.connection_failure(self.settings, &reason);
                console.flush();
                return Outcome::ConnectionFailed { reason };
            }
        };
        console.done("CONNECTED TO SERVER");

        let outcome = match self.run_session(session.as_mut(), console).await {
            Ok(report) => Outcome::Committed(report),
            Err((_, BootstrapError::ConfigNotFound { path })) => {
                warn!(path = %path.display(), "descriptor not found");
                console.config_not_found(&path);
                Outcome::ConfigNotFound { path }
            }
            Err((stage, error)) => {
                error!(%stage, "update failed: {}", error);
                console.update_failure(&error.to_string());
                if let Some(statement) = error.statement_text() {
                    console.done(statement);
                }
                Outcome::UpdateFailed { stage, error }
            }
        };

        if let Err(e) = session.close().await {
            warn!("failed to close connection cleanly: {}", e);
        }
        debug!("connection closed");
        console.flush();
        outcome
    }

    async fn run_session(
        &self,
        session: &mut dyn ServerSession,
        console: &mut Console,
    ) -> std::result::Result<UpdateReport, (Stage, BootstrapError)> {
        let database = self.settings.database.as_str();
        let mut report = UpdateReport::default();

        console.step("LOCATING DATABASE");
        let databases = session
            .list_databases()
            .await
            .map_err(|e| (Stage::LocatingDatabase, e))?;

        if databases.iter().any(|name| name == database) {
            info!(%database, "database located");
            console.done("DATABASE LOCATED");
        } else {
            console.step(&format!("CREATING DATABASE: {}", database));
            let sql = ddl::create_database(database).map_err(|e| (Stage::CreatingDatabase, e))?;
            session
                .execute(&sql)
                .await
                .map_err(|e| (Stage::CreatingDatabase, e))?;
            info!(%database, "database created");
            console.done("DATABASE CREATED");
            report.database_created = true;
        }

        let sql = ddl::use_database(database).map_err(|e| (Stage::SelectingDatabase, e))?;
        session
            .execute(&sql)
            .await
            .map_err(|e| (Stage::SelectingDatabase, e))?;

        console.step("LOCATING DATABASE CONFIGURATIONS");
        let descriptor =
            SchemaDescriptor::load(&self.descriptor_path).map_err(|e| (Stage::LocatingConfig, e))?;
        console.done("CONFIGURATIONS LOCATED");

        console.step("APPLYING DATABASE UPDATES");
        console.whats_new();
        for (index, entry) in descriptor.entries.iter().enumerate() {
            let result = match plan_entry(index, entry) {
                Ok(sql) => match session.execute(&sql).await {
                    Ok(()) => Ok(sql),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            match &result {
                Ok(sql) => {
                    info!(entry = index, statement = %sql, "entry applied");
                    console.entry_applied(index);
                }
                Err(e) => {
                    warn!(entry = index, "entry failed: {}", e);
                    let detail = match e {
                        BootstrapError::Statement { statement, .. } => Some(statement.as_str()),
                        BootstrapError::InvalidIdentifier { value, .. } => Some(value.as_str()),
                        _ => None,
                    };
                    console.entry_failed(index, &e.to_string(), detail);
                }
            }
            report.entries.push(EntryReport { index, result });
        }

        session
            .commit()
            .await
            .map_err(|e| (Stage::ApplyingUpdates, e))?;
        console.done("DATABASE UPDATES APPLIED");
        console.summary(report.applied(), report.failed());
        console.closing_banner();

        info!(
            applied = report.applied(),
            failed = report.failed(),
            database_created = report.database_created,
            stage = %Stage::Committed,
            "updates committed"
        );
        Ok(report)
    }
}
