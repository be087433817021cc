use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_PASSWORD: &str = "";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_DATABASE: &str = "railway";

/// Descriptor location relative to the base directory
pub const DESCRIPTOR_RELATIVE_PATH: &str = "update/config.json";

/// Load `<base_dir>/.env` into the process environment.
///
/// Variables that are already set are left alone (dotenvy never
/// overwrites). A missing or unreadable file only produces a log line;
/// defaults cover whatever it would have set.
///
/// Returns the path that was loaded, if any.
pub fn load_dotenv(base_dir: &Path) -> Option<PathBuf> {
    let env_file = base_dir.join(".env");

    if !env_file.exists() {
        debug!("No .env file at {}", env_file.display());
        info!("Using environment variables only (no .env file found)");
        return None;
    }

    match dotenvy::from_path(&env_file) {
        Ok(()) => {
            info!("Loaded configuration from {}", env_file.display());
            Some(env_file)
        }
        Err(e) => {
            warn!("Failed to load {}: {}", env_file.display(), e);
            None
        }
    }
}

/// Default descriptor path for a base directory
pub fn default_descriptor_path(base_dir: &Path) -> PathBuf {
    base_dir.join(DESCRIPTOR_RELATIVE_PATH)
}

/// Server connection parameters, fixed for the whole run.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    pub database: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl ConnectionSettings {
    /// Read `DB_HOST`, `DB_USER`, `DB_PASSWORD`, `DB_PORT` and `DB_NAME`
    /// from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    ///
    /// Never fails: absent keys take their default, and a `DB_PORT` that
    /// is not a valid port number is logged and replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("DB_PORT") {
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) => port,
                Err(e) => {
                    warn!(value = %raw, "Invalid DB_PORT ({}), using {}", e, DEFAULT_PORT);
                    DEFAULT_PORT
                }
            },
            None => defaults.port,
        };

        Self {
            host: lookup("DB_HOST").unwrap_or(defaults.host),
            user: lookup("DB_USER").unwrap_or(defaults.user),
            password: lookup("DB_PASSWORD").unwrap_or(defaults.password),
            port,
            database: lookup("DB_NAME").unwrap_or(defaults.database),
        }
    }
}

// Keep the password out of logs
impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}
