//! dbupdate-core - make sure a MySQL database and its events table exist
//!
//! The run is a single pass driven by [`Bootstrapper`]: connect to the
//! server, create the configured database if it is missing, select it,
//! then create `crs_event` from the column names in `update/config.json`.

pub mod backend;
pub mod bootstrap;
pub mod config;
pub mod console;
pub mod ddl;
pub mod descriptor;
pub mod error;
pub mod ident;

pub use backend::{Connector, MockConnector, MySqlConnector, ServerSession};
pub use bootstrap::{plan, Bootstrapper, EntryReport, Outcome, Stage, UpdateReport};
pub use config::{default_descriptor_path, load_dotenv, ConnectionSettings};
pub use console::Console;
pub use descriptor::{DescriptorEntry, EventColumns, SchemaDescriptor};
pub use error::{BootstrapError, Result};
