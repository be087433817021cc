//! JSON schema descriptor (`update/config.json`)
//!
//! The file is an array of entries shaped like
//! `{"events": {"eventTitle": "title", ...}}`. The values are column
//! names, not data.

use std::io;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{BootstrapError, Result};

pub const KEY_TITLE: &str = "eventTitle";
pub const KEY_DESCRIPTION: &str = "eventDescription";
pub const KEY_CATEGORY: &str = "eventCategory";
pub const KEY_START_DATE: &str = "eventStartDate";
pub const KEY_END_DATE: &str = "eventEndDate";

/// Ordered list of descriptor entries, read once per run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SchemaDescriptor {
    pub entries: Vec<DescriptorEntry>,
}

/// One element of the descriptor array.
///
/// `events` is kept loosely typed so that a single malformed entry fails
/// on its own instead of rejecting the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescriptorEntry {
    #[serde(default)]
    pub events: Option<Map<String, Value>>,
}

/// Column names for the events table, taken verbatim from an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventColumns {
    pub title: String,
    pub description: String,
    pub category: String,
    pub start_date: String,
    pub end_date: String,
}

impl SchemaDescriptor {
    /// Read and parse the descriptor at `path`.
    ///
    /// A missing file maps to [`BootstrapError::ConfigNotFound`]; content
    /// that is not an array of objects maps to
    /// [`BootstrapError::DescriptorParse`].
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BootstrapError::config_not_found(path));
            }
            Err(e) => return Err(e.into()),
        };

        let descriptor = Self::from_json(&contents).map_err(|source| {
            BootstrapError::DescriptorParse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        debug!(
            "Loaded {} descriptor entries from {}",
            descriptor.len(),
            path.display()
        );
        Ok(descriptor)
    }

    pub fn from_json(contents: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DescriptorEntry {
    /// Pull the five column names out of the `events` mapping.
    ///
    /// `index` is only used for error reporting.
    pub fn event_columns(&self, index: usize) -> Result<EventColumns> {
        let events = self.events.as_ref().ok_or(BootstrapError::MissingField {
            field: "events",
            index,
        })?;

        let field = |key: &'static str| -> Result<String> {
            events
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(BootstrapError::MissingField { field: key, index })
        };

        Ok(EventColumns {
            title: field(KEY_TITLE)?,
            description: field(KEY_DESCRIPTION)?,
            category: field(KEY_CATEGORY)?,
            start_date: field(KEY_START_DATE)?,
            end_date: field(KEY_END_DATE)?,
        })
    }
}
