//! DDL statement builders
//!
//! Every identifier is validated by [`crate::ident`] and backtick-quoted
//! before it is placed into statement text.

use std::collections::HashSet;

use crate::descriptor::EventColumns;
use crate::error::{BootstrapError, Result};
use crate::ident::{self, IdentifierError};

/// The single table this tool manages
pub const EVENTS_TABLE: &str = "crs_event";

/// Implicit primary key column
pub const ID_COLUMN: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    DateTime,
}

impl ColumnType {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::DateTime => "DATETIME",
        }
    }
}

/// `CREATE DATABASE IF NOT EXISTS` for a validated name
pub fn create_database(name: &str) -> Result<String> {
    ident::validate_name(name).map_err(|e| BootstrapError::invalid_identifier(name, e))?;
    Ok(format!("CREATE DATABASE IF NOT EXISTS {}", ident::quote(name)))
}

/// `USE` directive for a validated name
pub fn use_database(name: &str) -> Result<String> {
    ident::validate_name(name).map_err(|e| BootstrapError::invalid_identifier(name, e))?;
    Ok(format!("USE {}", ident::quote(name)))
}

/// Column list for the events table, in declaration order
pub fn event_column_defs(columns: &EventColumns) -> [(&str, ColumnType); 5] {
    [
        (columns.title.as_str(), ColumnType::Text),
        (columns.description.as_str(), ColumnType::Text),
        (columns.category.as_str(), ColumnType::Text),
        (columns.start_date.as_str(), ColumnType::DateTime),
        (columns.end_date.as_str(), ColumnType::DateTime),
    ]
}

/// Build the `CREATE TABLE IF NOT EXISTS crs_event (...)` statement.
///
/// Fails without producing any SQL if a column name is refused by the
/// validator or appears twice (column names compare case-insensitively,
/// and `id` is taken by the primary key).
pub fn create_events_table(columns: &EventColumns) -> Result<String> {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(ID_COLUMN.to_string());

    let mut defs = vec![format!(
        "{} INT AUTO_INCREMENT PRIMARY KEY",
        ident::quote(ID_COLUMN)
    )];

    for (name, ty) in event_column_defs(columns) {
        ident::validate(name).map_err(|e| BootstrapError::invalid_identifier(name, e))?;
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(BootstrapError::invalid_identifier(
                name,
                IdentifierError::Duplicate,
            ));
        }
        defs.push(format!("{} {}", ident::quote(name), ty.as_sql()));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        EVENTS_TABLE,
        defs.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: [&str; 5]) -> EventColumns {
        EventColumns {
            title: names[0].into(),
            description: names[1].into(),
            category: names[2].into(),
            start_date: names[3].into(),
            end_date: names[4].into(),
        }
    }

    #[test]
    fn builds_events_table() {
        let sql = create_events_table(&columns([
            "title",
            "description",
            "category",
            "start_date",
            "end_date",
        ]))
        .unwrap();

        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS crs_event (`id` INT AUTO_INCREMENT PRIMARY KEY, \
             `title` TEXT, `description` TEXT, `category` TEXT, \
             `start_date` DATETIME, `end_date` DATETIME)"
        );
    }

    #[test]
    fn refuses_semicolon_column() {
        let err = create_events_table(&columns([
            "title; DROP TABLE x",
            "description",
            "category",
            "start_date",
            "end_date",
        ]))
        .unwrap_err();

        match err {
            BootstrapError::InvalidIdentifier { value, source } => {
                assert_eq!(value, "title; DROP TABLE x");
                assert_eq!(source, IdentifierError::InvalidCharacter { ch: ';' });
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn refuses_duplicate_and_id_columns() {
        let err = create_events_table(&columns(["a", "b", "A", "d", "e"])).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::InvalidIdentifier {
                source: IdentifierError::Duplicate,
                ..
            }
        ));

        let err = create_events_table(&columns(["ID", "b", "c", "d", "e"])).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::InvalidIdentifier {
                source: IdentifierError::Duplicate,
                ..
            }
        ));
    }

    #[test]
    fn refuses_reserved_column() {
        let err = create_events_table(&columns(["title", "desc", "c", "d", "e"])).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::InvalidIdentifier {
                source: IdentifierError::Reserved,
                ..
            }
        ));
    }

    #[test]
    fn database_statements_are_quoted() {
        assert_eq!(
            create_database("railway").unwrap(),
            "CREATE DATABASE IF NOT EXISTS `railway`"
        );
        assert_eq!(use_database("railway").unwrap(), "USE `railway`");
        assert!(use_database("rail`way").is_err());
        assert!(create_database("").is_err());
    }
}
