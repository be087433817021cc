//! SQL identifier validation
//!
//! Column and database names come from user-edited files and end up inside
//! DDL text, so every one of them passes through [`validate`] first. Only
//! plain ASCII identifiers survive; anything else is refused and reported.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// MySQL caps identifiers at 64 characters
pub const MAX_IDENTIFIER_LEN: usize = 64;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

/// Reserved words that cannot be used as bare column names
static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "add", "all", "alter", "and", "as", "asc", "before", "between", "both", "by",
        "call", "cascade", "case", "change", "check", "column", "condition", "constraint",
        "create", "cross", "database", "databases", "default", "delete", "desc",
        "describe", "distinct", "div", "drop", "else", "elseif", "exists", "explain",
        "false", "fetch", "for", "force", "foreign", "from", "function", "grant", "group",
        "groups", "having", "if", "ignore", "in", "index", "inner", "insert", "int",
        "integer", "interval", "into", "is", "join", "key", "keys", "kill", "leading",
        "left", "like", "limit", "lock", "match", "mod", "not", "null", "on", "option",
        "or", "order", "outer", "primary", "procedure", "range", "rank", "read",
        "references", "regexp", "rename", "replace", "require", "restrict", "return",
        "revoke", "right", "row", "rows", "schema", "select", "set", "show", "system",
        "table", "then", "to", "trigger", "true", "union", "unique", "update", "usage",
        "use", "using", "values", "when", "where", "while", "window", "with", "write",
    ]
    .into_iter()
    .collect()
});

/// Why an identifier was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Empty string
    Empty,

    /// Longer than [`MAX_IDENTIFIER_LEN`]
    TooLong { len: usize },

    /// Starts with a digit
    LeadingDigit,

    /// Contains something other than ASCII letters, digits or underscore
    InvalidCharacter { ch: char },

    /// Collides with a reserved word
    Reserved,

    /// Used twice within the same table definition
    Duplicate,
}

impl fmt::Display for IdentifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "identifier cannot be empty"),
            Self::TooLong { len } => write!(
                f,
                "identifier is {} characters, maximum is {}",
                len, MAX_IDENTIFIER_LEN
            ),
            Self::LeadingDigit => write!(f, "identifier cannot start with a digit"),
            Self::InvalidCharacter { ch } => {
                write!(f, "character {:?} is not allowed in identifiers", ch)
            }
            Self::Reserved => write!(f, "identifier is a reserved word"),
            Self::Duplicate => write!(f, "identifier is used more than once"),
        }
    }
}

impl std::error::Error for IdentifierError {}

/// Check the character rules only (used for database names, which are
/// always quoted and may therefore be reserved words).
pub fn validate_name(value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty);
    }
    let len = value.chars().count();
    if len > MAX_IDENTIFIER_LEN {
        return Err(IdentifierError::TooLong { len });
    }
    if IDENTIFIER_RE.is_match(value) {
        return Ok(());
    }

    // Regex failed: find the reason
    match value.chars().next() {
        Some(c) if c.is_ascii_digit() => Err(IdentifierError::LeadingDigit),
        _ => {
            let ch = value
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
                .unwrap_or('?');
            Err(IdentifierError::InvalidCharacter { ch })
        }
    }
}

/// Full column identifier check: character rules plus reserved words
pub fn validate(value: &str) -> Result<(), IdentifierError> {
    validate_name(value)?;
    if RESERVED_WORDS.contains(value.to_ascii_lowercase().as_str()) {
        return Err(IdentifierError::Reserved);
    }
    Ok(())
}

/// Backtick-quote an identifier that has already been validated
pub fn quote(value: &str) -> String {
    format!("`{}`", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        for ok in ["title", "start_date", "_private", "Event2", "a"] {
            assert_eq!(validate(ok), Ok(()), "{ok} should be accepted");
        }
    }

    #[test]
    fn rejects_injection_attempts() {
        assert_eq!(
            validate("title; DROP TABLE users"),
            Err(IdentifierError::InvalidCharacter { ch: ';' })
        );
        assert_eq!(
            validate("name`"),
            Err(IdentifierError::InvalidCharacter { ch: '`' })
        );
        assert_eq!(
            validate("two words"),
            Err(IdentifierError::InvalidCharacter { ch: ' ' })
        );
    }

    #[test]
    fn rejects_structural_problems() {
        assert_eq!(validate(""), Err(IdentifierError::Empty));
        assert_eq!(validate("1st"), Err(IdentifierError::LeadingDigit));

        let long = "x".repeat(MAX_IDENTIFIER_LEN + 1);
        assert_eq!(
            validate(&long),
            Err(IdentifierError::TooLong {
                len: MAX_IDENTIFIER_LEN + 1
            })
        );
        assert_eq!(validate(&"x".repeat(MAX_IDENTIFIER_LEN)), Ok(()));
    }

    #[test]
    fn reserved_words_are_case_insensitive() {
        assert_eq!(validate("select"), Err(IdentifierError::Reserved));
        assert_eq!(validate("Order"), Err(IdentifierError::Reserved));
        assert_eq!(validate("DESC"), Err(IdentifierError::Reserved));
        // "description" merely starts with a reserved word
        assert_eq!(validate("description"), Ok(()));
    }

    #[test]
    fn database_names_may_be_reserved() {
        assert_eq!(validate_name("database"), Ok(()));
        assert_eq!(validate_name("railway"), Ok(()));
        assert_eq!(
            validate_name("rail-way"),
            Err(IdentifierError::InvalidCharacter { ch: '-' })
        );
    }

    #[test]
    fn non_ascii_is_refused() {
        assert_eq!(
            validate("título"),
            Err(IdentifierError::InvalidCharacter { ch: 'í' })
        );
    }

    #[test]
    fn error_display() {
        assert_eq!(
            IdentifierError::InvalidCharacter { ch: ';' }.to_string(),
            "character ';' is not allowed in identifiers"
        );
        assert_eq!(
            IdentifierError::Reserved.to_string(),
            "identifier is a reserved word"
        );
    }

    #[test]
    fn quote_wraps_in_backticks() {
        assert_eq!(quote("railway"), "`railway`");
    }
}
