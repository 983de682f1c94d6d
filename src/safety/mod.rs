//! Query safety classification module.
//!
//! Parses SQL and classifies queries as safe, mutating, or destructive so the
//! query executor can refuse anything that is not a single read-only statement.

mod parser;

pub use parser::classify_sql;

use std::fmt;

/// Safety level classification for SQL queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SafetyLevel {
    /// Read-only queries (SELECT, WITH ... SELECT, EXPLAIN).
    Safe,
    /// Data modification queries (INSERT, UPDATE).
    Mutating,
    /// Data loss, schema changes, or anything that could not be understood
    /// (DELETE, DROP, ALTER, CREATE, PRAGMA, unparsable SQL).
    Destructive,
}

impl SafetyLevel {
    /// Returns true if statements at this level only read data.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Safe)
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "Safe"),
            Self::Mutating => write!(f, "Mutating"),
            Self::Destructive => write!(f, "Destructive"),
        }
    }
}

/// The type of SQL statement detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    Explain,
    Pragma,
    With,
    /// Multiple statements detected; contains the most dangerous type.
    Multiple(Box<StatementType>),
    /// Statement type could not be determined.
    Unknown,
}

impl StatementType {
    /// Returns true if more than one statement was found.
    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Drop => write!(f, "DROP"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Alter => write!(f, "ALTER"),
            Self::Create => write!(f, "CREATE"),
            Self::Explain => write!(f, "EXPLAIN"),
            Self::Pragma => write!(f, "PRAGMA"),
            Self::With => write!(f, "WITH (CTE)"),
            Self::Multiple(inner) => write!(f, "Multiple ({})", inner),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of classifying a SQL query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// The determined safety level.
    pub level: SafetyLevel,
    /// The type of statement(s) detected.
    pub statement_type: StatementType,
    /// Number of statements found in the text.
    pub statement_count: usize,
    /// Optional warning message for the user.
    pub warning: Option<String>,
    /// The single parsed statement rendered back to SQL, comments stripped.
    /// This is the text that gets executed, never the raw input.
    pub statement: Option<String>,
}

impl ClassificationResult {
    /// Creates a new classification result for a single statement.
    pub fn new(level: SafetyLevel, statement_type: StatementType) -> Self {
        Self {
            level,
            statement_type,
            statement_count: 1,
            warning: None,
            statement: None,
        }
    }

    /// Creates a classification result with a warning message.
    pub fn with_warning(
        level: SafetyLevel,
        statement_type: StatementType,
        warning: impl Into<String>,
    ) -> Self {
        Self {
            level,
            statement_type,
            statement_count: 1,
            warning: Some(warning.into()),
            statement: None,
        }
    }

    /// Sets the statement count.
    pub fn with_statement_count(mut self, count: usize) -> Self {
        self.statement_count = count;
        self
    }

    /// Attaches the rendered statement.
    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    /// Returns true if this is exactly one read-only statement.
    pub fn is_single_read_only(&self) -> bool {
        self.statement_count == 1 && self.level.is_read_only()
    }
}
