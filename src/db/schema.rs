//! Database schema types for sqlreport.
//!
//! Describes the tables the oracle is allowed to query, in a form that can be
//! embedded in a translation prompt.

/// Tables visible to the translator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// All user tables, in name order.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a table by name (case-insensitive, as SQLite does).
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Formats the schema for inclusion in an LLM system prompt.
    pub fn format_for_llm(&self) -> String {
        let tables_text = self
            .tables
            .iter()
            .map(format_table_for_llm)
            .collect::<Vec<_>>()
            .join("");

        format!("Database Schema:\n\n{}", tables_text)
    }
}

fn format_table_for_llm(table: &Table) -> String {
    let column_lines = table
        .columns
        .iter()
        .map(|column| {
            let annotations = [
                table.primary_key.contains(&column.name).then_some("PK"),
                (!column.is_nullable).then_some("NOT NULL"),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

            if annotations.is_empty() {
                format!("  - {}: {}\n", column.name, column.data_type)
            } else {
                format!(
                    "  - {}: {} ({})\n",
                    column.name,
                    column.data_type,
                    annotations.join(", ")
                )
            }
        })
        .collect::<Vec<_>>()
        .join("");

    format!("Table: {}\n{}\n", table.name, column_lines)
}

/// Represents a database table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in declaration order.
    pub columns: Vec<Column>,

    /// Column names that form the primary key.
    pub primary_key: Vec<String>,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared type (e.g., "INTEGER", "TEXT").
    pub data_type: String,

    /// Whether the column allows NULL values.
    pub is_nullable: bool,
}

impl Column {
    /// Creates a new nullable column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
        }
    }

    /// Sets whether the column is nullable.
    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            is_nullable: nullable,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee_table() -> Table {
        Table {
            name: "Employee".to_string(),
            columns: vec![
                Column::new("id", "INTEGER"),
                Column::new("name", "TEXT").nullable(false),
                Column::new("salary", "REAL"),
            ],
            primary_key: vec!["id".to_string()],
        }
    }

    #[test]
    fn test_format_for_llm() {
        let schema = Schema {
            tables: vec![employee_table()],
        };

        let text = schema.format_for_llm();

        assert!(text.starts_with("Database Schema:"));
        assert!(text.contains("Table: Employee"));
        assert!(text.contains("  - id: INTEGER (PK)\n"));
        assert!(text.contains("  - name: TEXT (NOT NULL)\n"));
        assert!(text.contains("  - salary: REAL\n"));
    }

    #[test]
    fn test_table_lookup_is_case_insensitive() {
        let schema = Schema {
            tables: vec![employee_table()],
        };
        assert!(schema.table("employee").is_some());
        assert!(schema.table("orders").is_none());
    }
}
