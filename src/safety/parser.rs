//! SQL parsing and classification logic.
//!
//! Uses sqlparser-rs with the SQLite dialect to parse SQL and classify
//! statements by their safety level.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use crate::error::{Result, SqlReportError};

use super::{ClassificationResult, SafetyLevel, StatementType};

struct SqlClassifier {
    dialect: SQLiteDialect,
}

impl SqlClassifier {
    fn new() -> Self {
        Self {
            dialect: SQLiteDialect {},
        }
    }

    /// SQL that cannot be parsed is treated as destructive.
    fn classify(&self, sql: &str) -> ClassificationResult {
        match self.parse_and_classify(sql) {
            Ok(result) => result,
            Err(e) => ClassificationResult::with_warning(
                SafetyLevel::Destructive,
                StatementType::Unknown,
                format!("Could not parse SQL: {e}"),
            ),
        }
    }

    fn parse_and_classify(&self, sql: &str) -> Result<ClassificationResult> {
        let statements = Parser::parse_sql(&self.dialect, sql)
            .map_err(|e| SqlReportError::query(format!("SQL parse error: {}", e)))?;

        if statements.is_empty() {
            return Ok(ClassificationResult::with_warning(
                SafetyLevel::Destructive,
                StatementType::Unknown,
                "Empty SQL statement",
            )
            .with_statement_count(0));
        }

        if statements.len() == 1 {
            let (level, stmt_type) = classify_statement(&statements[0]);
            let result = if level == SafetyLevel::Destructive {
                ClassificationResult::with_warning(
                    level,
                    stmt_type,
                    "This action cannot be undone.",
                )
            } else {
                ClassificationResult::new(level, stmt_type)
            };
            return Ok(result.with_statement(statements[0].to_string()));
        }

        // Multiple statements: use the most dangerous classification
        let (max_level, max_stmt_type) = statements
            .iter()
            .map(classify_statement)
            .reduce(most_dangerous)
            .unwrap_or((SafetyLevel::Destructive, StatementType::Unknown));

        Ok(ClassificationResult::with_warning(
            max_level,
            StatementType::Multiple(Box::new(max_stmt_type)),
            format!("{} statements in one request", statements.len()),
        )
        .with_statement_count(statements.len()))
    }
}

/// Classifies `sql` by its most dangerous statement.
pub fn classify_sql(sql: &str) -> ClassificationResult {
    SqlClassifier::new().classify(sql)
}

/// Keeps whichever classification is more dangerous; ties keep the first.
fn most_dangerous(
    current: (SafetyLevel, StatementType),
    candidate: (SafetyLevel, StatementType),
) -> (SafetyLevel, StatementType) {
    if candidate.0 > current.0 {
        candidate
    } else {
        current
    }
}

/// Classifies a single parsed statement.
fn classify_statement(statement: &Statement) -> (SafetyLevel, StatementType) {
    match statement {
        // Query: may contain data-modifying CTEs, so recurse
        Statement::Query(query) => classify_query(query),
        // SQLite's EXPLAIN only compiles the inner statement
        Statement::Explain { .. } => (SafetyLevel::Safe, StatementType::Explain),

        Statement::Insert(_) => (SafetyLevel::Mutating, StatementType::Insert),
        Statement::Update { .. } => (SafetyLevel::Mutating, StatementType::Update),

        Statement::Delete(_) => (SafetyLevel::Destructive, StatementType::Delete),
        Statement::Drop { .. } => (SafetyLevel::Destructive, StatementType::Drop),
        Statement::Truncate { .. } => (SafetyLevel::Destructive, StatementType::Truncate),
        Statement::AlterTable { .. } => (SafetyLevel::Destructive, StatementType::Alter),
        Statement::CreateTable { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateIndex { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateView { .. } => (SafetyLevel::Destructive, StatementType::Create),
        // PRAGMA can rewrite journal modes or settings
        Statement::Pragma { .. } => (SafetyLevel::Destructive, StatementType::Pragma),

        _ => (SafetyLevel::Destructive, StatementType::Unknown),
    }
}

/// Classifies a Query by recursively inspecting for data-modifying operations.
fn classify_query(query: &Query) -> (SafetyLevel, StatementType) {
    let base = match &query.with {
        Some(with) => with
            .cte_tables
            .iter()
            .map(|cte| classify_query(&cte.query))
            .fold((SafetyLevel::Safe, StatementType::With), most_dangerous),
        None => (SafetyLevel::Safe, StatementType::Select),
    };

    most_dangerous(base, classify_set_expr(&query.body))
}

/// Classifies a SetExpr, detecting mutations and recursing into nested queries.
fn classify_set_expr(set_expr: &SetExpr) -> (SafetyLevel, StatementType) {
    match set_expr {
        SetExpr::Insert(stmt) | SetExpr::Update(stmt) => classify_statement(stmt),
        SetExpr::Query(query) => classify_query(query),
        SetExpr::Select(select) => classify_select(select),
        SetExpr::SetOperation { left, right, .. } => {
            most_dangerous(classify_set_expr(left), classify_set_expr(right))
        }
        SetExpr::Values(_) | SetExpr::Table(_) => (SafetyLevel::Safe, StatementType::Select),
        #[allow(unreachable_patterns)]
        _ => (SafetyLevel::Destructive, StatementType::Unknown),
    }
}

/// Classifies a Select by checking its FROM clause for subqueries.
fn classify_select(select: &Select) -> (SafetyLevel, StatementType) {
    select
        .from
        .iter()
        .map(classify_table_with_joins)
        .fold((SafetyLevel::Safe, StatementType::Select), most_dangerous)
}

/// Classifies a TableWithJoins, checking the main relation and all joins.
fn classify_table_with_joins(twj: &TableWithJoins) -> (SafetyLevel, StatementType) {
    std::iter::once(&twj.relation)
        .chain(twj.joins.iter().map(|join| &join.relation))
        .map(classify_table_factor)
        .fold((SafetyLevel::Safe, StatementType::Select), most_dangerous)
}

/// Classifies a TableFactor, recursing into derived tables (subqueries).
fn classify_table_factor(factor: &TableFactor) -> (SafetyLevel, StatementType) {
    match factor {
        TableFactor::Derived { subquery, .. } => classify_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => classify_table_with_joins(table_with_joins),
        _ => (SafetyLevel::Safe, StatementType::Select),
    }
}
