//! Prompt construction for oracle requests.
//!
//! Builds the translation prompt with database schema context and the
//! summary prompt with a bounded rendering of the result set.

use std::path::Path;

use crate::db::{ResultSet, Schema};
use crate::llm::types::Message;

/// Line prefix introducing the row count in summary prompts.
pub const ROWS_RETURNED_LABEL: &str = "Rows returned:";

/// System prompt template for translation.
const TRANSLATION_PROMPT_TEMPLATE: &str = r#"You translate questions about a SQLite database into SQL.

DATABASE SCHEMA:
{schema}

INSTRUCTIONS:
- Generate exactly one SQLite SELECT statement
- Use only the tables and columns listed above
- Never modify data or schema
- If the user asks for a particular output file, use it as "path"; otherwise use "{default_path}"

OUTPUT FORMAT:
Reply with a single JSON object and nothing else:
{"sql": "<the query>", "path": "<report file name>"}"#;

/// System prompt for summaries.
const SUMMARY_PROMPT: &str = "You summarize SQL query results for a business reader. \
Answer in plain text in at most three sentences. \
Only mention values that appear in the rows.";

/// Builds the translation system prompt with the schema injected.
pub fn build_translation_prompt(schema: &Schema, default_path: &Path) -> String {
    TRANSLATION_PROMPT_TEMPLATE
        .replace("{schema}", &schema.format_for_llm())
        .replace("{default_path}", &default_path.display().to_string())
}

/// Builds the message list for translating `request`.
pub fn build_translation_messages(
    schema: &Schema,
    default_path: &Path,
    request: &str,
) -> Vec<Message> {
    vec![
        Message::system(build_translation_prompt(schema, default_path)),
        Message::user(request),
    ]
}

/// Builds the message list asking for a summary of `result`.
///
/// At most `row_limit` rows are included.
pub fn build_summary_messages(
    request: &str,
    sql: &str,
    result: &ResultSet,
    row_limit: usize,
) -> Vec<Message> {
    let mut body = format!(
        "Request: {request}\n\nSQL:\n{sql}\n\nColumns: {}\n{ROWS_RETURNED_LABEL} {}\n",
        result.column_names().join(", "),
        result.row_count()
    );

    for row in result.to_json_rows(row_limit) {
        body.push_str(&row.to_string());
        body.push('\n');
    }

    let shown = result.row_count().min(row_limit);
    if shown < result.row_count() {
        body.push_str(&format!("(only the first {shown} rows are shown)\n"));
    }

    vec![Message::system(SUMMARY_PROMPT), Message::user(body)]
}
