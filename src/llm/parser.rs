//! Response parsing for oracle outputs.
//!
//! The oracle's reply is untrusted free text. It is parsed into a
//! [`Translation`] only when exactly one SQL candidate can be identified;
//! every ambiguous shape is rejected with a translation error.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::error::{Result, SqlReportError};
use crate::llm::types::Translation;

const SQL_KEYS: [&str; 3] = ["sql", "query", "sql_query"];
const PATH_KEYS: [&str; 3] = ["path", "output_path", "file_name"];

fn json_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[ \t]*json[ \t]*\r?\n(.*?)```").expect("json fence pattern is valid")
    })
}

fn code_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+-]*)[ \t]*\r?\n(.*?)```")
            .expect("code fence pattern is valid")
    })
}

/// Parses an oracle reply into SQL text and an optional report path.
///
/// Accepted shapes, in order:
/// - a ```json fenced object
/// - a bare JSON object (when the reply has no code fences)
/// - exactly one distinct ```sql (or unlabelled) fenced block
pub fn parse_translation(response: &str) -> Result<Translation> {
    let response = response.trim();
    if response.is_empty() {
        return Err(SqlReportError::translation("Oracle returned an empty response"));
    }

    let fenced: Vec<&str> = json_fence()
        .captures_iter(response)
        .map(|captures| captures.get(1).map_or("", |m| m.as_str()))
        .collect();
    if !fenced.is_empty() {
        return parse_json_fences(&fenced);
    }

    if !response.contains("```") {
        if let Some(candidate) = bare_json_object(response) {
            return parse_json_object(candidate);
        }
        return Err(SqlReportError::translation(
            "Oracle response contains no SQL",
        ));
    }

    parse_sql_fences(response)
}

/// Every fenced object must parse, and all of them must agree.
fn parse_json_fences(bodies: &[&str]) -> Result<Translation> {
    let mut candidates: Vec<Translation> = Vec::with_capacity(bodies.len());
    for body in bodies {
        let translation = parse_json_object(body)?;
        if !candidates.contains(&translation) {
            candidates.push(translation);
        }
    }

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        n => Err(SqlReportError::translation(format!(
            "Oracle response is ambiguous: {n} different JSON answers"
        ))),
    }
}

/// Text from the first `{` to the last `}`, if any.
fn bare_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn parse_json_object(text: &str) -> Result<Translation> {
    let value: Value = serde_json::from_str(text.trim()).map_err(|e| {
        SqlReportError::translation(format!("Oracle returned malformed JSON: {e}"))
    })?;

    let Value::Object(object) = value else {
        return Err(SqlReportError::translation(
            "Oracle returned JSON that is not an object",
        ));
    };

    let sql = string_field(&object, &SQL_KEYS, "SQL")?
        .ok_or_else(|| SqlReportError::translation("Oracle response has no \"sql\" field"))?;
    if sql.is_empty() {
        return Err(SqlReportError::translation("Oracle returned empty SQL"));
    }

    let translation = Translation::new(sql);
    Ok(match string_field(&object, &PATH_KEYS, "path")? {
        Some(path) if !path.is_empty() => translation.with_path(path),
        _ => translation,
    })
}

/// The trimmed value shared by whichever alias keys are present.
///
/// Aliases that disagree make the object ambiguous.
fn string_field<'a>(
    object: &'a Map<String, Value>,
    keys: &[&str],
    label: &str,
) -> Result<Option<&'a str>> {
    let mut values = keys
        .iter()
        .filter_map(|key| object.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let Some(first) = values.next() else {
        // Present but blank still counts as present.
        let blank = keys
            .iter()
            .filter_map(|key| object.get(*key))
            .any(|value| value.is_string());
        return Ok(blank.then_some(""));
    };
    if values.any(|other| other != first) {
        return Err(SqlReportError::translation(format!(
            "Oracle response is ambiguous: conflicting {label} fields"
        )));
    }
    Ok(Some(first))
}

fn parse_sql_fences(response: &str) -> Result<Translation> {
    let mut blocks: Vec<&str> = Vec::new();
    for captures in code_fence().captures_iter(response) {
        let language = captures.get(1).map_or("", |m| m.as_str());
        let is_sql = language.is_empty()
            || language.eq_ignore_ascii_case("sql")
            || language.eq_ignore_ascii_case("sqlite");
        if !is_sql {
            continue;
        }
        let body = captures.get(2).map_or("", |m| m.as_str()).trim();
        if !body.is_empty() && !blocks.contains(&body) {
            blocks.push(body);
        }
    }

    match blocks.as_slice() {
        [] => Err(SqlReportError::translation(
            "Oracle response contains no SQL",
        )),
        [sql] => Ok(Translation::new(*sql)),
        many => Err(SqlReportError::translation(format!(
            "Oracle response is ambiguous: {} different SQL blocks",
            many.len()
        ))),
    }
}
