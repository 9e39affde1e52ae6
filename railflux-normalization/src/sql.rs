//! Normalization and classification of SQL queries.

use once_cell::sync::Lazy;
use regex::Regex;

/// Operations that are recorded. Everything else is schema or session chatter.
const TRACKED_OPERATIONS: &[&str] = &["SELECT", "INSERT", "UPDATE", "DELETE"];

/// Query names issued by the ORM for its own bookkeeping.
const UNTRACKED_NAMES: &[&str] = &["SCHEMA", "EXPLAIN"];

/// Collapses runs of whitespace, including newlines.
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// A quoted string literal, where `''` escapes a quote.
const STRING_LITERAL: &str = r"'(?:[^']|'')*'";

/// Right-hand operands of comparisons, with or without surrounding whitespace.
static COMPARISONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?P<pre>\s*(?:<=|>=|<>|!=|=|<|>)\s*)(?:{STRING_LITERAL}|[\$\+\-\w\.]+)"
    ))
    .unwrap()
});

/// Lists of `IN (...)` clauses.
static IN_LISTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?P<pre>\sIN\s)\([^\(\)]+\)").unwrap());

/// Bounds of `BETWEEN a AND b` clauses.
static BETWEEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?xi)
        (?P<pre>\sBETWEEN\s) (?:{STRING_LITERAL}|[\$\+\-\w\.]+)
        (?P<and>\sAND\s) (?:{STRING_LITERAL}|[\$\+\-\w\.]+)
        "
    ))
    .unwrap()
});

/// Tuples of `VALUES (...)` clauses, including multi-row inserts.
static VALUES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(?P<pre>\sVALUES\s)\(.+\)").unwrap());

/// Patterns of `LIKE`, `ILIKE` and `SIMILAR TO`.
static LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(?P<pre>\s(?:LIKE|ILIKE|SIMILAR TO)\s){STRING_LITERAL}"
    ))
    .unwrap()
});

/// Arguments of `LIMIT` and `OFFSET`.
static LIMIT_OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?P<pre>\s(?:LIMIT|OFFSET)\s)(?:\d+|\$\d+|\?)").unwrap());

/// Normalizes a query by replacing literals and bind parameters with `xxx`.
///
/// Whitespace is collapsed first. Comparisons, `IN` lists, `BETWEEN` bounds, `VALUES` tuples,
/// `LIKE` patterns and `LIMIT`/`OFFSET` arguments are replaced.
///
/// # Example
///
/// ```
/// use railflux_normalization::normalize_sql;
///
/// assert_eq!(
///     normalize_sql("SELECT * FROM POSTS WHERE id = 1"),
///     "SELECT * FROM POSTS WHERE id = xxx"
/// );
/// ```
pub fn normalize_sql(query: &str) -> String {
    let mut query = WHITESPACE.replace_all(query.trim(), " ").into_owned();

    for (regex, replacement) in [
        (&COMPARISONS, "${pre}xxx"),
        (&IN_LISTS, "${pre}(xxx)"),
        (&BETWEEN, "${pre}xxx${and}xxx"),
        (&VALUES, "${pre}(xxx)"),
        (&LIKE, "${pre}xxx"),
        (&LIMIT_OFFSET, "${pre}xxx"),
    ] {
        if regex.is_match(&query) {
            query = regex.replace_all(&query, replacement).into_owned();
        }
    }

    query
}

/// Skips leading `/* ... */` and `-- ...` comments, as added by query annotators.
fn strip_leading_comments(mut query: &str) -> &str {
    loop {
        query = query.trim_start();

        if let Some(rest) = query.strip_prefix("/*") {
            match rest.split_once("*/") {
                Some((_, rest)) => query = rest,
                None => return "",
            }
        } else if let Some(rest) = query.strip_prefix("--") {
            query = rest.split_once('\n').map_or("", |(_, rest)| rest);
        } else {
            return query;
        }
    }
}

/// Returns the operation of a query, which is its first keyword in uppercase.
///
/// Leading comments are skipped. Returns `None` for empty queries.
pub fn sql_operation(query: &str) -> Option<String> {
    strip_leading_comments(query)
        .split_whitespace()
        .next()
        .map(|keyword| keyword.trim_start_matches('(').to_ascii_uppercase())
        .filter(|keyword| !keyword.is_empty())
}

/// Returns the model class from the ORM-assigned name of a query.
///
/// Names follow the `"<Class> <Action>"` convention, e.g. `"Post Load"` yields `Post`.
pub fn sql_class_name(name: &str) -> Option<&str> {
    name.split_whitespace().next()
}

/// Returns `true` if a query with the given statement and name should be recorded.
///
/// Only data manipulation statements are recorded. Queries the ORM issues for schema
/// introspection are skipped by their name.
pub fn is_tracked_sql(query: &str, name: Option<&str>) -> bool {
    if name.is_some_and(|name| UNTRACKED_NAMES.contains(&name)) {
        return false;
    }

    sql_operation(query).is_some_and(|operation| TRACKED_OPERATIONS.contains(&operation.as_str()))
}
