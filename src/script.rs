//! Script text handling: statement splitting and parameter substitution.
//!
//! A script file holds one or more statements separated by `;`. Splitting
//! is quote-aware so a `;` inside a string literal does not end a
//! statement, and `--` line comments are stripped first. Parameters are
//! referenced as `${name}` and replaced from the run's parameter map;
//! unknown names are left untouched.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

static PARAM_RE: OnceLock<Regex> = OnceLock::new();

fn param_re() -> &'static Regex {
    PARAM_RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

/// Split script text into individual statements.
///
/// `--` comments are removed line by line, then the remainder is split on
/// `;` characters that are outside single and double quotes. Empty
/// statements are dropped.
pub fn split_statements(script: &str) -> Vec<String> {
    let stripped = strip_comments(script);

    let mut stmts = Vec::new();
    let mut stmt = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for c in stripped.chars() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            ';' if !in_single && !in_double => {
                if !stmt.trim().is_empty() {
                    stmts.push(stmt.trim().to_string());
                }
                stmt.clear();
                continue;
            }
            _ => {}
        }
        stmt.push(c);
    }
    if !stmt.trim().is_empty() {
        stmts.push(stmt.trim().to_string());
    }
    stmts
}

/// Remove `--` line comments, joining the remaining lines with spaces.
fn strip_comments(script: &str) -> String {
    let mut result = String::new();
    for line in script.lines() {
        let line = match line.find("--") {
            Some(pos) => &line[..pos],
            None => line,
        };
        if line.trim().is_empty() {
            continue;
        }
        result.push_str(line);
        result.push(' ');
    }
    result
}

/// Substitute `${name}` references with values from `params`.
///
/// References with no binding are left intact so the backend can report
/// them in context.
pub fn substitute(text: &str, params: &HashMap<String, String>) -> String {
    if params.is_empty() {
        return text.to_string();
    }
    param_re()
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            match params.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
