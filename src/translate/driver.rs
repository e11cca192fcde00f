//! Line classification and the single translation pass.

use tracing::debug;

use super::env::{is_identifier, Environment};
use super::eval::evaluate;
use super::structure::{build_array, build_dictionary, Document};
use super::TranslateError;
use crate::{Error, Value};

/// The recognised shape of a non-blank, non-comment line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// `def <name> := <expression>`
    Declaration { name: &'a str, expr: &'a str },
    /// `#[ <expression> ]`
    Insertion(&'a str),
    /// `{ ... }`, holding the text between the braces.
    Dictionary(&'a str),
    /// `<< ... >>`, holding the text between the delimiters.
    Array(&'a str),
}

/// Classifies a single source line.
///
/// Returns `Ok(None)` for blank lines and full-line comments.
pub fn classify(raw: &str) -> Result<Option<Line<'_>>, TranslateError> {
    let line = raw.trim();
    if line.is_empty() || is_comment(line) {
        return Ok(None);
    }

    if let Some(rest) = line.strip_prefix("def") {
        if rest.starts_with(char::is_whitespace) {
            return declaration(rest.trim_start()).map(Some);
        }
    }

    let shape = if let Some(rest) = line.strip_prefix("#[") {
        let body = closed(rest, "]", "insertion marker")?;
        if has_bare_bracket(body) {
            return Err(TranslateError::StructuralError(format!(
                "unbalanced brackets in insertion marker '{line}'"
            )));
        }
        Line::Insertion(body)
    } else if let Some(rest) = line.strip_prefix("<<") {
        Line::Array(closed(rest, ">>", "array literal")?)
    } else if let Some(rest) = line.strip_prefix('{') {
        Line::Dictionary(closed(rest, "}", "dictionary literal")?)
    } else {
        return Err(TranslateError::SyntaxError(line.to_string()));
    };
    Ok(Some(shape))
}

/// A full-line comment is `#` followed by whitespace or the end of the line.
fn is_comment(line: &str) -> bool {
    line.strip_prefix('#')
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

/// Returns true if `body` holds a `[` or `]` outside quotes. Expressions
/// have no use for either, so one can only be a misplaced marker bracket.
fn has_bare_bracket(body: &str) -> bool {
    let mut quote = None;
    body.chars().any(|c| match quote {
        Some(q) => {
            if c == q {
                quote = None;
            }
            false
        }
        None if c == '"' || c == '\'' => {
            quote = Some(c);
            false
        }
        None => c == '[' || c == ']',
    })
}

fn closed<'a>(rest: &'a str, close: &str, what: &str) -> Result<&'a str, TranslateError> {
    rest.strip_suffix(close).ok_or_else(|| {
        TranslateError::StructuralError(format!("unclosed {what}, expected '{close}'"))
    })
}

fn declaration(rest: &str) -> Result<Line<'_>, TranslateError> {
    let end = rest
        .find(|c: char| c.is_whitespace() || c == ':')
        .unwrap_or(rest.len());
    let (name, tail) = rest.split_at(end);

    if !is_identifier(name) {
        return Err(TranslateError::SyntaxError(format!(
            "invalid variable name '{name}'"
        )));
    }
    let expr = tail.trim_start().strip_prefix(":=").ok_or_else(|| {
        TranslateError::SyntaxError(format!("expected ':=' after 'def {name}'"))
    })?;

    Ok(Line::Declaration {
        name,
        expr: expr.trim(),
    })
}

/// Runs one translation pass over `source` with a prepared environment.
pub(crate) fn run(source: &str, mut env: Environment) -> Result<Value, Error> {
    let mut document = Document::new();

    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        step(raw, line_no, &mut env, &mut document).map_err(|source| Error::Line {
            line: line_no,
            text: raw.to_string(),
            source,
        })?;
    }

    let value = document.finish();
    debug!(variables = env.len(), top = value.type_name(), "translation complete");
    Ok(value)
}

fn step(
    raw: &str,
    line_no: usize,
    env: &mut Environment,
    document: &mut Document,
) -> Result<(), TranslateError> {
    let Some(line) = classify(raw)? else {
        return Ok(());
    };

    match line {
        Line::Declaration { name, expr } => {
            debug!(line = line_no, name, "declaration");
            let value = evaluate(expr, env)?;
            env.declare(name, value)?;
        }
        Line::Insertion(expr) => {
            debug!(line = line_no, "insertion");
            let value = evaluate(expr, env)?;
            document.insert(value)?;
        }
        Line::Dictionary(body) => {
            debug!(line = line_no, "dictionary literal");
            document.activate(build_dictionary(body, env)?);
        }
        Line::Array(body) => {
            debug!(line = line_no, "array literal");
            document.activate(build_array(body, env)?);
        }
    }
    Ok(())
}
