//! Dictionary and array literals, and the document they are activated into.

use super::env::Environment;
use super::eval::evaluate;
use super::TranslateError;
use crate::value::{Dictionary, Value};

/// Opening delimiters tracked while splitting a literal body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delim {
    Paren,
    Brace,
    Array,
}

/// Splits `body` on `sep` wherever it appears outside quotes and nested
/// `()`, `{}` and `<< >>` pairs.
///
/// Fails if the delimiters in `body` do not balance.
pub fn split_top_level(body: &str, sep: char) -> Result<Vec<&str>, TranslateError> {
    let unbalanced =
        || TranslateError::StructuralError(format!("unbalanced delimiters in '{}'", body.trim()));

    let mut parts = Vec::new();
    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut chars = body.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' => stack.push(Delim::Paren),
            '{' => stack.push(Delim::Brace),
            '<' if chars.next_if(|(_, c)| *c == '<').is_some() => stack.push(Delim::Array),
            ')' | '}' | '>' => {
                let expected = match ch {
                    ')' => Delim::Paren,
                    '}' => Delim::Brace,
                    _ if chars.next_if(|(_, c)| *c == '>').is_some() => Delim::Array,
                    _ => continue,
                };
                if stack.pop() != Some(expected) {
                    return Err(unbalanced());
                }
            }
            c if c == sep && stack.is_empty() => {
                parts.push(&body[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }

    if !stack.is_empty() || quote.is_some() {
        return Err(unbalanced());
    }
    parts.push(&body[start..]);
    Ok(parts)
}

/// Builds a dictionary from the text between `{` and `}`.
///
/// Keys are taken verbatim (trimmed); values are evaluated in order, so a
/// later value never sees an earlier key.
pub fn build_dictionary(body: &str, env: &Environment) -> Result<Value, TranslateError> {
    let mut entries = Dictionary::new();
    if body.trim().is_empty() {
        return Ok(Value::Dictionary(entries));
    }

    for pair in split_top_level(body, ',')? {
        let pair = pair.trim();
        if pair.is_empty() {
            return Err(TranslateError::StructuralError(format!(
                "empty entry in dictionary literal '{{{body}}}'"
            )));
        }
        let (key, value) = pair.split_once(':').ok_or_else(|| {
            TranslateError::StructuralError(format!("missing ':' in dictionary entry '{pair}'"))
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(TranslateError::StructuralError(format!(
                "empty key in dictionary entry '{pair}'"
            )));
        }
        if entries.contains_key(key) {
            return Err(TranslateError::StructuralError(format!(
                "duplicate key '{key}' in dictionary literal"
            )));
        }

        let value = evaluate(value, env)?;
        entries.insert(key.to_string(), value);
    }

    Ok(Value::Dictionary(entries))
}

/// Builds an array from the text between `<<` and `>>`.
pub fn build_array(body: &str, env: &Environment) -> Result<Value, TranslateError> {
    if body.trim().is_empty() {
        return Ok(Value::Array(Vec::new()));
    }

    split_top_level(body, ',')?
        .into_iter()
        .map(|element| {
            if element.trim().is_empty() {
                return Err(TranslateError::StructuralError(format!(
                    "empty element in array literal '<<{body}>>'"
                )));
            }
            evaluate(element, env)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// The document under construction during a translation pass.
///
/// Literal lines activate a new node, which replaces the current scope;
/// earlier nodes stay owned by the document. Before any literal the current
/// scope is the implicit, empty root dictionary.
#[derive(Debug, Default)]
pub struct Document {
    root: Dictionary,
    activated: Vec<Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `node` the current scope.
    pub fn activate(&mut self, node: Value) {
        self.activated.push(node);
    }

    /// Returns the composite that insertions currently target, or `None`
    /// while the implicit root dictionary is current.
    pub fn current_scope(&self) -> Option<&Value> {
        self.activated.last()
    }

    /// Appends `value` to the current scope, which must be an array.
    pub fn insert(&mut self, value: Value) -> Result<(), TranslateError> {
        match self.activated.last_mut() {
            Some(Value::Array(items)) => {
                items.push(value);
                Ok(())
            }
            Some(other) => Err(TranslateError::StructuralError(format!(
                "cannot insert into a {} scope",
                other.type_name()
            ))),
            None => Err(TranslateError::StructuralError(
                "cannot insert into a dictionary scope".into(),
            )),
        }
    }

    /// Completes the pass and returns the canonical value.
    ///
    /// Dictionaries are merged in activation order. Any other node makes the
    /// result that node alone, or an array of every activated node.
    pub fn finish(mut self) -> Value {
        if self
            .activated
            .iter()
            .all(|node| matches!(node, Value::Dictionary(_)))
        {
            for node in self.activated {
                if let Value::Dictionary(overlay) = node {
                    deep_merge(&mut self.root, overlay);
                }
            }
            return Value::Dictionary(self.root);
        }

        if self.activated.len() == 1 {
            if let Some(node) = self.activated.pop() {
                return node;
            }
        }
        Value::Array(self.activated)
    }
}

fn deep_merge(base: &mut Dictionary, overlay: Dictionary) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Dictionary(base_table)), Value::Dictionary(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
