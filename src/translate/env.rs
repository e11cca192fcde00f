use indexmap::IndexMap;

use super::TranslateError;
use crate::Value;

/// Policy applied when `def` names a variable that is already bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Redeclare {
    /// Fail the pass with [`TranslateError::DuplicateVariable`].
    #[default]
    Reject,
    /// Replace the earlier binding.
    Overwrite,
}

/// Variable bindings for a single translation pass.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: IndexMap<String, Value>,
    policy: Redeclare,
}

impl Environment {
    pub fn new(policy: Redeclare) -> Self {
        Self {
            bindings: IndexMap::new(),
            policy,
        }
    }

    /// Binds `name` to `value`, honouring the redeclaration policy.
    pub fn declare(&mut self, name: &str, value: Value) -> Result<(), TranslateError> {
        if self.policy == Redeclare::Reject && self.bindings.contains_key(name) {
            return Err(TranslateError::DuplicateVariable(name.to_string()));
        }
        self.bindings.insert(name.to_string(), value);
        Ok(())
    }

    /// Binds `name` ahead of the pass, replacing any earlier seed.
    pub fn seed(&mut self, name: &str, value: Value) {
        self.bindings.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Result<&Value, TranslateError> {
        self.bindings
            .get(name)
            .ok_or_else(|| TranslateError::UndefinedVariable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Returns true if `name` matches `[_A-Za-z][_A-Za-z0-9]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Collects variables from environment variables named `<prefix><separator><NAME>`.
///
/// Names that are not identifiers are skipped.
pub fn load_env_vars(prefix: &str, separator: &str) -> Vec<(String, Value)> {
    let prefix_with_sep = format!("{prefix}{separator}");
    let mut vars: Vec<(String, Value)> = std::env::vars()
        .filter_map(|(key, value)| {
            let name = key.strip_prefix(&prefix_with_sep)?;
            is_identifier(name).then(|| (name.to_string(), coerce_value(&value)))
        })
        .collect();
    // std::env::vars order is platform dependent
    vars.sort_by(|a, b| a.0.cmp(&b.0));
    vars
}

/// Coerces a raw string into an integer when it looks like one, else text.
pub fn coerce_value(s: &str) -> Value {
    if looks_like_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
    }
    Value::Text(s.to_string())
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
