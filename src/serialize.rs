//! TOML rendering of a finished document.

use toml_edit::{Array, DocumentMut, InlineTable, Item, Table};

use crate::translate::TranslateError;
use crate::value::Dictionary;
use crate::{Error, Value};

/// Renders `value` as a TOML document.
///
/// The top level must be a dictionary. Keys are written in insertion order.
/// A nested dictionary becomes a `[table]` section only when no plain key
/// follows it at the same level; otherwise it is written as an inline table
/// so that it keeps its place. Arrays are always written inline.
pub fn to_toml(value: &Value) -> Result<String, Error> {
    let Value::Dictionary(entries) = value else {
        return Err(Error::Serialize(TranslateError::SerializationError(
            format!(
                "top-level value must be a dictionary, found {}",
                value.type_name()
            ),
        )));
    };

    let mut document = DocumentMut::new();
    fill_table(document.as_table_mut(), entries);
    Ok(document.to_string())
}

fn fill_table(table: &mut Table, entries: &Dictionary) {
    // Sections are emitted after every plain key of their parent, so only
    // the trailing run of dictionaries may become one.
    let first_section = entries
        .values()
        .rposition(|value| !matches!(value, Value::Dictionary(_)))
        .map_or(0, |idx| idx + 1);

    for (idx, (key, value)) in entries.iter().enumerate() {
        let item = match value {
            Value::Dictionary(child) if idx >= first_section => {
                let mut section = Table::new();
                fill_table(&mut section, child);
                Item::Table(section)
            }
            _ => Item::Value(inline(value)),
        };
        table.insert(key, item);
    }
}

fn inline(value: &Value) -> toml_edit::Value {
    match value {
        Value::Integer(i) => (*i).into(),
        Value::Text(s) => s.as_str().into(),
        Value::Array(items) => {
            let mut array: Array = items.iter().map(inline).collect();
            array.fmt();
            toml_edit::Value::Array(array)
        }
        Value::Dictionary(entries) => {
            let mut table: InlineTable = entries
                .iter()
                .map(|(key, value)| (key.as_str(), inline(value)))
                .collect();
            table.fmt();
            toml_edit::Value::InlineTable(table)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dict(pairs: &[(&str, Value)]) -> Value {
        Value::Dictionary(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    /// Dotted key paths of `table` in document order, descending into
    /// nested tables and tables inside arrays.
    fn key_paths(table: &toml::Table) -> Vec<String> {
        fn walk(value: &toml::Value, path: &str, out: &mut Vec<String>) {
            match value {
                toml::Value::Table(table) => {
                    for (key, child) in table {
                        let child_path = format!("{path}.{key}");
                        out.push(child_path.clone());
                        walk(child, &child_path, out);
                    }
                }
                toml::Value::Array(items) => {
                    for (idx, item) in items.iter().enumerate() {
                        walk(item, &format!("{path}[{idx}]"), out);
                    }
                }
                _ => {}
            }
        }

        let mut out = Vec::new();
        walk(&toml::Value::Table(table.clone()), "", &mut out);
        out
    }

    fn sample() -> Value {
        dict(&[
            ("name", "web".into()),
            ("server", dict(&[("host", "localhost".into()), ("port", Value::Integer(8080))])),
            ("ports", Value::Array(vec![Value::Integer(80), Value::Integer(443)])),
            ("limits", dict(&[("cpu", Value::Integer(2))])),
        ])
    }

    #[test]
    fn test_scalars_and_arrays() {
        let value = dict(&[
            ("b", Value::Integer(2)),
            ("a", "x".into()),
            ("list", Value::Array(vec![Value::Integer(1), "two".into()])),
        ]);
        let out = to_toml(&value).unwrap();
        assert_eq!(out, "b = 2\na = \"x\"\nlist = [1, \"two\"]\n");
    }

    #[test]
    fn test_trailing_dictionary_is_a_section() {
        let value = dict(&[
            ("name", "web".into()),
            ("database", dict(&[("port", Value::Integer(5432))])),
        ]);
        let out = to_toml(&value).unwrap();
        assert_eq!(out, "name = \"web\"\n\n[database]\nport = 5432\n");
    }

    #[test]
    fn test_dictionary_before_plain_key_stays_in_place() {
        let value = dict(&[
            ("db", dict(&[("port", Value::Integer(1))])),
            ("name", "x".into()),
        ]);
        let out = to_toml(&value).unwrap();
        assert!(out.starts_with("db = {"), "{out}");

        let parsed: toml::Table = toml::from_str(&out).unwrap();
        assert_eq!(key_paths(&parsed), [".db", ".db.port", ".name"]);
    }

    #[test]
    fn test_array_of_dictionaries_keeps_order() {
        let value = dict(&[
            (
                "a",
                Value::Array(vec![
                    dict(&[("b", Value::Integer(2))]),
                    dict(&[("c", Value::Array(vec![]))]),
                ]),
            ),
            ("z", Value::Integer(1)),
        ]);
        let out = to_toml(&value).unwrap();
        let parsed: toml::Table = toml::from_str(&out).unwrap();
        assert_eq!(key_paths(&parsed), [".a", ".a[0].b", ".a[1].c", ".z"]);
    }

    #[test]
    fn test_round_trip() {
        let value = sample();
        let out = to_toml(&value).unwrap();
        let parsed: toml::Table = toml::from_str(&out).unwrap();

        // Table equality ignores key order, so compare the paths too.
        let expected = value.to_toml();
        assert_eq!(toml::Value::Table(parsed.clone()), expected);
        assert_eq!(
            key_paths(&parsed),
            [
                ".name",
                ".server",
                ".server.host",
                ".server.port",
                ".ports",
                ".limits",
                ".limits.cpu",
            ]
        );
        assert!(out.ends_with("[limits]\ncpu = 2\n"), "{out}");
    }

    #[test]
    fn test_nested_sections_keep_order() {
        let value = dict(&[
            ("name", "web".into()),
            (
                "server",
                dict(&[
                    ("tls", dict(&[("enabled", Value::Integer(1))])),
                    ("port", Value::Integer(443)),
                    ("pool", dict(&[("size", Value::Integer(4))])),
                ]),
            ),
        ]);
        let out = to_toml(&value).unwrap();
        let parsed: toml::Table = toml::from_str(&out).unwrap();
        assert_eq!(
            key_paths(&parsed),
            [
                ".name",
                ".server",
                ".server.tls",
                ".server.tls.enabled",
                ".server.port",
                ".server.pool",
                ".server.pool.size",
            ]
        );
    }

    #[test]
    fn test_top_level_must_be_dictionary() {
        let result = to_toml(&Value::Array(vec![Value::Integer(1)]));
        assert!(matches!(
            result,
            Err(Error::Serialize(TranslateError::SerializationError(_)))
        ));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(to_toml(&Value::dictionary()).unwrap(), "");
    }
}
