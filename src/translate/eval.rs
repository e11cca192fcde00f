//! Expression evaluation.
//!
//! Expressions are tokenized and evaluated by a small recursive-descent
//! parser over [`Value`]:
//!
//! ```text
//! expression := operand (('+' | '-') operand)*
//! operand    := '-' operand
//!             | INTEGER | STRING | IDENT
//!             | IDENT '(' arguments ')'
//!             | '{' dictionary-body '}'
//!             | '<<' array-body '>>'
//! ```
//!
//! Dictionary and array bodies are handed to the structure builder, which
//! evaluates their values through [`evaluate`] again.

use tracing::trace;

use super::env::Environment;
use super::structure::{build_array, build_dictionary, split_top_level};
use super::TranslateError;
use crate::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Integer,
    Ident,
    Str,
    Plus,
    Minus,
    LParen,
    RParen,
    LBrace,
    RBrace,
    OpenArray,
    CloseArray,
    /// Anything else (commas, colons, stray symbols). Only meaningful inside
    /// literal bodies, which are sliced out of the source text.
    Other,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

fn tokenize(src: &str) -> Result<Vec<Token>, TranslateError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        let kind = match ch {
            c if c.is_whitespace() => continue,
            c if c.is_ascii_digit() => {
                while chars.next_if(|(_, c)| c.is_ascii_digit()).is_some() {}
                TokenKind::Integer
            }
            c if c == '_' || c.is_ascii_alphabetic() => {
                while chars
                    .next_if(|(_, c)| *c == '_' || c.is_ascii_alphanumeric())
                    .is_some()
                {}
                TokenKind::Ident
            }
            '"' | '\'' => {
                if !chars.by_ref().any(|(_, c)| c == ch) {
                    return Err(TranslateError::InvalidExpression(format!(
                        "unterminated string in '{src}'"
                    )));
                }
                TokenKind::Str
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '<' if chars.next_if(|(_, c)| *c == '<').is_some() => TokenKind::OpenArray,
            '>' if chars.next_if(|(_, c)| *c == '>').is_some() => TokenKind::CloseArray,
            _ => TokenKind::Other,
        };
        let end = chars.peek().map_or(src.len(), |(idx, _)| *idx);
        tokens.push(Token { kind, start, end });
    }

    Ok(tokens)
}

/// Evaluates `expr` against the bindings in `env`.
pub fn evaluate(expr: &str, env: &Environment) -> Result<Value, TranslateError> {
    let src = expr.trim();
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(TranslateError::InvalidExpression("empty expression".into()));
    }

    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
        env,
    };
    let value = parser.expression()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.invalid());
    }

    trace!(expr = src, %value, "evaluated");
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    env: &'a Environment,
}

impl<'a> Parser<'a> {
    fn invalid(&self) -> TranslateError {
        TranslateError::InvalidExpression(self.src.to_string())
    }

    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn text(&self, token: Token) -> &'a str {
        let src = self.src;
        &src[token.start..token.end]
    }

    fn expression(&mut self) -> Result<Value, TranslateError> {
        let mut acc = self.operand()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => '+',
                Some(TokenKind::Minus) => '-',
                _ => return Ok(acc),
            };
            self.pos += 1;
            let rhs = self.operand()?;
            acc = self.arithmetic(op, acc, rhs)?;
        }
    }

    fn arithmetic(&self, op: char, lhs: Value, rhs: Value) -> Result<Value, TranslateError> {
        let operation = if op == '+' { "+" } else { "-" };
        let (lhs, rhs) = match (lhs, rhs) {
            (Value::Integer(l), Value::Integer(r)) => (l, r),
            (Value::Integer(_), other) | (other, _) => {
                return Err(TranslateError::TypeMismatch {
                    operation,
                    found: other.type_name(),
                })
            }
        };
        let result = if op == '+' {
            lhs.checked_add(rhs)
        } else {
            lhs.checked_sub(rhs)
        };
        result
            .map(Value::Integer)
            .ok_or_else(|| TranslateError::Overflow(self.src.to_string()))
    }

    fn operand(&mut self) -> Result<Value, TranslateError> {
        let Some(&token) = self.tokens.get(self.pos) else {
            return Err(self.invalid());
        };
        self.pos += 1;

        match token.kind {
            // A negated literal is parsed whole so that i64::MIN is reachable.
            TokenKind::Minus if self.peek() == Some(TokenKind::Integer) => {
                let digits = self.text(self.tokens[self.pos]);
                self.pos += 1;
                format!("-{digits}")
                    .parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|_| TranslateError::Overflow(self.src.to_string()))
            }
            TokenKind::Minus => match self.operand()? {
                Value::Integer(i) => i
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| TranslateError::Overflow(self.src.to_string())),
                other => Err(TranslateError::TypeMismatch {
                    operation: "-",
                    found: other.type_name(),
                }),
            },
            TokenKind::Integer => self
                .text(token)
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| TranslateError::Overflow(self.text(token).to_string())),
            TokenKind::Str => {
                let quoted = self.text(token);
                Ok(Value::Text(quoted[1..quoted.len() - 1].to_string()))
            }
            TokenKind::Ident if self.peek() == Some(TokenKind::LParen) => {
                let name = self.text(token).to_string();
                self.call(&name)
            }
            TokenKind::Ident => self.env.get(self.text(token)).cloned(),
            TokenKind::LBrace => {
                let body = self.delimited(token, TokenKind::LBrace, TokenKind::RBrace)?;
                build_dictionary(body, self.env)
            }
            TokenKind::OpenArray => {
                let body = self.delimited(token, TokenKind::OpenArray, TokenKind::CloseArray)?;
                build_array(body, self.env)
            }
            _ => Err(self.invalid()),
        }
    }

    /// Consumes tokens up to the delimiter closing `open`, returning the raw
    /// text between them.
    fn delimited(
        &mut self,
        open: Token,
        open_kind: TokenKind,
        close_kind: TokenKind,
    ) -> Result<&'a str, TranslateError> {
        let src = self.src;
        let mut depth = 1usize;
        while let Some(&token) = self.tokens.get(self.pos) {
            self.pos += 1;
            if token.kind == open_kind {
                depth += 1;
            } else if token.kind == close_kind {
                depth -= 1;
                if depth == 0 {
                    return Ok(&src[open.end..token.start]);
                }
            }
        }
        Err(TranslateError::StructuralError(format!(
            "unbalanced '{}' in '{}'",
            self.text(open),
            self.src
        )))
    }

    fn call(&mut self, name: &str) -> Result<Value, TranslateError> {
        let open = self.tokens[self.pos];
        self.pos += 1;
        let args = self
            .delimited(open, TokenKind::LParen, TokenKind::RParen)
            .map_err(|_| {
                TranslateError::InvalidExpression(format!("malformed call in '{}'", self.src))
            })?;

        match name {
            "concat" => concat(args, self.env),
            _ => Err(TranslateError::InvalidExpression(format!(
                "unknown function '{name}' in '{}'",
                self.src
            ))),
        }
    }
}

/// Built-in `concat`: stringifies every argument and joins them in order.
fn concat(args: &str, env: &Environment) -> Result<Value, TranslateError> {
    let mut out = String::new();
    if args.trim().is_empty() {
        return Ok(Value::Text(out));
    }

    for arg in split_top_level(args, ',')? {
        let arg = arg.trim();
        if arg.is_empty() {
            return Err(TranslateError::InvalidExpression(format!(
                "malformed concat call: concat({args})"
            )));
        }
        match evaluate(arg, env)? {
            Value::Integer(i) => out.push_str(&i.to_string()),
            Value::Text(s) => out.push_str(&s),
            other => {
                return Err(TranslateError::TypeMismatch {
                    operation: "concat",
                    found: other.type_name(),
                })
            }
        }
    }

    Ok(Value::Text(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::Redeclare;
    use pretty_assertions::assert_eq;

    fn env_with(vars: &[(&str, Value)]) -> Environment {
        let mut env = Environment::new(Redeclare::Reject);
        for (name, value) in vars {
            env.declare(name, value.clone()).unwrap();
        }
        env
    }

    fn eval(expr: &str) -> Result<Value, TranslateError> {
        evaluate(expr, &Environment::default())
    }

    #[test]
    fn test_integer_literal() {
        assert_eq!(eval("42").unwrap(), Value::Integer(42));
        assert_eq!(eval("  007 ").unwrap(), Value::Integer(7));
    }

    #[test]
    fn test_variable_plus_literal() {
        let env = env_with(&[("x", Value::Integer(10))]);
        assert_eq!(evaluate("x + 1", &env).unwrap(), Value::Integer(11));
        assert_eq!(evaluate("x-1", &env).unwrap(), Value::Integer(9));
    }

    #[test]
    fn test_chained_arithmetic_is_left_associative() {
        let env = env_with(&[("a", Value::Integer(10)), ("b", Value::Integer(4))]);
        assert_eq!(evaluate("a - b - 1", &env).unwrap(), Value::Integer(5));
        assert_eq!(evaluate("a - b + 1", &env).unwrap(), Value::Integer(7));
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(eval("-5").unwrap(), Value::Integer(-5));
        assert_eq!(eval("3 - -2").unwrap(), Value::Integer(5));
        assert_eq!(eval("- 7").unwrap(), Value::Integer(-7));
        assert_eq!(eval("--4").unwrap(), Value::Integer(4));
    }

    #[test]
    fn test_most_negative_literal() {
        assert_eq!(eval("-9223372036854775808").unwrap(), Value::Integer(i64::MIN));
        assert_eq!(eval("1 + -9223372036854775808").unwrap(), Value::Integer(i64::MIN + 1));
        assert!(matches!(
            eval("-9223372036854775809"),
            Err(TranslateError::Overflow(_))
        ));
        assert!(matches!(
            eval("--9223372036854775808"),
            Err(TranslateError::Overflow(_))
        ));
    }

    #[test]
    fn test_concat_variables() {
        let env = env_with(&[("a", Value::from("a")), ("b", Value::from("b"))]);
        assert_eq!(evaluate("concat(a, b)", &env).unwrap(), Value::from("ab"));
    }

    #[test]
    fn test_concat_quoted_and_integers() {
        let env = env_with(&[("port", Value::Integer(8080))]);
        assert_eq!(
            evaluate("concat('host:', port, \", x\")", &env).unwrap(),
            Value::from("host:8080, x")
        );
        assert_eq!(eval("concat('a', 'b')").unwrap(), Value::from("ab"));
        assert_eq!(eval("concat()").unwrap(), Value::from(""));
    }

    #[test]
    fn test_concat_nested_arguments() {
        let env = env_with(&[("n", Value::Integer(1))]);
        assert_eq!(
            evaluate("concat(concat('v', n + 1), '.0')", &env).unwrap(),
            Value::from("v2.0")
        );
    }

    #[test]
    fn test_undefined_variable() {
        assert_eq!(
            eval("missing + 1"),
            Err(TranslateError::UndefinedVariable("missing".into()))
        );
        assert_eq!(
            eval("concat(missing)"),
            Err(TranslateError::UndefinedVariable("missing".into()))
        );
    }

    #[test]
    fn test_arithmetic_on_text_is_type_mismatch() {
        let env = env_with(&[("name", Value::from("web"))]);
        assert_eq!(
            evaluate("name + 1", &env),
            Err(TranslateError::TypeMismatch {
                operation: "+",
                found: "string"
            })
        );
        assert_eq!(
            evaluate("1 - name", &env),
            Err(TranslateError::TypeMismatch {
                operation: "-",
                found: "string"
            })
        );
    }

    #[test]
    fn test_concat_of_composite_is_type_mismatch() {
        assert_eq!(
            eval("concat(<< 1 >>)"),
            Err(TranslateError::TypeMismatch {
                operation: "concat",
                found: "array"
            })
        );
    }

    #[test]
    fn test_invalid_expressions() {
        for expr in ["", "1 +", "1 2", "foo(1)", "concat(1,)", "concat(1", "@", "x y"] {
            let env = env_with(&[("x", Value::Integer(1))]);
            let result = evaluate(expr, &env);
            assert!(
                matches!(result, Err(TranslateError::InvalidExpression(_))),
                "{expr:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            eval("'open"),
            Err(TranslateError::InvalidExpression(_))
        ));
    }

    #[test]
    fn test_overflow() {
        assert!(matches!(
            eval("99999999999999999999"),
            Err(TranslateError::Overflow(_))
        ));
        let env = env_with(&[("max", Value::Integer(i64::MAX))]);
        assert!(matches!(
            evaluate("max + 1", &env),
            Err(TranslateError::Overflow(_))
        ));
    }

    #[test]
    fn test_nested_literals() {
        let value = eval("{ ports: << 80, 443 >>, name: 'web' }").unwrap();
        assert_eq!(value.to_string(), r#"{ports: [80, 443], name: "web"}"#);
    }

    #[test]
    fn test_unbalanced_literal() {
        assert!(matches!(
            eval("<< 1, 2"),
            Err(TranslateError::StructuralError(_))
        ));
    }
}
