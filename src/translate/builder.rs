use std::path::Path;

use super::driver;
use super::env::{is_identifier, load_env_vars, Environment, Redeclare};
use crate::{serialize, Error, Value};

/// A variable seeded into every translation pass.
#[derive(Debug, Clone)]
enum Seed {
    Variable { name: String, value: Value },
    Env { prefix: String, separator: String },
}

/// Translator for configuration source text.
///
/// Each call to a `translate_*` method runs an independent pass with its own
/// environment and document, so one translator can be reused (and shared
/// between threads) freely.
///
/// ## Seeded variables
///
/// Variables can be bound before the pass starts, either explicitly or from
/// environment variables. Seeds are applied in registration order, so later
/// seeds override earlier ones. A `def` of a seeded name is subject to the
/// [`Redeclare`] policy like any other re-declaration.
///
/// ## Example
///
/// ```
/// use conflang::{Redeclare, Translator, Value};
///
/// let toml = Translator::builder()
///     .with_variable("port", Value::Integer(8080))
///     .redeclare(Redeclare::Reject)
///     .to_toml_str("{ name: 'web', port: port + 1 }")?;
///
/// assert_eq!(toml, "name = \"web\"\nport = 8081\n");
/// # Ok::<(), conflang::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
#[must_use = "a translator does nothing until one of its translate methods is called"]
pub struct Translator {
    redeclare: Redeclare,
    seeds: Vec<Seed>,
}

impl Translator {
    /// Creates a translator with the default settings.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the policy for `def` of an already bound name.
    pub fn redeclare(mut self, policy: Redeclare) -> Self {
        self.redeclare = policy;
        self
    }

    /// Binds `name` to `value` before every pass.
    ///
    /// The name is validated when a pass starts; an invalid one fails the
    /// pass with [`Error::InvalidVariable`].
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.seeds.push(Seed::Variable {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Binds variables from environment variables named
    /// `<prefix><separator><NAME>`.
    ///
    /// `NAME` is used verbatim and must be an identifier; other entries are
    /// skipped. Values made only of digits (with an optional leading `-`)
    /// become integers, everything else is text.
    ///
    /// ```no_run
    /// # use conflang::Translator;
    /// // With APP_port=8080 in the environment
    /// let value = Translator::builder()
    ///     .with_env("APP", "_")
    ///     .translate_str("{ port: port }")?;
    /// # Ok::<(), conflang::Error>(())
    /// ```
    pub fn with_env(mut self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.seeds.push(Seed::Env {
            prefix: prefix.into(),
            separator: separator.into(),
        });
        self
    }

    /// Translates source text into its canonical value.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn translate_str(&self, source: &str) -> Result<Value, Error> {
        driver::run(source, self.environment()?)
    }

    /// Reads and translates the file at `path`.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn translate_file(&self, path: impl AsRef<Path>) -> Result<Value, Error> {
        let source = read_source(path.as_ref())?;
        self.translate_str(&source)
    }

    /// Translates source text and serializes the result as TOML.
    pub fn to_toml_str(&self, source: &str) -> Result<String, Error> {
        serialize::to_toml(&self.translate_str(source)?)
    }

    /// Reads and translates the file at `path`, serializing the result as TOML.
    pub fn to_toml_file(&self, path: impl AsRef<Path>) -> Result<String, Error> {
        serialize::to_toml(&self.translate_file(path)?)
    }

    fn environment(&self) -> Result<Environment, Error> {
        let mut env = Environment::new(self.redeclare);
        for seed in &self.seeds {
            match seed {
                Seed::Variable { name, value } => {
                    if !is_identifier(name) {
                        return Err(Error::InvalidVariable(name.clone()));
                    }
                    env.seed(name, value.clone());
                }
                Seed::Env { prefix, separator } => {
                    for (name, value) in load_env_vars(prefix, separator) {
                        env.seed(&name, value);
                    }
                }
            }
        }
        Ok(env)
    }
}

/// Reads an input file, distinguishing a missing file from other I/O errors.
fn read_source(path: &Path) -> Result<String, Error> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::FileNotFound(path.to_path_buf()))
        }
        Err(e) => Err(Error::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
