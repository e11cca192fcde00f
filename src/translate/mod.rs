//! Translation of configuration source into a value tree.

mod builder;
mod driver;
mod env;
mod error;
mod eval;
mod structure;

pub use builder::Translator;
pub use driver::{classify, Line};
pub use env::{coerce_value, Environment, Redeclare};
pub use error::TranslateError;
pub use eval::evaluate;
pub use structure::{build_array, build_dictionary, split_top_level, Document};
