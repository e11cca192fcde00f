mod error;
pub mod serialize;
pub mod translate;
mod value;

pub use error::Error;
pub use serialize::to_toml;
pub use translate::{Redeclare, TranslateError, Translator};
pub use value::{Dictionary, Value};
