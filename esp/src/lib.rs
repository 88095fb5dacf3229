//! Streaming ESP (ECMA Server Page) to JavaScript source transformer.
//!
//! An ESP template interleaves literal text with embedded JavaScript
//! fragments delimited by `<% %>`, `<%= %>`, `<%-- --%>` and, inside
//! quoted literal text, `${ }`. [`Reader`] consumes such a template one
//! character at a time and produces a JavaScript program that, when run
//! against a `response.writer`-shaped object bound to `out`, reproduces
//! the literal text and executes the embedded fragments in order.
//!
//! ```
//! use esp::{EspConfig, Reader};
//!
//! let mut reader = Reader::from_str("Hello, <%= name %>!", EspConfig::default());
//! let mut js = String::new();
//! while let Some(c) = reader.read_one().unwrap() {
//!     js.push(c);
//! }
//! assert_eq!(
//!     js,
//!     "out=response.writer;out.write(\"Hello, \");out.write( name );out.write(\"!\");"
//! );
//! ```

mod config;
mod cursor;
mod error;
mod queue;
mod reader;
mod source;

pub use config::EspConfig;
pub use error::Error;
pub use reader::Reader;
pub use source::{CharSource, IterSource, Utf8Reader};

impl<'a> Reader<IterSource<std::str::Chars<'a>>> {
    /// Convenience constructor around an in-memory template string.
    pub fn from_str(template: &'a str, config: EspConfig) -> Self {
        Reader::new(IterSource::new(template.chars()), config)
    }
}
