//! A tokenizer, reader and declarative class-mapping engine for Clausewitz-style
//! configuration text — the `key = value` / `{ }` grammar used by grand
//! strategy games for everything from unit stats to map definitions.
//!
//! # Overview
//!
//! Parsing a document happens in three layers, each usable on its own:
//!
//! - [Tokenizer] turns source bytes into a lazily pulled stream of [Token]s.
//! - [Reader] drives the tokenizer through the object/array grammar, keeping
//!   an explicit state stack so callers can't mismatch a `beginReadObject`
//!   with an `endReadArray`.
//! - [ClassMapping] binds source-text keys to typed fields on a consumer
//!   record, so a caller writes a schema once and gets a populated struct back
//!   instead of hand-rolling a property-by-property match.
//!
//! # Example
//!
//! ```
//! use clauser::{ClassMapping, ParseState, Reader};
//! use clauser::util::Code;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct MapDefinition {
//!     wrap_x: bool,
//!     sea_starts: Vec<i32>,
//! }
//!
//! let text = "wrap_x = no sea_starts = { 1 2 3 }";
//! let code = Code::from(text);
//! let mut state = ParseState::new(text);
//! let mut reader = Reader::new(&code);
//!
//! let mut schema = ClassMapping::<MapDefinition>::new();
//! schema.add_boolean("wrap_x", &mut state, |t, v| t.wrap_x = v).unwrap();
//! schema.add_integer_vec("sea_starts", &mut state, |t, v| t.sea_starts = v).unwrap();
//!
//! let mut parsed = MapDefinition::default();
//! schema.read_object(&mut reader, &mut state, &mut parsed).unwrap();
//! assert_eq!(parsed, MapDefinition { wrap_x: false, sea_starts: vec![1, 2, 3] });
//! ```

mod class_mapping;
mod error;
pub mod examples;
mod parse_state;
mod reader;
mod token;
mod tokenizer;
pub mod util;
mod value_types;

pub use class_mapping::{ClassMapping, ObjectBinding, ValueMapping};
pub use error::{ErrorKind, ImplementationError, ParseError};
pub use parse_state::{ParseState, StringId};
pub use reader::{Reader, ReaderState};
pub use token::{Token, TokenType};
pub use tokenizer::Tokenizer;
pub use value_types::{real_type_of, RealType, ValueType, ValueTypes};
