//! # Bridle
//!
//! Compiles Bridle, a small structured language, into NSIS installer
//! script built on the `LogicLib.nsh` and `FileFunc.nsh` macros.
//!
//! ## Architecture
//!
//! ```text
//!  source file
//!      │
//!      ▼
//!  ┌─────────────┐  words + tails  ┌───────────────────┐  NSIS text
//!  │ InputReader │ ──────────────▶ │ StatementCompiler │ ───────────▶
//!  └─────────────┘  (WordStream)   └───────────────────┘
//!                                        │      ▲
//!                                        ▼      │
//!                                   ┌─────────────┐
//!                                   │ Environment │
//!                                   └─────────────┘
//! ```
//!
//! ```rust
//! use bridle::{Compiled, InputReader, StatementCompiler};
//!
//! let mut compiler = StatementCompiler::default();
//! let mut reader = InputReader::new("greeting = \"Hello \" & $INSTDIR", "demo");
//! while reader.go_to_next_statement().unwrap() {
//!     if let Compiled::Text(text) = compiler.compile_statement(&mut reader).unwrap() {
//!         println!("{}", text);
//!     }
//! }
//! ```
//!
//! [`Driver`] adds file handling on top: the prelude, `!include`
//! following and output encodings.

mod builtins;
mod callable;
mod compiler;
mod driver;
mod environment;
mod error;
mod expression;
mod msgbox;
mod operand;
mod statements;
mod word;

pub use callable::{
    AdHocFunction, Builtin, BuiltinStyle, Callable, Convention, Custom,
    UserFunction,
};
pub use compiler::{Compiled, MAX_NESTING, StatementCompiler};
pub use driver::{Driver, DriverOptions, Encoding, bridle_file_name};
pub use environment::{Environment, NameGenerator, Scope, Variable};
pub use error::{
    CompileError, DriverError, ErrorKind, Result, SourceError,
};
pub use msgbox::ButtonGroup;
pub use operand::{
    CompareKeyword, ComparisonStatement, Connective, Literal,
    Operand, ReturnOption,
};
pub use statements::{NEWLINE, prelude};
pub use word::{InputReader, Word, WordKind, WordStream, WordTail};
