//! Tokenization: the token model, the word classification tables and the word-splitting lexer.

pub mod language;
pub mod lexer;
pub mod token;

use std::sync::Arc;

pub use language::{Builtin, Keyword};
pub use lexer::{split_statements, tokenize};
pub use token::{Statement, Token, TokenKind};

use crate::error::{CompileError, SourceFile};

/// Anything that can be parsed from a lowercase source word, e.g. keywords and builtins. Usually
/// derived via `btsc_derive::Parse`.
pub trait Parse
where
	Self: Sized,
{
	/// Parse this object from the given word.
	/// # Errors
	/// If the word does not name any variant.
	fn parse(value: &str, line: u32, src: Arc<SourceFile>) -> Result<Self, CompileError>;
}
