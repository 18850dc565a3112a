//! Tokens and statements.

use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use flexstr::SharedStr;

use super::language::{Builtin, Keyword};

/// The type of a token.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TokenKind {
	/// A register, like `rax` or `di`.
	Register,
	/// `=`.
	Assignment,
	/// A numeric value.
	Value,
	/// A keyword, interned at tokenization time.
	Keyword(Keyword),
	/// A built-in function, interned at tokenization time.
	Builtin(Builtin),
	/// A syntactically valid identifier.
	ValidName,
	/// A string literal, escape sequences already expanded.
	String,
	/// The disregard placeholder `_`.
	Disregard,
	/// A reserved word, like `funparam`.
	Reserved,
	/// A declared variable. Reserved by the token model; the tokenizer classifies variable names
	/// as [`Self::ValidName`] and the program state tells them apart.
	Variable,
	/// `+=`.
	Addition,
	/// `-=`.
	Subtraction,
	/// `*=`.
	Multiplication,
	/// `/=`.
	Division,
	/// `&=`.
	And,
	/// `|=`.
	Or,
	/// `^=`.
	Xor,
	/// A comparison operator, like `==` or `<=`.
	Comparison,
	/// The stack operation `->` (and its mirrored form).
	Arrow,
	/// A memory expression, like `[di+321]`.
	MemExpr,
	/// An assembly label, like `.hang:`.
	AsmLabel,
	/// The rotate left operator `<<<`.
	RotateLeft,
	/// The rotate right operator `>>>`.
	RotateRight,
	/// A segment:offset pair for 16-bit assembly, like `es:di`.
	SegmentOffset,
	/// `..`, the concatenation delimiter. Reserved by the token model; the tokenizer splits on it
	/// and never emits one.
	Concat,
	/// The shift left operator `<<`.
	ShiftLeft,
	/// The shift right operator `>>`.
	ShiftRight,
	/// A size qualifier, like `BYTE` or `WORD`.
	Qualifier,
	/// The exchange operator `<->`.
	Exchange,
	/// The port output operator `==>`.
	Out,
	/// The port input operator `<==`.
	In,
	/// The statement separator, one per logical line.
	Separator,
	/// An unclassified token. Reserved by the token model; classification failure is a hard error
	/// instead.
	Unknown,
}

impl TokenKind {
	/// A short human-readable description of this token type, used in diagnostics.
	#[must_use]
	pub const fn description(self) -> &'static str {
		match self {
			Self::Register => "register",
			Self::Assignment => "assignment",
			Self::Value => "value",
			Self::Keyword(_) => "keyword",
			Self::Builtin(_) => "built-in",
			Self::ValidName => "name",
			Self::String => "string",
			Self::Disregard => "disregard",
			Self::Reserved => "reserved",
			Self::Variable => "variable",
			Self::Addition => "addition",
			Self::Subtraction => "subtraction",
			Self::Multiplication => "multiplication",
			Self::Division => "division",
			Self::And => "and",
			Self::Or => "or",
			Self::Xor => "xor",
			Self::Comparison => "comparison",
			Self::Arrow => "stack operation",
			Self::MemExpr => "address expression",
			Self::AsmLabel => "assembly label",
			Self::RotateLeft => "rol",
			Self::RotateRight => "ror",
			Self::SegmentOffset => "segment+offset",
			Self::Concat => "concatenation",
			Self::ShiftLeft => "shl",
			Self::ShiftRight => "shr",
			Self::Qualifier => "qualifier",
			Self::Exchange => "xchg",
			Self::Out => "out",
			Self::In => "in",
			Self::Separator => ";",
			Self::Unknown => "?",
		}
	}
}

impl Display for TokenKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
		write!(f, "{}", self.description())
	}
}

/// Everything there is to know about a parsed token.
///
/// Tokens are immutable once created. The `extra` side channel is used exactly once in the whole
/// pipeline: the `chr` rewrite replaces a register token with a stack-relative expression and
/// squirrels the original register name away here, so that the system call generator can still
/// spill that register.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Token {
	/// The type of this token.
	pub kind:  TokenKind,
	/// The literal text value.
	pub value: SharedStr,
	/// The zero-based source line (statement number) this token came from.
	pub line:  u32,
	/// Original register name carried through a rewrite, if any.
	pub extra: Option<SharedStr>,
}

impl Token {
	/// Create a new token without an `extra` annotation.
	#[must_use]
	pub fn new(kind: TokenKind, value: impl Into<SharedStr>, line: u32) -> Self {
		Self { kind, value: value.into(), line, extra: None }
	}

	/// Whether this token is the given keyword.
	#[must_use]
	pub fn is_keyword(&self, keyword: Keyword) -> bool {
		self.kind == TokenKind::Keyword(keyword)
	}

	/// Whether this token is the given builtin.
	#[must_use]
	pub fn is_builtin(&self, builtin: Builtin) -> bool {
		self.kind == TokenKind::Builtin(builtin)
	}
}

impl Display for Token {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
		if self.kind == TokenKind::Separator {
			write!(f, ";")
		} else {
			write!(f, "{}:{}", self.kind, self.value)
		}
	}
}

/// A non-empty ordered sequence of tokens between two separators, with no trailing separator. The
/// sequence of token kinds (plus selected literal values) is the dispatch key for code generation.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Statement(pub Vec<Token>);

impl Statement {
	/// The source line of this statement, taken from its first token.
	#[must_use]
	pub fn line(&self) -> u32 {
		self.0.first().map_or(0, |token| token.line)
	}

	/// Remove the token at the given index, shifting the rest left.
	pub fn remove(&mut self, index: usize) -> Token {
		self.0.remove(index)
	}
}

impl Deref for Statement {
	type Target = Vec<Token>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl DerefMut for Statement {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

impl Display for Statement {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
		let mut first = true;
		for token in &self.0 {
			if !first {
				write!(f, " ")?;
			}
			write!(f, "{token}")?;
			first = false;
		}
		Ok(())
	}
}
