//! The word-splitting tokenizer.
//!
//! Tokenization is line-oriented: every line is comment-stripped, trimmed and split on spaces,
//! then each word is classified in a fixed priority order. There is no grammar; call-like syntax
//! and indexing are flattened by splitting on the delimiter and feeding the fragments back through
//! the same classifier (see [`Lexer::retokenize`]). This buys a lot of surface syntax for very
//! little machinery, at the price of no nesting guarantees and no operator precedence.

use std::sync::Arc;

use super::Parse;
use super::language::{
	Builtin, COMPARISONS, Keyword, RESERVED, is_qualifier, is_value, operator_kind, remove_comments,
	string_replacements, valid_name,
};
use super::token::{Statement, Token, TokenKind};
use crate::error::{CompileError, SourceFile};
use crate::registers::is_register;
use crate::target::{PlatformBits, TargetConfig};

/// Tokenize the given program text into a flat token sequence, one separator token per logical
/// line that produced any tokens.
/// # Errors
/// A word matching no classification rule is a fatal lexical error; there is no recovery or
/// partial result.
pub fn tokenize(source_code: &Arc<SourceFile>, config: &TargetConfig) -> Result<Vec<Token>, CompileError> {
	Lexer { config, src: source_code.clone() }.run(&source_code.text)
}

struct Lexer<'a> {
	config: &'a TargetConfig,
	src:    Arc<SourceFile>,
}

impl Lexer<'_> {
	fn run(&self, text: &str) -> Result<Vec<Token>, CompileError> {
		let mut tokens = Vec::new();
		// Are we inside inline_c ... end, or void ... } regions? Both are opaque to the tokenizer.
		let mut inline_c = false;
		let mut c_block = false;

		for (line_number, raw_line) in text.split('\n').enumerate() {
			let line = u32::try_from(line_number).unwrap_or(u32::MAX);
			let statement = remove_comments(raw_line.trim());
			let words = statement.split(' ').map(str::trim).collect::<Vec<&str>>();
			let Some(&first_word) = words.first() else { continue };

			if first_word == "void" {
				c_block = true;
				continue;
			} else if inline_c && first_word == "end" {
				// "end" closes both kinds of inline C regions.
				inline_c = false;
				c_block = false;
				continue;
			} else if c_block && first_word == "}" {
				c_block = false;
				continue;
			} else if first_word == "inline_c" {
				inline_c = true;
				continue;
			} else if inline_c || c_block {
				continue;
			}

			// Constant and variable declarations legitimately contain comma-separated literal
			// lists, so comma splitting is off for the rest of those lines.
			let suppress_comma_split = first_word == "const" || first_word == "var";

			let emitted_before = tokens.len();
			let mut collected: Option<String> = None;
			for word in &words {
				self.word(word, line, suppress_comma_split, &mut collected, &mut tokens)?;
			}
			if let Some(collected) = collected {
				tokens.push(Token::new(TokenKind::String, string_replacements(collected.trim_end()), line));
			}
			if tokens.len() > emitted_before {
				tokens.push(Token::new(TokenKind::Separator, ";", line));
			}
		}
		Ok(tokens)
	}

	/// Classify one word. The order of the rules is the contract; see the module documentation.
	#[allow(clippy::too_many_lines)]
	fn word(
		&self,
		word: &str,
		line: u32,
		suppress_comma_split: bool,
		collected: &mut Option<String>,
		tokens: &mut Vec<Token>,
	) -> Result<(), CompileError> {
		if word.is_empty() {
			return Ok(());
		}
		// In string-accumulation mode every further word is part of the literal.
		if let Some(accumulated) = collected.as_mut() {
			accumulated.push_str(word);
			accumulated.push(' ');
			return Ok(());
		}

		if is_register(word) {
			tokens.push(Token::new(TokenKind::Register, word, line));
		} else if COMPARISONS.contains(&word) {
			tokens.push(Token::new(TokenKind::Comparison, word, line));
		} else if let Some(kind) = operator_kind(word) {
			tokens.push(Token::new(kind, word, line));
		} else if let Ok(keyword) = Keyword::parse(word, line, self.src.clone()) {
			tokens.push(Token::new(TokenKind::Keyword(keyword), word, line));
		} else if let Ok(builtin) = Builtin::parse(word, line, self.src.clone()) {
			tokens.push(Token::new(TokenKind::Builtin(builtin), word, line));
		} else if RESERVED.contains(&word) {
			if ["a", "b", "c", "d"].contains(&word) {
				// Single-letter aliases expand to the general purpose register of the right width.
				let register = match self.config.platform_bits {
					PlatformBits::Bits64 => format!("r{word}x"),
					PlatformBits::Bits32 => format!("e{word}x"),
					PlatformBits::Bits16 => format!("{word}x"),
				};
				tokens.push(Token::new(TokenKind::Register, register, line));
			} else {
				tokens.push(Token::new(TokenKind::Reserved, word, line));
			}
		} else if is_value(word) {
			tokens.push(Token::new(TokenKind::Value, word, line));
		} else if word == "_" {
			tokens.push(Token::new(TokenKind::Disregard, word, line));
		} else if let Some(base) = word.strip_suffix("++") {
			let rewritten = self.retokenize(&format!("{base} += 1"), " ", line)?;
			tokens.extend(rewritten);
		} else if let Some(base) = word.strip_suffix("--") {
			let rewritten = self.retokenize(&format!("{base} -= 1"), " ", line)?;
			tokens.extend(rewritten);
		} else if valid_name(word) {
			tokens.push(Token::new(TokenKind::ValidName, word, line));
		} else if is_qualifier(word) {
			tokens.push(Token::new(TokenKind::Qualifier, word, line));
		} else if word.contains('(') {
			tokens.extend(self.retokenize(word, "(", line)?);
		} else if word.contains(')') {
			tokens.extend(self.retokenize(word, ")", line)?);
		} else if word.contains('[') {
			tokens.extend(self.retokenize(word, "[", line)?);
		} else if word.contains(']') {
			tokens.extend(self.retokenize(word, "]", line)?);
		} else if !suppress_comma_split && word.contains(',') {
			tokens.extend(self.retokenize(word, ",", line)?);
		} else if word.contains("..") {
			tokens.extend(self.retokenize(word, "..", line)?);
		} else if word.contains('"') {
			*collected = Some(format!("{word} "));
		} else if word.starts_with(|character: char| character.is_ascii_digit() || character == '$') {
			// Assume it's a value, e.g. a hexadecimal literal.
			tokens.push(Token::new(TokenKind::Value, word, line));
		} else if word.contains('+') || word.contains('-') {
			// Assume it's an address, like bp+5 or si-0x6.
			tokens.push(Token::new(TokenKind::MemExpr, format!("[{word}]"), line));
		} else if word.ends_with(':') {
			tokens.push(Token::new(TokenKind::AsmLabel, word, line));
		} else if word.matches(':').count() == 1 {
			let (segment, offset) = word.split_once(':').unwrap_or_default();
			if is_register(segment) && is_register(offset) {
				tokens.push(Token::new(TokenKind::SegmentOffset, format!("[{word}]"), line));
			} else {
				return Err(CompileError::UnrecognizedSegmentOffset {
					word:     word.to_owned(),
					src:      self.src.clone(),
					location: self.src.line_span(line),
				});
			}
		} else {
			return Err(CompileError::UnrecognizedToken {
				word:     word.to_owned(),
				src:      self.src.clone(),
				location: self.src.line_span(line),
			});
		}
		Ok(())
	}

	/// Split a word on the given delimiter and feed each fragment back through the classifier,
	/// splicing in all non-separator results. This is how call-like syntax `f(a, b)` and indexing
	/// `[x+4]` are flattened without a recursive-descent grammar.
	fn retokenize(&self, text: &str, separator: &str, line: u32) -> Result<Vec<Token>, CompileError> {
		let mut tokens = Vec::new();
		let mut collected: Option<String> = None;
		for fragment in text.split(separator) {
			for word in fragment.split(' ') {
				self.word(word, line, false, &mut collected, &mut tokens)?;
			}
		}
		if let Some(collected) = collected {
			tokens.push(Token::new(TokenKind::String, string_replacements(collected.trim_end()), line));
		}
		Ok(tokens)
	}
}

/// Split a flat token stream into statements at separator boundaries. Empty statements are
/// dropped.
#[must_use]
pub fn split_statements(tokens: &[Token]) -> Vec<Statement> {
	let mut statements = Vec::new();
	let mut current = Vec::new();
	for token in tokens {
		if token.kind == TokenKind::Separator {
			if !current.is_empty() {
				statements.push(Statement(std::mem::take(&mut current)));
			}
		} else {
			current.push(token.clone());
		}
	}
	if !current.is_empty() {
		statements.push(Statement(current));
	}
	statements
}

/// Keep only the tokens whose kind satisfies the given filter.
#[must_use]
pub fn filter_tokens(tokens: &[Token], filter: impl Fn(&Token) -> bool) -> Vec<Token> {
	tokens.iter().filter(|token| filter(token)).cloned().collect()
}

#[cfg(test)]
mod test {
	use super::*;

	fn tokenize_64(source: &str) -> Vec<Token> {
		let config = TargetConfig::new(64, false, false).unwrap();
		tokenize(&SourceFile::from_source(source), &config).unwrap()
	}

	#[test]
	fn one_separator_per_line() {
		let tokens = tokenize_64("fun main\n\n// comment only\nret\nend\n");
		let separators = tokens.iter().filter(|token| token.kind == TokenKind::Separator).count();
		assert_eq!(separators, 3);
	}

	#[test]
	fn call_syntax_is_flattened() {
		let tokens = tokenize_64("syscall(60, 0)");
		let kinds = tokens.iter().map(|token| token.kind).collect::<Vec<_>>();
		assert_eq!(kinds, vec![
			TokenKind::Builtin(Builtin::Syscall),
			TokenKind::Value,
			TokenKind::Value,
			TokenKind::Separator
		]);
	}

	#[test]
	fn register_aliases_expand_by_width() {
		let config = TargetConfig::new(32, false, false).unwrap();
		let tokens = tokenize(&SourceFile::from_source("a = 1"), &config).unwrap();
		assert_eq!(tokens[0].kind, TokenKind::Register);
		assert_eq!(tokens[0].value, "eax");

		let tokens = tokenize_64("b = 1");
		assert_eq!(tokens[0].value, "rbx");
	}

	#[test]
	fn increment_is_rewritten() {
		let tokens = tokenize_64("rax++");
		let kinds = tokens.iter().map(|token| token.kind).collect::<Vec<_>>();
		assert_eq!(kinds, vec![TokenKind::Register, TokenKind::Addition, TokenKind::Value, TokenKind::Separator]);
		assert_eq!(tokens[2].value, "1");
	}

	#[test]
	fn strings_accumulate_to_end_of_line() {
		let tokens = tokenize_64("const msg = \"hello world\"");
		let string = tokens.iter().find(|token| token.kind == TokenKind::String).unwrap();
		assert_eq!(string.value, "\"hello world\"");
	}

	#[test]
	fn string_escapes_become_byte_splices() {
		let tokens = tokenize_64("const msg = \"hi\\n\"");
		let string = tokens.iter().find(|token| token.kind == TokenKind::String).unwrap();
		assert_eq!(string.value, "\"hi\", 10");
	}

	#[test]
	fn const_line_keeps_commas() {
		let tokens = tokenize_64("const table = 1, 2, 3");
		let values = tokens.iter().filter(|token| token.kind == TokenKind::Value).count();
		assert_eq!(values, 3);
	}

	#[test]
	fn inline_c_regions_produce_no_tokens() {
		let tokens = tokenize_64("inline_c\nint main() { return 0; }\nend\nret");
		let kinds = tokens.iter().map(|token| token.kind).collect::<Vec<_>>();
		assert_eq!(kinds, vec![TokenKind::Keyword(Keyword::Ret), TokenKind::Separator]);
	}

	#[test]
	fn memory_expressions_are_bracketed() {
		let tokens = tokenize_64("asm 64 mov rax bp+5");
		let memexpr = tokens.iter().find(|token| token.kind == TokenKind::MemExpr).unwrap();
		assert_eq!(memexpr.value, "[bp+5]");
	}

	#[test]
	fn segment_offset_pairs() {
		let config = TargetConfig::new(16, false, false).unwrap();
		let tokens = tokenize(&SourceFile::from_source("address es:di"), &config).unwrap();
		// "address" is a keyword; "es:di" must come through as one segment+offset token.
		assert_eq!(tokens[1].kind, TokenKind::SegmentOffset);
		assert_eq!(tokens[1].value, "[es:di]");
	}

	#[test]
	fn unknown_words_are_fatal() {
		let config = TargetConfig::new(64, false, false).unwrap();
		let result = tokenize(&SourceFile::from_source("fun ma!in"), &config);
		assert!(matches!(result, Err(CompileError::UnrecognizedToken { .. })));
	}

	#[test]
	fn statement_splitting() {
		let tokens = tokenize_64("fun main\nret\nend");
		let statements = split_statements(&tokens);
		assert_eq!(statements.len(), 3);
		assert_eq!(statements[0].len(), 2);
		assert_eq!(statements[1].len(), 1);
	}
}
