//! Statement reduction.
//!
//! Replaces built-in function calls (`len`, `print`, `chr`) with more basic token sequences
//! before code generation sees them. Only replacements that stay within one statement are
//! possible. Reduction is not guaranteed to reach a fixed point in one pass; the code generator
//! re-enters reduction whenever the statement length changed.

use std::sync::Arc;

use crate::error::{CompileError, SourceFile};
use crate::parser::language::Builtin;
use crate::parser::lexer::tokenize;
use crate::parser::token::{Statement, Token, TokenKind};
use crate::program::ProgramState;
use crate::target::{PlatformBits, TargetConfig};

/// Apply one pass of built-in call rewrites to the statement.
/// # Errors
/// `len` of an undefined name, `print` of an immediate string and `chr` of anything but a
/// register are fatal.
#[allow(clippy::too_many_lines)]
pub fn reduce(
	statement: Statement,
	state: &ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<Statement, CompileError> {
	let mut st = statement;
	let mut i = 0;
	while i + 1 < st.len() {
		if st[i].is_builtin(Builtin::Len) && st[i + 1].kind == TokenKind::ValidName {
			// Replace len(name) with _length_of_name, or [_length_of_name] if it lives in .bss
			// (bss lengths are runtime-mutable, so the lookup is indirect).
			let name = st[i + 1].value.clone();
			if !state.is_defined(&name) {
				return Err(CompileError::UndefinedName {
					name:     name.to_string(),
					src:      src.clone(),
					location: src.line_span(st[i + 1].line),
				});
			}
			let kind = st[i + 1].kind;
			let line = st.line();
			st.remove(i + 1);
			st[i] = if state.variables.contains_key(&name) {
				Token::new(kind, format!("[_length_of_{name}]"), line)
			} else {
				Token::new(kind, format!("_length_of_{name}"), line)
			};
		} else if st[i].is_builtin(Builtin::Len) && st[i + 1].kind == TokenKind::Register {
			// The platform's natural default write size.
			let length = match config.platform_bits {
				PlatformBits::Bits64 => "4",
				PlatformBits::Bits32 => "2",
				PlatformBits::Bits16 => "1",
			};
			let line = st.line();
			st.remove(i + 1);
			st[i] = Token::new(TokenKind::Value, length, line);
		} else if st[i].is_builtin(Builtin::Print) && st[i + 1].kind == TokenKind::String {
			return Err(CompileError::PrintOfStringLiteral {
				src:      src.clone(),
				location: src.line_span(st[i + 1].line),
			});
		} else if st[i].is_builtin(Builtin::Print)
			&& matches!(st[i + 1].kind, TokenKind::ValidName | TokenKind::Register)
		{
			// Replace print(msg) with syscall(1, 1, msg, len(msg)) on 64-bit and
			// int(0x80, 4, 1, msg, len(msg)) on 32-bit.
			let value = st[i + 1].value.clone();
			let extra = st[i + 1].extra.clone();
			let line = st.line();
			let (command, written_token_position) = match config.platform_bits {
				PlatformBits::Bits64 => {
					// Single bytes, typically from chr(...), live at the stack pointer.
					if value == "rsp" {
						(format!("syscall(1, 1, {value}, 1)"), 3)
					} else {
						(format!("syscall(1, 1, {value}, len({value}))"), 3)
					}
				},
				PlatformBits::Bits32 =>
					if value == "esp" {
						(format!("int(0x80, 4, 1, {value}, 1)"), 4)
					} else {
						(format!("int(0x80, 4, 1, {value}, len({value}))"), 4)
					},
				// No simple reduction for 16-bit assembly; the generator has a dedicated case.
				PlatformBits::Bits16 => return Ok(st),
			};
			let mut tokens = tokenize(&SourceFile::from_source(&command), config)?;
			tokens.retain(|token| token.kind != TokenKind::Separator);
			for token in &mut tokens {
				token.line = line;
			}
			tokens[written_token_position].extra = extra;
			st = Statement(tokens);
		} else if st[i].is_builtin(Builtin::Chr) && st[i + 1].kind == TokenKind::ValidName {
			return Err(CompileError::Unsupported {
				feature:  "chr of a defined name".to_owned(),
				src:      src.clone(),
				location: src.line_span(st[i + 1].line),
			});
		} else if st[i].is_builtin(Builtin::Chr) && st[i + 1].kind == TokenKind::Register {
			// Replace chr(register) with the stack pointer register, squirreling the original
			// register away in the extra field. The system call generator spills that register's
			// low byte to the stack, so its address can be handed to a byte-oriented call.
			let register = st[i + 1].value.clone();
			let line = st.line();
			let stack_pointer = match config.platform_bits {
				PlatformBits::Bits64 => "rsp",
				PlatformBits::Bits32 => "esp",
				PlatformBits::Bits16 =>
					return Err(CompileError::Unsupported {
						feature:  "chr() for 16-bit platforms".to_owned(),
						src:      src.clone(),
						location: src.line_span(line),
					}),
			};
			st.remove(i + 1);
			st[i] = Token { kind: TokenKind::Register, value: stack_pointer.into(), line, extra: Some(register) };
		}
		i += 1;
	}
	Ok(st)
}

#[cfg(test)]
mod test {
	use flexstr::SharedStr;

	use super::*;
	use crate::parser::lexer::split_statements;

	fn reduce_str(source: &str, bits: u8, state: &ProgramState) -> Result<Statement, CompileError> {
		let config = TargetConfig::new(bits, false, false).unwrap();
		let src = SourceFile::from_source(source);
		let tokens = tokenize(&src, &config).unwrap();
		let statement = split_statements(&tokens).remove(0);
		reduce(statement, state, &config, &src)
	}

	fn state_with_const(name: &str) -> ProgramState {
		let mut state = ProgramState::new();
		state.defined_names.push(SharedStr::from(name));
		state
	}

	#[test]
	fn len_of_const_is_plain_symbol() {
		let state = state_with_const("msg");
		let reduced = reduce_str("rax = len msg", 64, &state).unwrap();
		assert_eq!(reduced[2].value, "_length_of_msg");
	}

	#[test]
	fn len_of_variable_is_indirect() {
		let mut state = state_with_const("buffer");
		state.variables.insert(SharedStr::from("buffer"), 1024);
		let reduced = reduce_str("rax = len buffer", 64, &state).unwrap();
		assert_eq!(reduced[2].value, "[_length_of_buffer]");
	}

	#[test]
	fn len_of_undefined_name_fails() {
		let state = ProgramState::new();
		assert!(matches!(
			reduce_str("rax = len nothing", 64, &state),
			Err(CompileError::UndefinedName { .. })
		));
	}

	#[test]
	fn len_of_register_is_platform_write_size() {
		let state = ProgramState::new();
		assert_eq!(reduce_str("rbx = len rax", 64, &state).unwrap()[2].value, "4");
		assert_eq!(reduce_str("ebx = len eax", 32, &state).unwrap()[2].value, "2");
	}

	#[test]
	fn print_becomes_syscall() {
		let state = state_with_const("msg");
		let reduced = reduce_str("print msg", 64, &state).unwrap();
		assert!(reduced[0].is_builtin(Builtin::Syscall));
		assert_eq!(reduced[3].value, "msg");
	}

	#[test]
	fn print_becomes_interrupt_on_32_bit() {
		let state = state_with_const("msg");
		let reduced = reduce_str("print msg", 32, &state).unwrap();
		assert!(reduced[0].is_builtin(Builtin::Int));
		assert_eq!(reduced[1].value, "0x80");
		assert_eq!(reduced[4].value, "msg");
	}

	#[test]
	fn print_of_immediate_string_fails() {
		let state = ProgramState::new();
		assert!(matches!(
			reduce_str("print \"hello\"", 64, &state),
			Err(CompileError::PrintOfStringLiteral { .. })
		));
	}

	#[test]
	fn chr_carries_the_original_register() {
		let state = ProgramState::new();
		let config = TargetConfig::new(64, false, false).unwrap();
		let src = SourceFile::from_source("print chr rbx");
		let tokens = tokenize(&src, &config).unwrap();
		let mut statement = split_statements(&tokens).remove(0);
		// chr rbx collapses to the stack pointer with rbx in the side channel; the print rewrite
		// then carries that annotation into the written parameter. That takes two passes, like the
		// generator's fixed-point loop.
		loop {
			let length = statement.len();
			statement = reduce(statement, &state, &config, &src).unwrap();
			if statement.len() == length {
				break;
			}
		}
		assert!(statement[0].is_builtin(Builtin::Syscall));
		let written = statement.iter().find(|token| token.value == "rsp").unwrap();
		assert_eq!(written.extra.as_deref(), Some("rbx"));
	}
}
