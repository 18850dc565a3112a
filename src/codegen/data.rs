//! Constant and variable declarations, and block copies between them.

use std::sync::Arc;

use crate::error::{CompileError, SourceFile};
use crate::parser::token::{Statement, TokenKind};
use crate::program::ProgramState;
use crate::target::{PlatformBits, TargetConfig};

/// `var name size`: reserve bytes in the bss section, together with a capacity constant and a
/// mutable length cell sized to the platform word.
pub(super) fn variable_declaration(
	st: &Statement,
	state: &mut ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	if st[1].kind != TokenKind::ValidName {
		return Err(CompileError::InvalidName {
			name:     st[1].value.to_string(),
			role:     "variable",
			src:      src.clone(),
			location: src.line_span(st[1].line),
		});
	}
	let name = st[1].value.clone();
	let size = &st[2].value;
	if st[2].kind == TokenKind::Value || size.starts_with("_length_of_") {
		state.define(&name, src, st[1].line)?;
		if !size.starts_with("_length_of_") {
			// The byte count marks the name as bss-backed, for indirect length lookups.
			let bytes = size.parse::<usize>().map_err(|_| CompileError::InvalidVariableDeclaration {
				src:      src.clone(),
				location: src.line_span(st[2].line),
			})?;
			state.variables.insert(name.clone(), bytes);
		}
		let mut bsscode = String::new();
		bsscode += &format!("{name}: resb {size}\t\t\t\t; reserve {size} bytes as {name}\n");
		bsscode += &format!("_capacity_of_{name} equ {size}\t\t; size of reserved memory\n");
		bsscode += &format!("_length_of_{name}: ");
		bsscode += match config.platform_bits {
			PlatformBits::Bits64 => "resd 1",
			PlatformBits::Bits32 => "resw 1",
			PlatformBits::Bits16 => "resb 1",
		};
		bsscode += "\t\t; current length of contents (points to after the data)\n";
		return Ok(bsscode);
	}
	Err(CompileError::InvalidVariableDeclaration { src: src.clone(), location: src.line_span(st.line()) })
}

/// `const name = value-list`: emit a data-section definition sized by platform and kind, always
/// followed by a `_length_of_name` size constant.
pub(super) fn constant_declaration(
	st: &Statement,
	state: &mut ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	if st[1].kind != TokenKind::ValidName {
		return Err(CompileError::InvalidName {
			name:     st[1].value.to_string(),
			role:     "constant",
			src:      src.clone(),
			location: src.line_span(st[1].line),
		});
	}
	let name = st[1].value.clone();
	if st[2].kind == TokenKind::Assignment
		&& matches!(st[3].kind, TokenKind::String | TokenKind::Value | TokenKind::ValidName)
	{
		if st[3].kind == TokenKind::ValidName && !state.is_defined(&st[3].value) {
			return Err(CompileError::UndefinedName {
				name:     st[3].value.to_string(),
				src:      src.clone(),
				location: src.line_span(st[3].line),
			});
		}
		state.define(&name, src, st[1].line)?;
		let mut asmcode = String::new();
		if st[3].kind == TokenKind::Value {
			asmcode += &format!("{name}:\t{} ", match config.platform_bits {
				PlatformBits::Bits64 => "dq",
				PlatformBits::Bits32 => "dw",
				PlatformBits::Bits16 => "db",
			});
		} else {
			// Strings and name aliases are data; their symbol denotes an address.
			asmcode += &format!("{name}:\tdb ");
			state.data_constants.push(name.clone());
		}
		for (index, token) in st.iter().enumerate().skip(3) {
			asmcode += &token.value;
			if index + 1 != st.len() {
				asmcode += ", ";
			}
		}
		if st[3].kind == TokenKind::String {
			asmcode += "\t\t; constant string\n";
		} else {
			asmcode += "\t\t; constant value\n";
		}
		// Special naming, for looking up the length later.
		asmcode += &format!("_length_of_{name} equ $ - {name}\t; size of constant value\n");
		return Ok(asmcode);
	}
	Err(CompileError::InvalidConstantDeclaration { src: src.clone(), location: src.line_span(st.line()) })
}

/// `name = other`: copy bytes from a constant into reserved bss memory with `rep movsb`, storing
/// the copied length into the variable's length cell.
pub(super) fn copy_into_variable(
	st: &Statement,
	state: &ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	let to = &st[0].value;
	if !state.is_defined(to) {
		return Err(CompileError::NotARegister {
			name:     to.to_string(),
			src:      src.clone(),
			location: src.line_span(st[0].line),
		});
	}
	let from = &st[2].value;
	let length_expression = format!("_length_of_{from}");
	let to_position = format!("[_length_of_{to}]");
	let mut asmcode = String::new();
	match config.platform_bits {
		PlatformBits::Bits64 => {
			asmcode += &format!("\tmov rdi, {to}\t\t\t; copy bytes from {from} to {to}\n");
			asmcode += &format!("\tmov rsi, {from}\n");
			asmcode += &format!("\tmov rcx, {length_expression}\n");
			asmcode += &format!("\tmov {to_position}, rcx\n");
			asmcode += "\tcld\n";
			asmcode += "\trep movsb\t\t\t\t; copy bytes\n";
		},
		PlatformBits::Bits32 => {
			asmcode += &format!("\tmov edi, {to}\t\t\t; copy bytes from {from} to {to}\n");
			asmcode += &format!("\tmov esi, {from}\n");
			asmcode += &format!("\tmov ecx, {length_expression}\n");
			asmcode += &format!("\tmov {to_position}, ecx\n");
			asmcode += "\tcld\n";
			asmcode += "\trep movsb\t\t\t\t; copy bytes\n";
		},
		PlatformBits::Bits16 => {
			asmcode += &format!("\tmov di, {to}\t\t\t; copy bytes from {from} to {to}\n");
			asmcode += &format!("\tmov si, {from}\n");
			asmcode += &format!("\tmov cx, {length_expression}\n");
			asmcode += &format!("\tmov {to_position}, cx\n");
			asmcode += "\trep movsb\t\t\t\t; copy bytes\n";
		},
	}
	Ok(asmcode)
}

/// `name += other`: append bytes from a constant after the variable's current contents and grow
/// its length cell.
pub(super) fn append_to_variable(st: &Statement, config: &TargetConfig) -> String {
	let to = &st[0].value;
	let from = &st[2].value;
	let length_address = format!("[_length_of_{to}]");
	let mut asmcode = String::new();
	match config.platform_bits {
		PlatformBits::Bits64 => {
			asmcode += &format!("\tmov rdi, {to}\t\t; add bytes from \"{from}\" to {to}\n");
			asmcode += &format!("\tadd rdi, {length_address}\n");
			asmcode += &format!("\tmov rsi, {from}\n");
			asmcode += &format!("\tmov rcx, _length_of_{from}\n");
			asmcode += &format!("\tadd {length_address}, rcx\n");
			asmcode += "\tcld\n";
			asmcode += "\trep movsb\t\t\t\t; copy bytes\n";
		},
		PlatformBits::Bits32 => {
			asmcode += &format!("\tmov edi, {to}\t\t; add bytes from \"{from}\" to {to}\n");
			asmcode += &format!("\tadd edi, {length_address}\n");
			asmcode += &format!("\tmov esi, {from}\n");
			asmcode += &format!("\tmov ecx, _length_of_{from}\n");
			asmcode += &format!("\tadd {length_address}, ecx\n");
			asmcode += "\tcld\n";
			asmcode += "\trep movsb\t\t\t\t; copy bytes\n";
		},
		PlatformBits::Bits16 => {
			asmcode += &format!("\tmov di, {to}\t\t; add bytes from \"{from}\" to {to}\n");
			asmcode += &format!("\tadd di, {length_address}\n");
			asmcode += &format!("\tmov si, {from}\n");
			asmcode += &format!("\tmov cx, _length_of_{from}\n");
			asmcode += &format!("\tadd {length_address}, cx\n");
			asmcode += "\trep movsb\t\t\t\t; copy bytes\n";
		},
	}
	asmcode
}
