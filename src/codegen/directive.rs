//! Directive-like statements: halt, bootable kernel header, extern symbols, raw assembly
//! passthrough and the loop-data keywords.

use std::sync::Arc;

use crate::error::{CompileError, SourceFile};
use crate::parser::token::{Statement, TokenKind};
use crate::program::ProgramState;
use crate::target::{PlatformBits, TargetConfig};

/// `halt`: stop the CPU for good.
pub(super) fn halt() -> String {
	let mut asmcode = String::from("\t; --- full stop ---\n");
	asmcode += "\tcli\t\t; clear interrupts\n";
	asmcode += ".hang:\n";
	asmcode += "\thlt\n";
	asmcode += "\tjmp .hang\t; loop forever\n\n";
	asmcode
}

/// 16-bit `print name`: write the named data to standard output through the DOS "Write File or
/// Device" service.
pub(super) fn print_16_bit(st: &Statement, state: &ProgramState) -> String {
	let name = &st[1].value;
	let mut asmcode = String::from("\t; --- output string of given length ---\n");
	asmcode += &format!("\tmov dx, {name}\n");
	if state.variables.contains_key(name) {
		// A variable in .bss; its length cell is read indirectly.
		asmcode += &format!("\tmov cx, [_length_of_{name}]\n");
	} else {
		asmcode += &format!("\tmov cx, _length_of_{name}\n");
	}
	asmcode += "\tmov bx, 1\n";
	asmcode += "\tmov ah, 0x40\t\t; prepare to call \"Write File or Device\"\n";
	asmcode += "\tint 0x21\n\n";
	asmcode
}

/// `counter value`: set the loop counter register.
pub(super) fn set_counter(st: &Statement, config: &TargetConfig) -> String {
	format!("\tmov {}, {}\t\t\t; set (loop) counter\n", config.counter_register(), st[1].value)
}

/// The number of bits of space a decimal number takes, or 0 if it is not a number.
#[allow(clippy::cast_possible_truncation)]
fn numbits(number: &str) -> i32 {
	number.parse::<f64>().map_or(0, |value| value.log2().ceil() as i32)
}

/// `value v`: load the value to be written by `write`/`loopwrite` into the accumulator. On 16-bit
/// targets the operand width picks `al` vs `ax` and is remembered for the write instruction
/// selection.
pub(super) fn set_value(
	st: &Statement,
	state: &mut ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	let value = &st[1].value;
	let mut asmcode = String::new();
	match config.platform_bits {
		PlatformBits::Bits64 => {
			asmcode = format!("\tmov rax, {value}\t\t\t; set value, in preparation for looping\n");
			state.loop_step = 8;
		},
		PlatformBits::Bits32 => {
			asmcode = format!("\tmov eax, {value}\t\t\t; set value, in preparation for looping\n");
			state.loop_step = 4;
		},
		PlatformBits::Bits16 =>
			if st[1].kind == TokenKind::Value {
				if (value.starts_with("0x") && value.len() == 6) || numbits(value) > 8 {
					asmcode += &format!("\tmov ax, {value}\t\t\t; set value, in preparation for stosw\n");
					state.loop_step = 2;
				} else if (value.starts_with("0x") && value.len() == 4) || numbits(value) <= 8 {
					asmcode += &format!("\tmov al, {value}\t\t\t; set value, in preparation for stosb\n");
					state.loop_step = 1;
				} else {
					return Err(CompileError::AmbiguousWidth {
						value:    value.to_string(),
						src:      src.clone(),
						location: src.line_span(st[1].line),
					});
				}
			} else if st[1].kind == TokenKind::Register {
				match value.as_str() {
					"al" | "ah" | "bl" | "bh" | "cl" | "ch" | "dl" | "dh" => {
						asmcode +=
							&format!("\tmov al, {value}\t\t\t; set value from register, in preparation for stosb\n");
						state.loop_step = 1;
					},
					_ => {
						asmcode +=
							&format!("\tmov ax, {value}\t\t\t; set value from register, in preparation for stosw\n");
						state.loop_step = 2;
					},
				}
			} else {
				return Err(CompileError::AmbiguousWidth {
					value:    value.to_string(),
					src:      src.clone(),
					location: src.line_span(st[1].line),
				});
			},
	}
	Ok(asmcode)
}

/// `loopwrite`: write the accumulator repeatedly, counter register times.
pub(super) fn loop_write(state: &ProgramState, config: &TargetConfig) -> String {
	match config.platform_bits {
		PlatformBits::Bits16 =>
			if state.loop_step == 2 {
				"\trep stosw\t\t\t; write the value in ax, cx times, starting at es:di\n".to_owned()
			} else {
				"\trep stosb\t\t\t; write the value in al, cx times, starting at es:di\n".to_owned()
			},
		_ => "\tcld\n\trep stosb\t\t\t; write the value in eax/rax, ecx/rcx times, starting at edi/rdi\n".to_owned(),
	}
}

/// `write`: write the accumulator once at the current address.
pub(super) fn write_data(
	st: &Statement,
	state: &ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	match config.platform_bits {
		PlatformBits::Bits16 =>
			if state.loop_step == 2 {
				Ok("\tstosw\t\t\t; write the value in ax, starting at es:di\n".to_owned())
			} else {
				Ok("\tstosb\t\t\t; write the value in al, starting at es:di\n".to_owned())
			},
		_ => Err(CompileError::UnimplementedKeyword {
			keyword:  "write".to_owned(),
			bits:     config.platform_bits.bits(),
			src:      src.clone(),
			location: src.line_span(st.line()),
		}),
	}
}

/// `address v`: set the destination address for `write`/`loopwrite`. 16-bit targets take a
/// segment:offset pair (the segment register can not be moved into directly).
pub(super) fn set_address(
	st: &Statement,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	let mut asmcode = String::new();
	match config.platform_bits {
		PlatformBits::Bits16 => {
			let segment_offset = st[1].value.trim_start_matches('[').trim_end_matches(']');
			let Some((segment, offset)) = segment_offset.split_once(':') else {
				return Err(CompileError::InvalidAddress {
					value:    st[1].value.to_string(),
					src:      src.clone(),
					location: src.line_span(st[1].line),
				});
			};
			log::debug!("Found segment {segment} and offset {offset}");
			asmcode += &format!("\tpush {segment}\t\t\t; can not mov directly into es\n");
			asmcode += &format!("\tpop es\t\t\t\t; segment = {segment}\n");
			if offset == "0" {
				asmcode += &format!("\txor di, di\t\t\t; offset = {offset}\n");
			} else {
				asmcode += &format!("\tmov di, {offset}\t\t\t; di = {offset}\n");
			}
		},
		PlatformBits::Bits32 => {
			asmcode += &format!("\tmov edi, {}\t\t\t; set address/offset\n", st[1].value);
		},
		PlatformBits::Bits64 => {
			asmcode += &format!("\tmov rdi, {}\t\t\t; set address/offset\n", st[1].value);
		},
	}
	Ok(asmcode)
}

/// `bootable`: emit the multiboot header and bootstrap stack template, and flag the compilation
/// as a bootable kernel.
pub(super) fn bootable_kernel(state: &mut ProgramState) -> String {
	state.bootable_kernel = true;
	r"
; Thanks to http://wiki.osdev.org/Bare_Bones_with_NASM

; Declare constants used for creating a multiboot header.
MBALIGN     equ  1<<0                   ; align loaded modules on page boundaries
MEMINFO     equ  1<<1                   ; provide memory map
FLAGS       equ  MBALIGN | MEMINFO      ; this is the Multiboot 'flag' field
MAGIC       equ  0x1BADB002             ; 'magic number' lets bootloader find the header
CHECKSUM    equ -(MAGIC + FLAGS)        ; checksum of above, to prove we are multiboot

; Declare a header as in the Multiboot Standard. We put this into a special
; section so we can force the header to be in the start of the final program.
; You don't need to understand all these details as it is just magic values that
; is documented in the multiboot standard. The bootloader will search for this
; magic sequence and recognize us as a multiboot kernel.
section .multiboot
align 4
	dd MAGIC
	dd FLAGS
	dd CHECKSUM

; Currently the stack pointer register (esp) points at anything and using it may
; cause massive harm. Instead, we'll provide our own stack. We will allocate
; room for a small temporary stack by creating a symbol at the bottom of it,
; then allocating 16384 bytes for it, and finally creating a symbol at the top.
section .bootstrap_stack
align 4
stack_bottom:
times 16384 db 0
stack_top:

section .text
"
	.to_owned()
}

/// `extern name`: declare an external symbol.
pub(super) fn extern_declaration(
	st: &Statement,
	state: &mut ProgramState,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	if st[1].kind != TokenKind::ValidName {
		return Err(CompileError::InvalidName {
			name:     st[1].value.to_string(),
			role:     "external symbol",
			src:      src.clone(),
			location: src.line_span(st[1].line),
		});
	}
	let name = st[1].value.clone();
	state.define(&name, src, st[1].line)?;
	Ok(format!("extern {name}\t\t\t; external symbol\n"))
}

/// `asm <bits> ...`: raw assembly passthrough, emitted only when the statement's bit size matches
/// the target platform and silently dropped otherwise. The escape hatch for hand-written
/// platform-specific instructions.
#[allow(clippy::too_many_lines)]
pub(super) fn asm_passthrough(
	st: &Statement,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	let target_bits: u8 = st[1].value.parse().map_err(|_| CompileError::InvalidAsmBits {
		value:    st[1].value.to_string(),
		src:      src.clone(),
		location: src.line_span(st[1].line),
	})?;
	if config.platform_bits.bits() != target_bits {
		// Not for this platform, skip.
		return Ok(String::new());
	}
	match st.len() {
		7 => {
			let (mut comma1, mut comma2) = (" ", ", ");
			if st[4].kind == TokenKind::Qualifier {
				comma1 = ", ";
				comma2 = " ";
			}
			if st[5].value.contains('+') || st[5].value.contains('-') {
				Ok(format!(
					"\t{} {} {} {} {}\t\t\t; asm with address calculation\n",
					st[2].value, st[3].value, st[4].value, st[5].value, st[6].value
				))
			} else if st[2].value.starts_with('i') {
				comma1 = ", ";
				Ok(format!(
					"\t{} {}{comma1}{}{comma2}{} {}\t\t\t; asm with integer maths\n",
					st[2].value, st[3].value, st[4].value, st[5].value, st[6].value
				))
			} else {
				Ok(format!(
					"\t{} {}{comma1}{}{comma2}{} {}\t\t\t; asm with floating point instructions\n",
					st[2].value, st[3].value, st[4].value, st[5].value, st[6].value
				))
			}
		},
		6 => {
			let (mut comma1, mut comma2) = (" ", ", ");
			if st[4].kind == TokenKind::Qualifier {
				comma1 = ", ";
				comma2 = " ";
			}
			if st[5].value.contains('+') || st[5].value.contains('-') {
				Ok(format!(
					"\t{} {}{comma1}{}{comma2}{}\t\t\t; asm with address calculation\n",
					st[2].value, st[3].value, st[4].value, st[5].value
				))
			} else if st[2].value.starts_with('i') {
				comma1 = ", ";
				Ok(format!(
					"\t{} {}{comma1}{}{comma2}{}\t\t\t; asm with integer maths\n",
					st[2].value, st[3].value, st[4].value, st[5].value
				))
			} else {
				Ok(format!(
					"\t{} {}{comma1}{}{comma2}{}\t\t\t; asm with floating point instructions\n",
					st[2].value, st[3].value, st[4].value, st[5].value
				))
			}
		},
		5 => {
			let comma2 = if st[3].kind == TokenKind::Qualifier { " " } else { ", " };
			if st[4].value.contains('+') || st[4].value.contains('-') {
				Ok(format!(
					"\t{} {}{comma2}{}\t\t\t; asm with address calculation\n",
					st[2].value, st[3].value, st[4].value
				))
			} else if st[3].value == "st" {
				Ok(format!("\t{} {} ({})\t\t\t; asm\n", st[2].value, st[3].value, st[4].value))
			} else {
				Ok(format!("\t{} {}{comma2}{}\t\t\t; asm\n", st[2].value, st[3].value, st[4].value))
			}
		},
		4 => Ok(format!("\t{} {}\t\t\t; asm\n", st[2].value, st[3].value)),
		3 =>
			if st[2].value.contains(':') {
				Ok(format!("\t{}\t\t\t; asm label\n", st[2].value))
			} else {
				Ok(format!("\t{}\t\t\t; asm\n", st[2].value))
			},
		length => Err(CompileError::InvalidAsmExpression {
			length:   length - 2,
			src:      src.clone(),
			location: src.line_span(st.line()),
		}),
	}
}
