//! Interrupt and system call generation.

use std::sync::Arc;

use crate::error::{CompileError, SourceFile};
use crate::parser::token::{Statement, Token, TokenKind};
use crate::program::ProgramState;
use crate::registers::{is_16_bit, is_32_bit, is_64_bit, upgrade};
use crate::target::{PlatformBits, TargetConfig};

/// Generate an `int <vec>, args...` or `syscall args...` invocation: bind each argument to the
/// platform's parameter register list, in reverse push order on BSD/macOS.
#[allow(clippy::too_many_lines)]
pub(super) fn syscall_or_interrupt(
	statement: &Statement,
	is_syscall: bool,
	state: &ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	let mut st: Vec<Token> = statement.0.clone();
	if !is_syscall && st.len() > 1 && st[1].kind != TokenKind::Value {
		st.remove(1);
	}
	if !is_syscall && st.len() < 2 {
		return Err(CompileError::InvalidInterruptNumber {
			value:    st[0].value.to_string(),
			src:      src.clone(),
			location: src.line_span(st[0].line),
		});
	}

	log::debug!("system call: {}", Statement(st.clone()));

	let mut asmcode = String::new();
	let mut precode = String::new();
	let mut postcode = String::new();

	// How many tokens to skip before reading arguments.
	let preskip: isize = if is_syscall { 1 } else { 2 };

	let length = isize::try_from(st.len()).unwrap_or(isize::MAX);
	let (from_i, to_i, step_i): (isize, isize, isize) = if config.macos {
		// Arguments are pushed in the opposite order for BSD/OSX (32-bit).
		(length - 1, 1, -1)
	} else {
		(preskip, length, 1)
	};
	let first_i = from_i;
	let last_i = to_i - step_i;

	let mut i = from_i;
	while i != to_i {
		let token = &st[usize::try_from(i).unwrap_or_default()];
		let parameter_index = i - preskip;
		if parameter_index >= isize::try_from(config.interrupt_parameter_registers.len()).unwrap_or(isize::MAX) {
			return Err(CompileError::TooManyParameters {
				src:      src.clone(),
				location: src.line_span(token.line),
			});
		}
		let register = config.interrupt_parameter_registers[usize::try_from(parameter_index).unwrap_or_default()];
		let n = parameter_index;

		let comment = if (config.macos && i == last_i) || (!config.macos && i == first_i) {
			format!("function call: {}", token.value)
		} else if token.kind == TokenKind::Value {
			format!("parameter #{n} is {}", token.value)
		} else if let Some(name) = token.value.strip_prefix("_length_of_") {
			format!("parameter #{n} is len({name})")
		} else if token.value == "_" {
			// When _ is given, the value already in the corresponding register is used.
			format!("parameter #{n} is supposedly already set")
		} else if state.data_constants.iter().any(|constant| constant == &token.value) {
			format!("parameter #{n} is &{}", token.value)
		} else {
			// Already known not to be a register name; a stack pointer value here means a
			// chr-carried register must be spilled around the call.
			match config.platform_bits {
				PlatformBits::Bits64 if token.value == "rsp" => {
					let original = token.extra.clone().unwrap_or_default();
					let spilled = if is_64_bit(&original) {
						original.to_string()
					} else if is_32_bit(&original) {
						upgrade(&original)
					} else if is_16_bit(&original) {
						upgrade(&upgrade(&original))
					} else {
						return Err(CompileError::UnhandledRegister {
							register: original.to_string(),
							src:      src.clone(),
							location: src.line_span(token.line),
						});
					};
					precode += &format!("\tsub rsp, 8\t\t\t; make some space for storing {original} on the stack\n");
					precode +=
						&format!("\tmov QWORD [rsp], {spilled}\t\t; move {original} to a memory location on the stack\n");
					postcode += "\tadd rsp, 8\t\t\t; move the stack pointer back\n";
					format!("parameter #{n} is {}", token.value)
				},
				PlatformBits::Bits32 if token.value == "esp" => {
					let original = token.extra.clone().unwrap_or_default();
					let spilled = if is_32_bit(&original) {
						original.to_string()
					} else if is_16_bit(&original) {
						upgrade(&original)
					} else {
						return Err(CompileError::UnhandledRegister {
							register: original.to_string(),
							src:      src.clone(),
							location: src.line_span(token.line),
						});
					};
					precode += &format!("\tsub esp, 4\t\t\t; make some space for storing {original} on the stack\n");
					precode +=
						&format!("\tmov DWORD [esp], {spilled}\t\t; move {original} to a memory location on the stack\n");
					postcode += "\tadd esp, 4\t\t\t; move the stack pointer back\n";
					format!("parameter #{n} is {}", token.value)
				},
				PlatformBits::Bits16 => {
					let original = token.extra.clone().unwrap_or_default();
					precode += &format!("\tsub sp, 2\t\t\t; make some space for storing {original} on the stack\n");
					precode +=
						&format!("\tmov WORD [sp], {original}\t\t; move {original} to a memory location on the stack\n");
					postcode += "\tadd sp, 2\t\t\t; move the stack pointer back\n";
					format!("parameter #{n} is {}", token.value)
				},
				_ => format!("parameter #{n} is {}", token.value),
			}
		};

		let mut codeline = String::new();
		if token.value == "_" {
			// Skip parameters that are already set.
			codeline += "\t\t";
		} else if token.value == "0" {
			codeline += &format!("\txor {register}, {register}");
		} else if config.macos {
			if i == last_i {
				codeline += &format!("\tmov {register}, {}", token.value);
			} else {
				codeline += &format!("\tpush dword {}", token.value);
			}
		} else {
			codeline += &format!("\tmov {register}, {}", token.value);
		}

		// Tab formatting keeps the comments in columns for typical line lengths.
		if codeline.len() >= 16 {
			asmcode += &format!("{codeline}\t\t; {comment}\n");
		} else {
			asmcode += &format!("{codeline}\t\t\t; {comment}\n");
		}

		i += step_i;
	}

	if is_syscall {
		precode = format!("\t;--- system call ---\n{precode}");
	} else {
		let mut comment = String::from("\t;--- call interrupt ");
		if !st[1].value.starts_with("0x") {
			// Interrupts are always called by hex.
			comment += "0x";
		}
		comment += &format!("{} ---\n", st[1].value);
		precode = comment + &precode;
	}

	if is_syscall || st[1].kind == TokenKind::Value {
		if config.macos {
			asmcode += "\tsub esp, 4\t\t\t; BSD system call preparation\n";
		}
		if is_syscall {
			asmcode += "\tsyscall\t\t\t\t; perform the call\n";
		} else {
			asmcode += "\tint ";
			if !st[1].value.starts_with("0x") {
				log::info!("Note: Adding 0x in front of interrupt {}", st[1].value);
				asmcode += "0x";
			}
			asmcode += &format!("{}\t\t\t; perform the call\n", st[1].value);
		}
		if config.macos {
			let push_count = st.len() - 2;
			let displacement = push_count * 4; // 4 bytes per push
			asmcode += &format!("\tadd esp, {displacement}\t\t\t; BSD system call cleanup\n");
		}
		return Ok(precode + &asmcode + &postcode);
	}
	Err(CompileError::InvalidInterruptNumber {
		value:    st[1].value.to_string(),
		src:      src.clone(),
		location: src.line_span(st[1].line),
	})
}
