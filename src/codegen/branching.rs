//! Functions, returns, loops and conditional blocks.

use std::sync::Arc;

use flexstr::{SharedStr, shared_str};

use crate::error::{CompileError, SourceFile};
use crate::parser::language::Keyword;
use crate::parser::token::{Statement, Token, TokenKind};
use crate::program::{ENDLESS_LOOP_PREFIX, ProgramState, RAWLOOP_PREFIX};
use crate::target::{PlatformBits, TargetConfig};

/// `fun name`: emit the function label (exported to the linker on non-16-bit targets) and the
/// stack frame setup, which the entry point function skips.
pub(super) fn function_declaration(
	st: &Statement,
	state: &mut ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	let name = st[1].value.clone();
	if !state.in_function.is_empty() {
		return Err(CompileError::NestedFunction {
			function: name.to_string(),
			existing: state.in_function.to_string(),
			src:      src.clone(),
			location: src.line_span(st.line()),
		});
	}
	state.define(&name, src, st[1].line)?;
	state.in_function = name.clone();

	let mut asmcode = format!(";--- function {name} ---\n");
	if config.platform_bits != PlatformBits::Bits16 {
		asmcode += &format!("global {name}\t\t\t; make label available to the linker\n");
	}
	asmcode += &format!("{name}:\t\t\t\t; name of the function\n\n");
	if name == "main" || name == config.linker_start_function {
		// No stack frame in the entry point function.
		return Ok(asmcode);
	}
	match config.platform_bits {
		PlatformBits::Bits64 => {
			asmcode += "\t;--- setup stack frame ---\n";
			asmcode += "\tpush rbp\t\t\t; save old base pointer\n";
			asmcode += "\tmov rbp, rsp\t\t\t; use stack pointer as new base pointer\n";
		},
		PlatformBits::Bits32 => {
			asmcode += "\t;--- setup stack frame ---\n";
			asmcode += "\tpush ebp\t\t\t; save old base pointer\n";
			asmcode += "\tmov ebp, esp\t\t\t; use stack pointer as new base pointer\n";
		},
		PlatformBits::Bits16 => {},
	}
	Ok(asmcode)
}

/// `call name`: a direct call to a predeclared name.
pub(super) fn call_function(
	st: &Statement,
	state: &ProgramState,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	if st[1].kind != TokenKind::ValidName {
		return Err(CompileError::InvalidCall {
			name:     st[1].value.to_string(),
			src:      src.clone(),
			location: src.line_span(st[1].line),
		});
	}
	let name = &st[1].value;
	if !state.is_defined(name) {
		return Err(CompileError::UndefinedName {
			name:     name.to_string(),
			src:      src.clone(),
			location: src.line_span(st[1].line),
		});
	}
	Ok(format!("\t;--- call the \"{name}\" function ---\n\tcall {name}\n"))
}

/// A bare predeclared name is an implicit function call.
pub(super) fn implicit_call(
	st: &Statement,
	state: &ProgramState,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	if state.is_defined(&st[0].value) {
		let call = Token::new(TokenKind::Keyword(Keyword::Call), "call", st[0].line);
		let statement = Statement(vec![call, st[0].clone()]);
		return call_function(&statement, state, src);
	}
	Err(CompileError::UndefinedName {
		name:     st[0].value.to_string(),
		src:      src.clone(),
		location: src.line_span(st[0].line),
	})
}

/// `ret` and `exit [code]`: tear down the stack frame when leaving a non-entry function, then
/// either return or emit the platform's process termination sequence.
#[allow(clippy::too_many_lines)]
pub(super) fn return_or_exit(st: &Statement, state: &mut ProgramState, config: &TargetConfig) -> String {
	let is_ret = st[0].is_keyword(Keyword::Ret);
	let mut asmcode = String::new();

	if is_ret {
		if state.in_function == "main" || state.in_function == config.linker_start_function {
			// The entry point has no stack frame to take down.
		} else {
			match config.platform_bits {
				PlatformBits::Bits64 => {
					asmcode += "\t;--- takedown stack frame ---\n";
					asmcode += "\tmov rsp, rbp\t\t\t; use base pointer as new stack pointer\n";
					asmcode += "\tpop rbp\t\t\t\t; get the old base pointer\n\n";
				},
				PlatformBits::Bits32 => {
					asmcode += "\t;--- takedown stack frame ---\n";
					asmcode += "\tmov esp, ebp\t\t\t; use base pointer as new stack pointer\n";
					asmcode += "\tpop ebp\t\t\t\t; get the old base pointer\n\n";
				},
				PlatformBits::Bits16 => {},
			}
		}
	}

	if state.in_function.is_empty() {
		if is_ret {
			asmcode += "\t;--- return ---\n";
		} else {
			asmcode += "\t;--- exit program ---\n";
		}
	} else if !state.bootable_kernel && !state.endless && state.in_function == "main" {
		asmcode += &format!("\n\t;--- return from \"{}\" ---\n", state.in_function);
	}

	if !is_ret || state.in_function == "main" || state.in_function == config.linker_start_function {
		// Not returning from the entry point but exiting the process properly.
		let exit_code = if st.len() == 2 && matches!(st[1].kind, TokenKind::Value | TokenKind::Register) {
			st[1].value.to_string()
		} else {
			"0".to_owned()
		};
		if state.bootable_kernel {
			// For bootable kernels, main does not return; there is nowhere to go.
			log::warn!(
				"Bootable kernels have nowhere to return after the main function. You might want to use the \
				 \"halt\" builtin at the end of the main function."
			);
		} else {
			match config.platform_bits {
				PlatformBits::Bits64 => {
					asmcode += "\tmov rax, 60\t\t\t; function call: 60\n\t";
					if exit_code == "0" {
						asmcode += "xor rdi, rdi";
					} else {
						asmcode += &format!("mov rdi, {exit_code}");
					}
					asmcode += &format!("\t\t\t; return code {exit_code}\n");
					asmcode += "\tsyscall\t\t\t\t; exit program\n";
				},
				PlatformBits::Bits32 => {
					if config.macos {
						asmcode += &format!("\tpush dword {exit_code}\t\t\t; exit code {exit_code}\n");
						asmcode += "\tsub esp, 4\t\t\t; the BSD way, push then subtract before calling\n";
					}
					asmcode += "\tmov eax, 1\t\t\t; function call: 1\n";
					if !config.macos {
						asmcode += "\t";
						if exit_code == "0" {
							asmcode += "xor ebx, ebx";
						} else {
							asmcode += &format!("mov ebx, {exit_code}");
						}
						asmcode += &format!("\t\t\t; exit code {exit_code}\n");
					}
					asmcode += "\tint 0x80\t\t\t; exit program\n";
				},
				PlatformBits::Bits16 =>
					if is_ret {
						if state.endless {
							asmcode += "\t; endless loop, there is no return\n";
						} else {
							asmcode += "\tret\t\t\t; exit program\n";
						}
					} else {
						// Not building a kernel, so the DOS interrupt makes sense.
						asmcode += "\tmov ah, 0x4c\t\t\t; function 4C\n";
						if exit_code == "0" {
							asmcode += &format!("\txor al, al\t\t\t; exit code {exit_code}\n");
						} else {
							asmcode += &format!("\tmov al, {exit_code}\t\t\t; exit code {exit_code}\n");
						}
						asmcode += "\tint 0x21\t\t\t; exit program\n";
					},
			}
		}
	} else {
		log::debug!("function {}", state.in_function);
		// The return value register is left untouched when no value is given; the value from the
		// most recent call passes through.
		asmcode += "\tret\t\t\t\t; Return\n";
	}

	if !state.in_function.is_empty() {
		state.in_function = SharedStr::default();
		// A function ended with "exit" tolerates one following stray "end".
		if !is_ret {
			state.surprise_ending_with_exit = true;
		}
	}
	asmcode
}

/// A comparison statement opens an if-block: compare, then jump past the block when the inverted
/// condition holds.
pub(super) fn open_if_block(
	st: &Statement,
	state: &mut ProgramState,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	if !state.in_if_block.is_empty() {
		return Err(CompileError::NestedIfBlock { src: src.clone(), location: src.line_span(st.line()) });
	}
	state.in_if_block = state.new_if_label();
	let label = &state.in_if_block;

	let mut asmcode = format!("\t;--- {label} ---\n");
	asmcode += &format!("\tcmp {}, {}\t\t\t; compare\n", st[0].value, st[2].value);
	// Jump out when the condition does NOT hold.
	asmcode += "\t";
	asmcode += match st[1].value.as_str() {
		"==" => "jne",
		"!=" => "je",
		">" => "jle",
		"<" => "jge",
		"<=" => "jg",
		_ => "jl", // >=
	};
	asmcode += &format!(" {label}_end\t\t\t; break\n");
	Ok(asmcode)
}

/// `rawloop [n]` and `loop [n]`: allocate a loop label, optionally initialize and save the
/// counter register.
pub(super) fn loop_start(
	st: &Statement,
	state: &mut ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	if !state.in_loop.is_empty() {
		return Err(CompileError::NestedLoop { src: src.clone(), location: src.line_span(st.line()) });
	}
	let rawloop = st[0].is_keyword(Keyword::Rawloop);
	let has_counter = st.len() == 2;
	let endless_loop = !rawloop && !has_counter;

	let label: SharedStr = if rawloop {
		format!("{RAWLOOP_PREFIX}{}", state.new_loop_label()).into()
	} else if endless_loop {
		format!("{ENDLESS_LOOP_PREFIX}{}", state.new_loop_label()).into()
	} else {
		state.new_loop_label()
	};
	state.in_loop = label.clone();

	let mut asmcode = String::new();
	if has_counter {
		asmcode += &format!("\t;--- loop {} times ---\n", st[1].value);
		asmcode += &format!("\tmov {}, {}\t\t\t; initialize loop counter\n", config.counter_register(), st[1].value);
	} else if endless_loop {
		asmcode += "\t;--- endless loop ---\n";
	} else {
		asmcode += "\t;--- loop ---\n";
	}
	asmcode += &format!("{label}:\t\t\t\t\t; start of loop {label}\n");

	// Raw and endless loops do not maintain the counter around the body.
	if !rawloop && !endless_loop {
		asmcode += &format!("\tpush {}\t\t\t; save the counter\n", config.counter_register());
	}
	Ok(asmcode)
}

fn loop_kind(label: &str) -> (bool, bool) {
	(label.starts_with(RAWLOOP_PREFIX), label.starts_with(ENDLESS_LOOP_PREFIX))
}

fn condition_jump(comparison: &str) -> &'static str {
	match comparison {
		"==" => "je",
		"!=" => "jne",
		">" => "jg",
		"<" => "jl",
		"<=" => "jle",
		_ => "jge", // >=
	}
}

/// `break [cond]`: restore the counter (unless raw/endless) and jump to the loop's end label,
/// unconditionally or on the given comparison.
pub(super) fn break_loop(
	st: &Statement,
	state: &ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
	conditional: bool,
) -> Result<String, CompileError> {
	if state.in_loop.is_empty() {
		return Err(CompileError::NotInLoop {
			operation: "break out of",
			src:       src.clone(),
			location:  src.line_span(st.line()),
		});
	}
	let (rawloop, endless) = loop_kind(&state.in_loop);
	let mut asmcode = String::new();
	if !rawloop && !endless {
		asmcode += &format!("\tpop {}\t\t\t\t; restore counter\n", config.counter_register());
	}
	if conditional {
		asmcode += &format!("\tcmp {}, {}\t\t\t; compare\n", st[1].value, st[3].value);
		asmcode += &format!("\t{} {}_end\t\t\t; break\n", condition_jump(&st[2].value), state.in_loop);
	} else {
		asmcode += &format!("\tjmp {}_end\t\t\t; break\n", state.in_loop);
	}
	Ok(asmcode)
}

/// `continue [cond]`: restore the counter (unless raw/endless), decrement it, and jump back to
/// the top of the loop.
pub(super) fn continue_loop(
	st: &Statement,
	state: &ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
	conditional: bool,
) -> Result<String, CompileError> {
	if state.in_loop.is_empty() {
		return Err(CompileError::NotInLoop {
			operation: "continue to the top of",
			src:       src.clone(),
			location:  src.line_span(st.line()),
		});
	}
	let (rawloop, endless) = loop_kind(&state.in_loop);
	let counter = config.counter_register();
	let mut asmcode = String::new();
	if !rawloop && !endless {
		asmcode += &format!("\tpop {counter}\t\t\t\t; restore counter\n");
	}
	if conditional {
		// "loop" can only jump 127 bytes; dec and jnz reach further.
		if !endless {
			asmcode += &format!("\tdec {counter}\t\t\t\t; decrease counter\n");
			asmcode += &format!("\tjz {}_end\t\t\t; jump out if the loop is done\n", state.in_loop);
		}
		asmcode += &format!("\tcmp {}, {}\t\t\t; compare\n", st[1].value, st[3].value);
		asmcode += &format!("\t{} {}\t\t\t; continue\n", condition_jump(&st[2].value), state.in_loop);
	} else if endless {
		asmcode += &format!("\tjmp {}\t\t\t; continue\n", state.in_loop);
	} else {
		asmcode += &format!("\tdec {counter}\t\t\t\t; decrease counter\n");
		asmcode += &format!("\tjnz {}\t\t\t; continue if not zero\n", state.in_loop);
		asmcode += &format!("\tjz {}_end\t\t\t; jump out if the loop is done\n", state.in_loop);
	}
	Ok(asmcode)
}

/// `end`: close the innermost open if-block or loop, or return from the current function. A stray
/// `end` is tolerated only right after an early `exit` or an endless loop.
pub(super) fn end_block(
	st: &Statement,
	state: &mut ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	if !state.in_if_block.is_empty() {
		let label = state.in_if_block.clone();
		state.in_if_block = SharedStr::default();
		return Ok(format!("{label}_end:\t\t\t\t; end of if block {label}\n"));
	}
	if !state.in_loop.is_empty() {
		let label = state.in_loop.clone();
		let (rawloop, endless) = loop_kind(&label);
		let counter = config.counter_register();
		let mut asmcode = String::new();
		if !rawloop && !endless {
			asmcode += &format!("\tpop {counter}\t\t\t\t; restore counter\n");
		}
		if endless {
			asmcode += &format!("\tjmp {label}\t\t\t\t; loop forever\n");
			state.endless = true;
		} else {
			asmcode += &format!("\tdec {counter}\t\t\t\t; decrease counter\n");
			asmcode += &format!("\tjnz {label}\t\t\t\t; loop until {counter} is zero\n");
		}
		asmcode += &format!("{label}_end:\t\t\t\t; end of loop {label}\n");
		asmcode += &format!("\t;--- end of loop {label} ---\n");
		state.in_loop = SharedStr::default();
		return Ok(asmcode);
	}
	if !state.in_function.is_empty() {
		// "end" inside a function is an implicit return.
		let ret = Token::new(TokenKind::Keyword(Keyword::Ret), shared_str!("ret"), st.line());
		let statement = Statement(vec![ret]);
		return Ok(return_or_exit(&statement, state, config));
	}
	if state.surprise_ending_with_exit || state.endless {
		// The block was legitimately terminated early; ignore this "end".
		state.surprise_ending_with_exit = false;
		return Ok(String::new());
	}
	Err(CompileError::StrayEnd { src: src.clone(), location: src.line_span(st.line()) })
}
