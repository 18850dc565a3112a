//! Whole-program assembly.
//!
//! Walks the token stream statement by statement, routes generated text into the constants, bss
//! and code sections, and synthesizes the pieces a runnable program needs but the source did not
//! spell out: an `extern main` for inline C mains, a final `exit`, and the entry point symbol.

use std::sync::Arc;

use crate::codegen::generate;
use crate::error::{CompileError, SourceFile};
use crate::inline_c::extract_inline_c;
use crate::parser::language::{Builtin, Keyword};
use crate::parser::lexer::{filter_tokens, split_statements, tokenize};
use crate::parser::token::{Token, TokenKind};
use crate::program::ProgramState;
use crate::target::{PlatformBits, TargetConfig};

/// The output of a whole-program compilation.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CompiledProgram {
	/// The generated assembly text.
	pub assembly: String,
	/// C code extracted from inline C regions, empty if there were none.
	pub inline_c: String,
}

/// Generate assembly for a token stream: the data section constants and the code (with the bss
/// section appended), in source order.
/// # Errors
/// The first failing statement aborts the whole compilation; no partial output is returned.
pub fn tokens_to_assembly(
	tokens: &[Token],
	state: &mut ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<(String, String), CompileError> {
	let mut constants = String::new();
	let mut asmcode = String::new();
	let mut bsscode = String::new();
	for statement in split_statements(tokens) {
		let first = statement[0].clone();
		let line = statement.line();
		let asmline = generate(statement, state, config, src)?;
		if first.is_keyword(Keyword::Const) {
			if asmline.contains(':') {
				log::debug!("CONSTANT: \"{}\"", asmline.split(':').next().unwrap_or_default());
			} else {
				return Err(CompileError::InvalidConstantDeclaration {
					src:      src.clone(),
					location: src.line_span(line),
				});
			}
			constants += &asmline;
			constants.push('\n');
		} else if first.is_keyword(Keyword::Var) {
			// Variables are gathered for the .bss section.
			bsscode += &asmline;
			bsscode.push('\n');
		} else {
			asmcode += &asmline;
			asmcode.push('\n');
		}
	}
	if !bsscode.is_empty() {
		asmcode += &format!("\nsection .bss\n{bsscode}");
	}
	Ok((constants.trim().to_owned(), asmcode))
}

/// Add `extern main` at the top if a line starts with `void main` or `int main` but no line
/// starts with `extern main`.
#[must_use]
pub fn add_extern_main_if_missing(bts_code: &str) -> String {
	let mut found_main = false;
	let mut found_extern = false;
	for line in bts_code.split('\n') {
		let trimmed = line.trim();
		if trimmed.starts_with("void main") || trimmed.starts_with("int main") {
			found_main = true;
		} else if trimmed.starts_with("extern main") {
			found_extern = true;
		}
		if found_main && found_extern {
			break;
		}
	}
	if found_main && !found_extern {
		return format!("extern main\n{bts_code}");
	}
	bts_code.to_owned()
}

/// Append a synthetic `exit` statement unless the last meaningful keyword or builtin already
/// terminates the program.
#[must_use]
pub fn add_exit_token_if_missing(tokens: Vec<Token>) -> Vec<Token> {
	let filtered = filter_tokens(&tokens, |token| {
		matches!(token.kind, TokenKind::Keyword(_) | TokenKind::Builtin(_) | TokenKind::Value)
	});
	let last_token = match filtered.len() {
		0 => return tokens,
		1 => filtered[0].clone(),
		// An exit code value does not count; look at the token before it.
		_ =>
			if filtered[filtered.len() - 1].kind == TokenKind::Value {
				filtered[filtered.len() - 2].clone()
			} else {
				filtered[filtered.len() - 1].clone()
			},
	};

	if matches!(last_token.kind, TokenKind::Keyword(Keyword::Ret | Keyword::End | Keyword::Noret))
		|| matches!(last_token.kind, TokenKind::Builtin(Builtin::Exit | Builtin::Halt))
	{
		return tokens;
	}

	let line = tokens.last().map_or(0, |token| token.line);
	let mut new_tokens = tokens;
	new_tokens.push(Token::new(TokenKind::Builtin(Builtin::Exit), "exit", line));
	new_tokens.push(Token::new(TokenKind::Separator, ";", line));
	new_tokens
}

/// Guarantee the binary has the configured entry point symbol: call an external `main`, splice
/// the entry label before a local `main:`, or prepend it before all code.
/// # Errors
/// Only from generating the synthetic exit statement after calling an external `main`.
pub fn add_starting_point_if_missing(
	asmcode: String,
	state: &mut ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	let start = &config.linker_start_function;
	if asmcode.contains(&format!("extern {start}")) {
		log::info!("External starting point for linker, not adding one.");
		return Ok(asmcode);
	}
	if asmcode.contains(start.as_str()) {
		return Ok(asmcode);
	}
	log::info!("No {start} has been defined, creating one");
	let mut addstring = String::new();
	if config.platform_bits != PlatformBits::Bits16 {
		addstring += &format!("global {start}\t\t\t; make label available to the linker\n");
	}
	addstring += &format!("{start}:\t\t\t\t; starting point of the program\n");
	if asmcode.contains("extern main") {
		// An external main function; the starting point calls it and exits.
		let line = u32::try_from(asmcode.matches('\n').count() + 5).unwrap_or(u32::MAX);
		let exit_statement = crate::parser::token::Statement(vec![Token::new(
			TokenKind::Builtin(Builtin::Exit),
			"exit",
			line,
		)]);
		let exit_code = generate(exit_statement, state, config, src)?;
		return Ok(format!("{asmcode}\n{addstring}\n\tcall main\t\t; call the external main function\n\n{exit_code}"));
	}
	if asmcode.contains("\nmain:") {
		// A local main function serves as the starting point.
		return Ok(asmcode.replacen("\nmain:", &format!("\n{addstring}main:"), 1));
	}
	Ok(format!("{addstring}\n{asmcode}"))
}

/// Compile a whole source file into assembly text and extracted inline C.
///
/// `component` suppresses entry point synthesis, for translation units that only contribute an
/// object file.
/// # Errors
/// Any lexical, semantic or shape error aborts the compilation; no partial output is returned.
pub fn compile(
	source: &Arc<SourceFile>,
	config: &TargetConfig,
	component: bool,
) -> Result<CompiledProgram, CompileError> {
	if source.text.trim().is_empty() {
		return Err(CompileError::EmptyProgram { src: source.clone() });
	}

	let mut state = ProgramState::new();
	state.bootable_kernel = config.bootable_kernel;

	let mut asmdata = format!("; Generated with btsc {}\n\n", env!("CARGO_PKG_VERSION"));
	asmdata += &format!("bits {}\n", config.platform_bits.bits());

	// "bootable" as the very first statement changes the section layout below.
	let probe_tokens = tokenize(source, config)?;
	let bootable_first_token = probe_tokens.len() > 2
		&& probe_tokens[0].is_keyword(Keyword::Bootable)
		&& probe_tokens[1].kind == TokenKind::Separator;

	let bts_code = add_extern_main_if_missing(&source.text);
	let src = Arc::new(SourceFile { text: bts_code, name: source.name.clone() });
	let tokens = add_exit_token_if_missing(tokenize(&src, config)?);
	log::debug!("--- Done tokenizing ---");
	let (constants, asmcode) = tokens_to_assembly(&tokens, &mut state, config, &src)?;

	if !constants.is_empty() {
		asmdata += "section .data\n";
		asmdata += &constants;
		asmdata.push('\n');
	}
	if config.platform_bits == PlatformBits::Bits16 {
		asmdata += "org 0x100\n";
	}
	if !bootable_first_token {
		asmdata += "\nsection .text\n";
	}
	if config.platform_bits == PlatformBits::Bits16
		&& asmcode.matches("; name of the function").count() > 1
		&& asmcode.contains("\nmain:")
	{
		// Several function definitions precede main; jump over them.
		asmdata += &format!("jmp {}\n", config.linker_start_function);
	}
	if !asmcode.is_empty() {
		if component {
			asmdata += &asmcode;
			asmdata.push('\n');
		} else {
			asmdata += &add_starting_point_if_missing(asmcode, &mut state, config, &src)?;
			asmdata.push('\n');
		}
		if bootable_first_token {
			// The bootstrap stack from the multiboot template replaces whatever the loader left
			// in the stack pointer.
			let register =
				if config.platform_bits == PlatformBits::Bits64 { "rsp" } else { "esp" };
			asmdata = asmdata.replacen(
				"; starting point of the program\n",
				&format!(
					"; starting point of the program\n\tmov {register}, stack_top\t; set the {register} register \
					 to the top of the stack (special case for bootable kernels)\n"
				),
				1,
			);
		}
	}

	let inline_c = extract_inline_c(source.text.trim());
	Ok(CompiledProgram { assembly: asmdata, inline_c })
}

#[cfg(test)]
mod test {
	use super::*;

	fn compile_str(source: &str, bits: u8, macos: bool) -> Result<CompiledProgram, CompileError> {
		let config = TargetConfig::new(bits, macos, false).unwrap();
		compile(&SourceFile::from_source(source), &config, false)
	}

	#[test]
	fn constants_route_to_the_data_section() {
		let assembly = compile_str("const msg = \"hi\"\nfun main\nprint(msg)\nend", 64, false).unwrap().assembly;
		let data_position = assembly.find("section .data").unwrap();
		let text_position = assembly.find("section .text").unwrap();
		assert!(data_position < text_position);
		assert!(assembly[data_position .. text_position].contains("msg:\tdb \"hi\""));
	}

	#[test]
	fn variables_route_to_a_trailing_bss_section() {
		let assembly = compile_str("var buffer 64\nfun main\nexit\nend", 64, false).unwrap().assembly;
		let text_position = assembly.find("section .text").unwrap();
		let bss_position = assembly.find("section .bss").unwrap();
		assert!(text_position < bss_position);
		assert!(assembly[bss_position ..].contains("buffer: resb 64"));
	}

	#[test]
	fn exit_token_is_appended_when_missing() {
		let config = TargetConfig::new(64, false, false).unwrap();
		let src = SourceFile::from_source("fun main\nrax = 1");
		let tokens = tokenize(&src, &config).unwrap();
		let extended = add_exit_token_if_missing(tokens.clone());
		assert_eq!(extended.len(), tokens.len() + 2);
		assert!(extended[extended.len() - 2].is_builtin(Builtin::Exit));
		// With a terminating "end" nothing is appended.
		let src = SourceFile::from_source("fun main\nrax = 1\nend");
		let tokens = tokenize(&src, &config).unwrap();
		assert_eq!(add_exit_token_if_missing(tokens.clone()).len(), tokens.len());
	}

	#[test]
	fn exit_codes_do_not_hide_the_exit() {
		let config = TargetConfig::new(64, false, false).unwrap();
		let src = SourceFile::from_source("fun main\nexit 2");
		let tokens = tokenize(&src, &config).unwrap();
		assert_eq!(add_exit_token_if_missing(tokens.clone()).len(), tokens.len());
	}

	#[test]
	fn entry_point_is_synthesized_once() {
		let assembly = compile_str("fun main\nexit\nend", 64, false).unwrap().assembly;
		assert_eq!(assembly.matches("_start:").count(), 1);
		assert!(assembly.contains("global _start"));
		// The label is spliced directly before main.
		let start_position = assembly.find("_start:").unwrap();
		let main_position = assembly.find("\nmain:").unwrap();
		assert!(start_position < main_position);
	}

	#[test]
	fn external_main_gets_a_calling_entry_point() {
		let assembly = compile_str("extern main\nnoret", 64, false).unwrap().assembly;
		assert!(assembly.contains("call main"));
		assert!(assembly.contains("_start:"));
		assert!(assembly.contains("mov rax, 60"));
	}

	#[test]
	fn components_get_no_entry_point() {
		let config = TargetConfig::new(64, false, false).unwrap();
		let program = compile(&SourceFile::from_source("fun helper\nret"), &config, true).unwrap();
		assert!(!program.assembly.contains("_start"));
	}

	#[test]
	fn extern_main_is_added_for_c_mains() {
		let rewritten = add_extern_main_if_missing("void main() {\n}\n");
		assert!(rewritten.starts_with("extern main\n"));
		// Not twice.
		assert_eq!(add_extern_main_if_missing(&rewritten), rewritten);
	}

	#[test]
	fn macos_entry_symbol_is_main() {
		let assembly = compile_str("fun start\nexit\nend", 32, true).unwrap().assembly;
		assert!(assembly.contains("_main:"));
	}

	#[test]
	fn macos_arguments_push_in_reverse() {
		let source = "const msg = \"hi\"\nint(0x80, 4, 1, msg, len(msg))";
		let linux = compile_str(source, 32, false).unwrap().assembly;
		let macos = compile_str(source, 32, true).unwrap().assembly;
		// Linux binds parameter registers directly, in source order.
		assert!(linux.contains("mov ecx, msg"));
		assert!(!linux.contains("push dword"));
		// BSD/macOS pushes the arguments in the opposite order, with the length first.
		assert!(macos.contains("push dword msg"));
		let length_position = macos.find("push dword _length_of_msg").unwrap();
		let message_position = macos.find("push dword msg").unwrap();
		assert!(length_position < message_position);
		assert!(macos.contains("sub esp, 4"));
		assert!(macos.contains("add esp, 16"));
	}

	#[test]
	fn empty_programs_are_rejected() {
		assert!(matches!(compile_str("\n\n", 64, false), Err(CompileError::EmptyProgram { .. })));
	}

	#[test]
	fn first_error_stops_with_no_output() {
		let result = compile_str("const x = 1\nconst x = 2\nfun main\nexit\nend", 64, false);
		assert!(matches!(result, Err(CompileError::Redeclaration { .. })));
	}

	#[test]
	fn sixteen_bit_layout_has_org_and_no_global() {
		let assembly = compile_str("fun main\nexit\nend", 16, false).unwrap().assembly;
		assert!(assembly.contains("org 0x100"));
		assert!(assembly.contains("bits 16"));
		assert!(!assembly.contains("global"));
	}

	#[test]
	fn bootable_kernels_initialize_the_stack_pointer() {
		let source = "bootable\nfun main\nhalt\nend";
		let config = TargetConfig::new(32, false, false).unwrap();
		let assembly = compile(&SourceFile::from_source(source), &config, false).unwrap().assembly;
		assert!(assembly.contains("section .multiboot"));
		assert!(assembly.contains("mov esp, stack_top"));
		// The multiboot template brings its own .text section.
		assert!(!assembly.contains("\nsection .text\nsection"));
	}
}
