//! Per-statement code generation.
//!
//! A reduced statement is first classified into one [`Shape`], then the matching generation
//! routine maps it to a block of assembly text. Classification mirrors the priority order of the
//! generation rules, so a statement that could be read several ways always gets the same rule.

mod arithmetic;
mod branching;
mod data;
mod directive;
mod memory;
mod syscall;

use std::sync::Arc;

use crate::error::{CompileError, SourceFile};
use crate::parser::language::{Builtin, Keyword};
use crate::parser::token::{Statement, Token, TokenKind};
use crate::program::ProgramState;
use crate::reducer::reduce;
use crate::target::{PlatformBits, TargetConfig};

/// The operand width of the memory access keywords.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum MemoryWidth {
	/// `mem` and plain reads: the operand is used as-is.
	Plain,
	/// `membyte`/`readbyte`.
	Byte,
	/// `memword`/`readword`.
	Word,
	/// `memdouble`/`readdouble`.
	Double,
}

/// Every statement family the generator knows. A statement matching none of these is a fatal
/// "unfamiliar statement" error; there is no generic fallback.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Shape {
	Interrupt,
	Syscall,
	VariableDeclaration,
	ConstantDeclaration,
	BssCopy,
	BssAppend,
	Halt,
	Print16,
	ReturnOrExit,
	MemoryWrite(MemoryWidth),
	MemoryRead(MemoryWidth),
	IfOpen,
	ThreeToken,
	ReservedAssignment,
	RegisterFromReserved,
	ReservedFromReserved,
	AsmPassthrough,
	FunctionDeclaration,
	Call,
	Counter,
	LoopValue,
	Loopwrite,
	WriteData,
	LoopStart,
	Address,
	Bootable,
	Extern,
	ConditionalBreak,
	Break,
	ConditionalContinue,
	Continue,
	Endless,
	End,
	ImplicitCall,
	Noret,
}

fn is_operand(token: &Token) -> bool {
	matches!(token.kind, TokenKind::Value | TokenKind::ValidName | TokenKind::Register)
}

/// Classify a reduced statement. The order of the checks is part of the language contract.
#[allow(clippy::too_many_lines)]
fn classify(st: &Statement, config: &TargetConfig, src: &Arc<SourceFile>) -> Result<Shape, CompileError> {
	let first = &st[0];
	let length = st.len();

	if first.is_builtin(Builtin::Int) && length >= 2 {
		return Ok(Shape::Interrupt);
	}
	if first.is_builtin(Builtin::Syscall) {
		return Ok(Shape::Syscall);
	}
	if first.is_keyword(Keyword::Var) && length >= 3 {
		return Ok(Shape::VariableDeclaration);
	}
	if first.is_keyword(Keyword::Const) && length >= 4 {
		return Ok(Shape::ConstantDeclaration);
	}
	if length > 2 && first.kind == TokenKind::ValidName && st[1].kind == TokenKind::Assignment {
		return Ok(Shape::BssCopy);
	}
	if length > 2
		&& st[1].kind == TokenKind::Addition
		&& first.kind == TokenKind::ValidName
		&& st[2].kind == TokenKind::ValidName
	{
		return Ok(Shape::BssAppend);
	}
	if first.is_builtin(Builtin::Halt) {
		return Ok(Shape::Halt);
	}
	if config.platform_bits == PlatformBits::Bits16
		&& first.is_builtin(Builtin::Print)
		&& length >= 2
		&& st[1].kind == TokenKind::ValidName
	{
		return Ok(Shape::Print16);
	}
	if first.is_keyword(Keyword::Ret) || first.is_builtin(Builtin::Exit) {
		return Ok(Shape::ReturnOrExit);
	}
	for (keyword, width) in [
		(Keyword::Mem, MemoryWidth::Plain),
		(Keyword::Membyte, MemoryWidth::Byte),
		(Keyword::Memword, MemoryWidth::Word),
		(Keyword::Memdouble, MemoryWidth::Double),
	] {
		if first.is_keyword(keyword)
			&& length >= 4
			&& is_operand(&st[1])
			&& st[2].kind == TokenKind::Assignment
			&& is_operand(&st[3])
		{
			return Ok(Shape::MemoryWrite(width));
		}
	}
	for (keyword, width) in [
		(Keyword::Mem, MemoryWidth::Plain),
		(Keyword::Readbyte, MemoryWidth::Byte),
		(Keyword::Readword, MemoryWidth::Word),
		(Keyword::Readdouble, MemoryWidth::Double),
	] {
		if first.kind == TokenKind::Register
			&& length >= 4
			&& st[1].kind == TokenKind::Assignment
			&& st[2].is_keyword(keyword)
			&& is_operand(&st[3])
		{
			return Ok(Shape::MemoryRead(width));
		}
	}
	if length == 3
		&& (first.kind == TokenKind::Register
			|| first.kind == TokenKind::Disregard
			|| first.value == "stack"
			|| st[2].value == "stack")
	{
		if st[1].kind == TokenKind::Comparison {
			return Ok(Shape::IfOpen);
		}
		return Ok(Shape::ThreeToken);
	}
	if length == 4
		&& first.kind == TokenKind::Reserved
		&& st[1].kind == TokenKind::Value
		&& st[2].kind == TokenKind::Assignment
		&& is_operand(&st[3])
	{
		return Ok(Shape::ReservedAssignment);
	}
	if length == 4
		&& first.kind == TokenKind::Register
		&& st[1].kind == TokenKind::Assignment
		&& st[2].kind == TokenKind::Reserved
		&& st[3].kind == TokenKind::Value
	{
		return Ok(Shape::RegisterFromReserved);
	}
	if length == 5
		&& first.kind == TokenKind::Reserved
		&& st[1].kind == TokenKind::Value
		&& st[2].kind == TokenKind::Assignment
		&& st[3].kind == TokenKind::Reserved
		&& st[4].kind == TokenKind::Value
	{
		return Ok(Shape::ReservedFromReserved);
	}
	if length >= 2 && first.is_keyword(Keyword::Asm) && st[1].kind == TokenKind::Value {
		return Ok(Shape::AsmPassthrough);
	}
	if length >= 2 && first.is_keyword(Keyword::Fun) && st[1].kind == TokenKind::ValidName {
		return Ok(Shape::FunctionDeclaration);
	}
	if first.is_keyword(Keyword::Call) && length == 2 {
		return Ok(Shape::Call);
	}
	if first.is_keyword(Keyword::Counter) && length == 2 {
		return Ok(Shape::Counter);
	}
	if first.is_keyword(Keyword::Value) && length == 2 {
		return Ok(Shape::LoopValue);
	}
	if first.is_keyword(Keyword::Loopwrite) && length == 1 {
		return Ok(Shape::Loopwrite);
	}
	if first.is_keyword(Keyword::Write) && length == 1 {
		return Ok(Shape::WriteData);
	}
	if (first.is_keyword(Keyword::Rawloop) || first.is_keyword(Keyword::Loop)) && (length == 1 || length == 2) {
		return Ok(Shape::LoopStart);
	}
	if first.is_keyword(Keyword::Address) && length == 2 {
		return Ok(Shape::Address);
	}
	if first.is_keyword(Keyword::Bootable) && length == 1 {
		return Ok(Shape::Bootable);
	}
	if first.is_keyword(Keyword::Extern) && length == 2 {
		return Ok(Shape::Extern);
	}
	if first.is_keyword(Keyword::Break) && length == 4 && st[2].kind == TokenKind::Comparison {
		return Ok(Shape::ConditionalBreak);
	}
	if first.is_keyword(Keyword::Break) && length == 1 {
		return Ok(Shape::Break);
	}
	if first.is_keyword(Keyword::Continue) && length == 4 && st[2].kind == TokenKind::Comparison {
		return Ok(Shape::ConditionalContinue);
	}
	if first.is_keyword(Keyword::Continue) && length == 1 {
		return Ok(Shape::Continue);
	}
	if first.is_keyword(Keyword::Endless) && length == 1 {
		return Ok(Shape::Endless);
	}
	if first.is_keyword(Keyword::End) && length == 1 {
		return Ok(Shape::End);
	}
	if first.kind == TokenKind::ValidName && length == 1 {
		return Ok(Shape::ImplicitCall);
	}
	if first.is_keyword(Keyword::Noret) {
		return Ok(Shape::Noret);
	}
	if first.is_keyword(Keyword::Const) {
		// A constant declaration too short to carry a value.
		return Err(CompileError::InvalidConstantDeclaration {
			src:      src.clone(),
			location: src.line_span(first.line),
		});
	}
	if let TokenKind::Builtin(builtin) = first.kind {
		return Err(CompileError::UnhandledBuiltin {
			builtin:  builtin.to_string(),
			src:      src.clone(),
			location: src.line_span(first.line),
		});
	}
	if let TokenKind::Keyword(keyword) = first.kind {
		return Err(CompileError::UnhandledKeyword {
			keyword:  keyword.to_string(),
			src:      src.clone(),
			location: src.line_span(first.line),
		});
	}
	Err(CompileError::UnfamiliarStatement {
		statement: st.to_string(),
		src:       src.clone(),
		location:  src.line_span(first.line),
	})
}

/// Map one statement to its assembly text, reducing builtin calls to a fixed point first.
/// # Errors
/// Any statement matching no generation rule, and any semantic violation inside a rule, is fatal.
pub fn generate(
	statement: Statement,
	state: &mut ProgramState,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	let mut st = statement;
	// Reduction is re-entered on any length change, since a rewrite may expose further builtins.
	loop {
		let length = st.len();
		st = reduce(st, state, config, src)?;
		if st.len() == length {
			break;
		}
	}
	if st.is_empty() {
		return Ok(String::new());
	}

	match classify(&st, config, src)? {
		Shape::Interrupt => syscall::syscall_or_interrupt(&st, false, state, config, src),
		Shape::Syscall => syscall::syscall_or_interrupt(&st, true, state, config, src),
		Shape::VariableDeclaration => data::variable_declaration(&st, state, config, src),
		Shape::ConstantDeclaration => data::constant_declaration(&st, state, config, src),
		Shape::BssCopy => data::copy_into_variable(&st, state, config, src),
		Shape::BssAppend => Ok(data::append_to_variable(&st, config)),
		Shape::Halt => Ok(directive::halt()),
		Shape::Print16 => Ok(directive::print_16_bit(&st, state)),
		Shape::ReturnOrExit => Ok(branching::return_or_exit(&st, state, config)),
		Shape::MemoryWrite(width) => Ok(memory::memory_write(&st, width)),
		Shape::MemoryRead(width) => Ok(memory::memory_read(&st, width)),
		Shape::IfOpen => branching::open_if_block(&st, state, src),
		Shape::ThreeToken => arithmetic::three_token_expression(&st, config, src),
		Shape::ReservedAssignment => memory::reserved_assignment(&st, config, src),
		Shape::RegisterFromReserved => memory::register_from_reserved(&st, config, src),
		Shape::ReservedFromReserved => memory::reserved_from_reserved(&st, config, src),
		Shape::AsmPassthrough => directive::asm_passthrough(&st, config, src),
		Shape::FunctionDeclaration => branching::function_declaration(&st, state, config, src),
		Shape::Call => branching::call_function(&st, state, src),
		Shape::Counter => Ok(directive::set_counter(&st, config)),
		Shape::LoopValue => directive::set_value(&st, state, config, src),
		Shape::Loopwrite => Ok(directive::loop_write(state, config)),
		Shape::WriteData => directive::write_data(&st, state, config, src),
		Shape::LoopStart => branching::loop_start(&st, state, config, src),
		Shape::Address => directive::set_address(&st, config, src),
		Shape::Bootable => Ok(directive::bootable_kernel(state)),
		Shape::Extern => directive::extern_declaration(&st, state, src),
		Shape::ConditionalBreak => branching::break_loop(&st, state, config, src, true),
		Shape::Break => branching::break_loop(&st, state, config, src, false),
		Shape::ConditionalContinue => branching::continue_loop(&st, state, config, src, true),
		Shape::Continue => branching::continue_loop(&st, state, config, src, false),
		Shape::Endless => {
			state.endless = true;
			Ok("; there is no return\n".to_owned())
		},
		Shape::End => branching::end_block(&st, state, config, src),
		Shape::ImplicitCall => branching::implicit_call(&st, state, src),
		Shape::Noret => Ok("; end without a return\n".to_owned()),
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::parser::lexer::{split_statements, tokenize};

	fn generate_all(source: &str, bits: u8, state: &mut ProgramState) -> Result<String, CompileError> {
		let config = TargetConfig::new(bits, false, false).unwrap();
		let src = SourceFile::from_source(source);
		let tokens = tokenize(&src, &config).unwrap();
		let mut output = String::new();
		for statement in split_statements(&tokens) {
			output += &generate(statement, state, &config, &src)?;
			output.push('\n');
		}
		Ok(output)
	}

	fn generate_str(source: &str, bits: u8) -> String {
		generate_all(source, bits, &mut ProgramState::new()).unwrap()
	}

	#[test]
	fn zero_assignment_becomes_xor() {
		let asm = generate_str("eax = 0", 32);
		assert!(asm.contains("xor eax, eax"));
		assert!(!asm.contains("mov eax, 0"));
	}

	#[test]
	fn plain_assignment_is_mov() {
		assert!(generate_str("eax = 7", 32).contains("mov eax, 7"));
		assert!(generate_str("rax = rbx", 64).contains("mov rax, rbx"));
	}

	#[test]
	fn power_of_two_division_becomes_shift() {
		let asm = generate_str("eax /= 4", 32);
		assert!(asm.contains("shr eax, 2"));
		assert!(!asm.contains("div"));
	}

	#[test]
	fn general_division_saves_and_restores() {
		let asm = generate_str("eax /= 3", 32);
		assert!(asm.contains("push ecx"));
		assert!(asm.contains("xor edx, edx"));
		assert!(asm.contains("div ecx"));
		assert!(asm.contains("pop ecx"));
	}

	#[test]
	fn division_of_non_accumulator_goes_through_rax() {
		let asm = generate_str("rbx /= 3", 64);
		assert!(asm.contains("mov r9, rax"));
		assert!(asm.contains("mov rax, rbx"));
		assert!(asm.contains("div r8"));
		assert!(asm.contains("mov rbx, rax"));
		assert!(asm.contains("mov rax, r9"));
	}

	#[test]
	fn unit_additions_become_inc_and_dec() {
		assert!(generate_str("rax += 1", 64).contains("inc rax"));
		assert!(generate_str("rax -= 1", 64).contains("dec rax"));
		assert!(generate_str("rax += 2", 64).contains("add rax, 2"));
	}

	#[test]
	fn power_of_two_multiplication_becomes_shift() {
		assert!(generate_str("rbx *= 8", 64).contains("shl rbx, 3"));
	}

	#[test]
	fn accumulator_multiplication_uses_short_form() {
		assert!(generate_str("rax *= rbx", 64).contains("\tmul rbx"));
		assert!(generate_str("rbx *= rcx", 64).contains("imul rbx, rcx"));
	}

	#[test]
	fn stack_arrows_push_and_pop() {
		assert!(generate_str("rax -> stack", 64).contains("push rax"));
		assert!(generate_str("stack -> rbx", 64).contains("pop rbx"));
		let both = generate_str("rax -> rbx", 64);
		assert!(both.contains("push rax") && both.contains("pop rbx"));
	}

	#[test]
	fn exchange_and_bitwise_operators() {
		assert!(generate_str("rax <-> rbx", 64).contains("xchg rax, rbx"));
		assert!(generate_str("rax &= 15", 64).contains("and rax, 15"));
		assert!(generate_str("rax |= rbx", 64).contains("or rax, rbx"));
		assert!(generate_str("rax ^= rax", 64).contains("xor rax, rax"));
		assert!(generate_str("rax << 3", 64).contains("shl rax, 3"));
		assert!(generate_str("rax >>> 1", 64).contains("ror rax, 1"));
	}

	#[test]
	fn if_blocks_compare_and_jump_inverted() {
		let mut state = ProgramState::new();
		let asm = generate_all("rax == 1\nrbx = 2\nend", 64, &mut state).unwrap();
		assert!(asm.contains("cmp rax, 1"));
		assert!(asm.contains("jne if1_end"));
		assert!(asm.contains("if1_end:"));
		assert!(state.in_if_block.is_empty());
	}

	#[test]
	fn nested_if_blocks_are_rejected() {
		let mut state = ProgramState::new();
		let result = generate_all("rax == 1\nrbx == 2", 64, &mut state);
		assert!(matches!(result, Err(CompileError::NestedIfBlock { .. })));
	}

	#[test]
	fn counted_loops_save_and_restore_the_counter() {
		let mut state = ProgramState::new();
		let asm = generate_all("loop 5\nrax += 2\nend", 64, &mut state).unwrap();
		assert!(asm.contains("mov rcx, 5"));
		assert!(asm.contains("l1:"));
		assert!(asm.contains("push rcx"));
		assert!(asm.contains("pop rcx"));
		assert!(asm.contains("jnz l1"));
		assert!(asm.contains("l1_end:"));
	}

	#[test]
	fn rawloops_skip_the_counter() {
		let mut state = ProgramState::new();
		let asm = generate_all("rawloop\nrax += 2\nbreak\nend", 64, &mut state).unwrap();
		assert!(asm.contains("r_l1:"));
		assert!(!asm.contains("push rcx"));
		assert!(asm.contains("jmp r_l1_end"));
	}

	#[test]
	fn endless_loops_jump_forever() {
		let mut state = ProgramState::new();
		let asm = generate_all("loop\nrax += 2\nend", 64, &mut state).unwrap();
		assert!(asm.contains("e_l1:"));
		assert!(asm.contains("jmp e_l1"));
		assert!(state.endless);
	}

	#[test]
	fn break_outside_of_loops_fails() {
		let result = generate_all("break", 64, &mut ProgramState::new());
		assert!(matches!(result, Err(CompileError::NotInLoop { .. })));
	}

	#[test]
	fn entry_function_skips_the_stack_frame() {
		let asm = generate_str("fun main", 64);
		assert!(asm.contains("global main"));
		assert!(asm.contains("main:"));
		assert!(!asm.contains("push rbp"));
		let asm = generate_str("fun helper", 64);
		assert!(asm.contains("push rbp"));
		assert!(asm.contains("mov rbp, rsp"));
	}

	#[test]
	fn function_nesting_is_rejected() {
		let result = generate_all("fun first\nfun second", 64, &mut ProgramState::new());
		assert!(matches!(result, Err(CompileError::NestedFunction { .. })));
	}

	#[test]
	fn function_redeclaration_is_rejected() {
		let result = generate_all("fun f\nend\nfun f", 64, &mut ProgramState::new());
		assert!(matches!(result, Err(CompileError::Redeclaration { .. })));
	}

	#[test]
	fn return_from_helper_keeps_the_return_register() {
		let mut state = ProgramState::new();
		let asm = generate_all("fun helper\nret", 64, &mut state).unwrap();
		assert!(asm.contains("mov rsp, rbp"));
		assert!(asm.contains("pop rbp"));
		assert!(asm.ends_with("\tret\t\t\t\t; Return\n\n"));
		assert!(!asm.contains("xor rax, rax\t\t; clear"));
	}

	#[test]
	fn exit_from_main_terminates_the_process() {
		let asm = generate_all("fun main\nexit", 64, &mut ProgramState::new()).unwrap();
		assert!(asm.contains("mov rax, 60"));
		assert!(asm.contains("xor rdi, rdi"));
		assert!(asm.contains("syscall"));
	}

	#[test]
	fn exit_code_is_carried() {
		let asm = generate_all("exit 2", 64, &mut ProgramState::new()).unwrap();
		assert!(asm.contains("mov rdi, 2"));
		let asm = generate_all("exit 2", 32, &mut ProgramState::new()).unwrap();
		assert!(asm.contains("mov ebx, 2"));
		assert!(asm.contains("int 0x80"));
	}

	#[test]
	fn sixteen_bit_exit_uses_dos_services() {
		let asm = generate_all("exit", 16, &mut ProgramState::new()).unwrap();
		assert!(asm.contains("mov ah, 0x4c"));
		assert!(asm.contains("int 0x21"));
	}

	#[test]
	fn stray_end_after_exit_is_tolerated() {
		let mut state = ProgramState::new();
		let asm = generate_all("fun main\nexit\nend", 64, &mut state).unwrap();
		assert!(asm.contains("mov rax, 60"));
		assert!(!state.surprise_ending_with_exit);
	}

	#[test]
	fn stray_end_alone_is_an_error() {
		let result = generate_all("end", 64, &mut ProgramState::new());
		assert!(matches!(result, Err(CompileError::StrayEnd { .. })));
	}

	#[test]
	fn bare_undefined_name_fails() {
		let result = generate_all("foo", 64, &mut ProgramState::new());
		assert!(matches!(result, Err(CompileError::UndefinedName { .. })));
	}

	#[test]
	fn bare_defined_name_becomes_a_call() {
		let mut state = ProgramState::new();
		let asm = generate_all("fun greet\nend\ngreet", 64, &mut state).unwrap();
		assert!(asm.contains("call greet"));
	}

	#[test]
	fn syscall_binds_parameter_registers() {
		let asm = generate_str("syscall(60, 0)", 64);
		assert!(asm.contains("mov rax, 60"));
		assert!(asm.contains("xor rdi, rdi"));
		assert!(asm.contains("\tsyscall\t"));
	}

	#[test]
	fn disregarded_parameters_are_skipped() {
		let asm = generate_str("syscall(60, _)", 64);
		assert!(asm.contains("supposedly already set"));
		assert!(!asm.contains("mov rdi"));
	}

	#[test]
	fn too_many_interrupt_parameters_fail() {
		let result = generate_all("int(0x80, 1, 2, 3, 4, 5)", 32, &mut ProgramState::new());
		assert!(matches!(result, Err(CompileError::TooManyParameters { .. })));
	}

	#[test]
	fn asm_passthrough_matches_platform_bits() {
		assert!(generate_str("asm 64 stosb", 64).contains("\tstosb"));
		assert_eq!(generate_str("asm 32 stosb", 64).trim(), "");
	}

	#[test]
	fn memory_keywords_convert_register_widths() {
		let asm = generate_str("membyte 0xb8000 = rax", 64);
		assert!(asm.contains("mov BYTE [0xb8000], al"));
		let asm = generate_str("memword 0xb8000 = rbx", 64);
		assert!(asm.contains("mov WORD [0xb8000], bx"));
		let asm = generate_str("rax = mem 0x1000", 64);
		assert!(asm.contains("mov rax, [0x1000]"));
	}

	#[test]
	fn funparam_maps_to_the_abi() {
		let asm = generate_str("rax = funparam 0", 64);
		assert!(asm.contains("mov rax, rdi"));
		let asm = generate_str("eax = funparam 1", 32);
		assert!(asm.contains("mov eax, [ebp+12]"));
	}

	#[test]
	fn variable_declarations_reserve_bss_space() {
		let mut state = ProgramState::new();
		let asm = generate_all("var buffer 1024", 64, &mut state).unwrap();
		assert!(asm.contains("buffer: resb 1024"));
		assert!(asm.contains("_capacity_of_buffer equ 1024"));
		assert!(asm.contains("_length_of_buffer: resd 1"));
		assert_eq!(state.variables.get("buffer"), Some(&1024));
	}

	#[test]
	fn constant_declarations_carry_length_symbols() {
		let mut state = ProgramState::new();
		let asm = generate_all("const msg = \"hi\"", 64, &mut state).unwrap();
		assert!(asm.contains("msg:\tdb \"hi\""));
		assert!(!asm.contains("\"hi\", 0"));
		assert!(asm.contains("_length_of_msg equ $ - msg"));
	}

	#[test]
	fn numeric_constants_size_by_platform() {
		let mut state = ProgramState::new();
		assert!(generate_all("const answer = 42", 64, &mut state).unwrap().contains("answer:\tdq 42"));
		let mut state = ProgramState::new();
		assert!(generate_all("const answer = 42", 32, &mut state).unwrap().contains("answer:\tdw 42"));
		let mut state = ProgramState::new();
		assert!(generate_all("const answer = 42", 16, &mut state).unwrap().contains("answer:\tdb 42"));
	}

	#[test]
	fn constant_redeclaration_is_rejected() {
		let result = generate_all("const x = 1\nconst x = 2", 64, &mut ProgramState::new());
		assert!(matches!(result, Err(CompileError::Redeclaration { .. })));
	}

	#[test]
	fn copy_and_append_use_string_moves() {
		let mut state = ProgramState::new();
		let asm =
			generate_all("const src = \"abc\"\nvar dst 16\ndst = src\ndst += src", 64, &mut state).unwrap();
		assert!(asm.contains("mov rdi, dst"));
		assert!(asm.contains("mov rsi, src"));
		assert!(asm.contains("mov rcx, _length_of_src"));
		assert!(asm.contains("[_length_of_dst]"));
		assert!(asm.matches("rep movsb").count() == 2);
	}

	#[test]
	fn unfamiliar_statements_are_fatal() {
		let result = generate_all("rax rbx rcx", 64, &mut ProgramState::new());
		assert!(matches!(result, Err(CompileError::UnfamiliarStatement { .. })));
	}

	#[test]
	fn sixteen_bit_print_uses_dos_write() {
		let mut state = ProgramState::new();
		let asm = generate_all("const msg = \"x\"\nprint msg", 16, &mut state).unwrap();
		assert!(asm.contains("mov dx, msg"));
		assert!(asm.contains("mov cx, _length_of_msg"));
		assert!(asm.contains("mov ah, 0x40"));
		assert!(asm.contains("int 0x21"));
	}

	#[test]
	fn sixteen_bit_loop_value_picks_width() {
		let config = TargetConfig::new(16, false, false).unwrap();
		let src = SourceFile::from_source("value 65\nwrite\nvalue 1000\nloopwrite");
		let tokens = tokenize(&src, &config).unwrap();
		let mut state = ProgramState::new();
		let mut output = String::new();
		for statement in split_statements(&tokens) {
			output += &generate(statement, &mut state, &config, &src).unwrap();
		}
		assert!(output.contains("mov al, 65"));
		assert!(output.contains("\tstosb"));
		assert!(output.contains("mov ax, 1000"));
		assert!(output.contains("rep stosw"));
	}

	#[test]
	fn bootable_emits_the_multiboot_header() {
		let mut state = ProgramState::new();
		let asm = generate_all("bootable", 32, &mut state).unwrap();
		assert!(asm.contains("MAGIC       equ  0x1BADB002"));
		assert!(asm.contains("section .multiboot"));
		assert!(asm.contains("stack_top:"));
		assert!(state.bootable_kernel);
	}

	#[test]
	fn extern_registers_the_symbol() {
		let mut state = ProgramState::new();
		let asm = generate_all("extern printf\ncall printf", 64, &mut state).unwrap();
		assert!(asm.contains("extern printf"));
		assert!(asm.contains("call printf"));
	}
}
