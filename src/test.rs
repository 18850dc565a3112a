//! Whole-program tests over the demo sources.

use crate::{CompiledProgram, SourceFile, TargetConfig, compile};

fn compile_demo(file: &str, bits: u8, macos: bool, bootable: bool) -> CompiledProgram {
	let source = SourceFile::from_file(file).unwrap();
	let config = TargetConfig::new(bits, macos, bootable).unwrap();
	compile(&source, &config, false).unwrap()
}

#[test]
fn hello_world_64() {
	let program = compile_demo("demos/hello.bts", 64, false, false);
	let assembly = &program.assembly;
	assert!(assembly.starts_with("; Generated with btsc"));
	assert!(assembly.contains("bits 64"));
	assert!(assembly.contains("section .data"));
	assert!(assembly.contains("hello:\tdb \"Hello, World!\", 10"));
	assert!(assembly.contains("_length_of_hello equ $ - hello"));
	assert!(assembly.contains("global _start"));
	assert!(assembly.contains("mov rsi, hello"));
	assert!(assembly.contains("mov rdx, _length_of_hello"));
	assert!(assembly.contains("\tsyscall\t"));
	// The implicit end of main exits instead of returning.
	assert!(assembly.contains("mov rax, 60"));
	assert!(program.inline_c.is_empty());
}

#[test]
fn hello_world_32() {
	let assembly = compile_demo("demos/hello.bts", 32, false, false).assembly;
	assert!(assembly.contains("bits 32"));
	assert!(assembly.contains("mov ecx, hello"));
	assert!(assembly.contains("mov edx, _length_of_hello"));
	assert!(assembly.contains("int 0x80"));
}

#[test]
fn hello_world_16() {
	let assembly = compile_demo("demos/hello.bts", 16, false, false).assembly;
	assert!(assembly.contains("bits 16"));
	assert!(assembly.contains("org 0x100"));
	assert!(assembly.contains("mov dx, hello"));
	assert!(assembly.contains("mov ah, 0x40"));
	assert!(assembly.contains("int 0x21"));
}

#[test]
fn hello_world_macos() {
	let assembly = compile_demo("demos/hello.bts", 32, true, false).assembly;
	assert!(assembly.contains("push dword hello"));
	assert!(assembly.contains("BSD system call cleanup"));
	assert!(assembly.contains("_main:"));
}

#[test]
fn countdown_loops_and_conditionals() {
	let assembly = compile_demo("demos/countdown.bts", 64, false, false).assembly;
	assert!(assembly.contains("mov rax, 10"));
	assert!(assembly.contains("mov rcx, 5"));
	assert!(assembly.contains("l1:"));
	assert!(assembly.contains("dec rax"));
	assert!(assembly.contains("shl rbx, 2"));
	assert!(assembly.contains("jnz l1"));
	assert!(assembly.contains("cmp rax, 5"));
	assert!(assembly.contains("jne if1_end"));
	assert!(assembly.contains("if1_end:"));
	assert!(assembly.contains("xor rax, rax"));
}

#[test]
fn concat_copies_through_the_bss() {
	let assembly = compile_demo("demos/concat.bts", 64, false, false).assembly;
	assert!(assembly.contains("section .bss"));
	assert!(assembly.contains("buffer: resb 256"));
	assert!(assembly.contains("_capacity_of_buffer equ 256"));
	assert_eq!(assembly.matches("rep movsb").count(), 2);
	// Printing a variable reads its runtime length indirectly.
	assert!(assembly.contains("mov rdx, [_length_of_buffer]"));
}

#[test]
fn bootable_kernel_image() {
	let program = compile_demo("demos/kernel.bts", 32, false, true);
	let assembly = &program.assembly;
	assert!(assembly.contains("section .multiboot"));
	assert!(assembly.contains("MAGIC       equ  0x1BADB002"));
	assert!(assembly.contains("mov esp, stack_top"));
	assert!(assembly.contains("\tcli\t"));
	assert!(assembly.contains("\thlt"));
	// Kernels never emit a process exit sequence.
	assert!(!assembly.contains("int 0x80"));
}

#[test]
fn inline_c_is_extracted_and_skipped() {
	let program = compile_demo("demos/inline.bts", 64, false, false);
	assert!(program.inline_c.contains("void greet()"));
	assert!(program.inline_c.contains("void main() {"));
	assert!(!program.inline_c.contains("inline_c"));
	// The assembly side only sees the synthesized extern main glue.
	assert!(program.assembly.contains("extern main"));
	assert!(program.assembly.contains("call main"));
	assert!(!program.assembly.contains("puts"));
}

#[test]
fn all_demos_compile_on_every_platform() {
	for demo in ["demos/hello.bts", "demos/countdown.bts", "demos/concat.bts"] {
		for bits in [16, 32, 64] {
			let source = SourceFile::from_file(demo).unwrap();
			let config = TargetConfig::new(bits, false, false).unwrap();
			compile(&source, &config, false).unwrap();
		}
	}
}

#[test]
fn errors_abort_with_no_output() {
	let config = TargetConfig::new(64, false, false).unwrap();
	for source in [
		"const x = 1\nconst x = 1",
		"fun f\nfun g",
		"print \"immediate\"",
		"rax = len missing",
		"undeclared_function",
		"break",
		"end",
		"fun main\nweird ! tokens",
	] {
		let result = compile(&SourceFile::from_source(source), &config, false);
		assert!(result.is_err(), "{source} should fail");
	}
}
