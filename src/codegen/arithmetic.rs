//! Three-token register expressions: assignments, arithmetic, stack operations.

use std::sync::Arc;

use super::memory::reserved_and_value;
use crate::error::{CompileError, SourceFile};
use crate::parser::token::{Statement, TokenKind};
use crate::registers::{downgrade, is_16_bit, is_32_bit, is_64_bit, is_accumulator, upgrade};
use crate::target::{PlatformBits, TargetConfig};

/// Power-of-two literals that multiplication and division shortcut into shifts, with the shift
/// count being the list position plus one.
const SHIFTS: &[&str] = &["2", "4", "8", "16", "32", "64", "128"];

fn shift_count(value: &str) -> Option<usize> {
	SHIFTS.iter().position(|&shift| shift == value).map(|position| position + 1)
}

/// Generate a three-token expression: `a <op> b` where `a` is a register, the disregard
/// placeholder or the `stack` pseudo-name.
#[allow(clippy::too_many_lines)]
pub(super) fn three_token_expression(
	st: &Statement,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	let a = &st[0].value;
	let b = &st[2].value;

	if st[0].kind == TokenKind::Register
		&& st[1].kind == TokenKind::Assignment
		&& matches!(st[2].kind, TokenKind::Value | TokenKind::ValidName)
	{
		if b == "0" {
			return Ok(format!("\txor {a}, {a}\t\t; {a} {} {b}", st[1].value));
		}
		if is_32_bit(a) && is_64_bit(b) {
			log::warn!("Using {b} as a 32-bit register when assigning.");
			return Ok(format!("\tmov {a}, {}\t\t; {a} {} {b}", downgrade(b), st[1].value));
		}
		if is_64_bit(a) && is_32_bit(b) {
			log::warn!("Using {a} as a 32-bit register when assigning.");
			let mut asmcode = String::from("\txor rax, rax\t\t; clear rax\n");
			asmcode += &format!("\tmov {}, {b}\t\t; {a} {} {b}", downgrade(a), st[1].value);
			return Ok(asmcode);
		}
		return Ok(format!("\tmov {a}, {b}\t\t; {a} {} {b}", st[1].value));
	}
	if st[0].kind == TokenKind::Disregard {
		// TODO: If st[2] is a function, call it and then disregard the result.
		return Ok(format!("\t\t\t\t; Disregarding: {b}\n"));
	}
	if st[0].kind == TokenKind::Register && st[1].kind == TokenKind::Assignment && st[2].kind == TokenKind::Register {
		return Ok(format!("\tmov {a}, {b}\t\t\t; {a} {} {b}", st[1].value));
	}
	if st[0].kind == TokenKind::Reserved && st[1].kind == TokenKind::Value {
		return reserved_and_value(&st[.. 2], config, src);
	}
	if (st[0].kind == TokenKind::Register || a == "stack" || st[0].kind == TokenKind::Value)
		&& st[1].kind == TokenKind::Arrow
		&& (st[2].kind == TokenKind::Register || b == "stack")
	{
		// Push and pop.
		if a == "stack" && b == "stack" {
			return Err(CompileError::InvalidStackExpression {
				src:      src.clone(),
				location: src.line_span(st.line()),
			});
		}
		if b == "stack" {
			return Ok(format!("\tpush {a}\t\t\t; {a} -> stack\n"));
		}
		if a == "stack" {
			return Ok(format!("\tpop {b}\t\t\t\t; stack -> {b}\n"));
		}
		if st[0].kind == TokenKind::Register && st[2].kind == TokenKind::Register {
			return Ok(format!("\tpush {a}\t\t\t; {a} -> {b}\n\tpop {b}\t\t\t\t;\n"));
		}
		return Err(CompileError::UnfamiliarStatement {
			statement: st.to_string(),
			src:       src.clone(),
			location:  src.line_span(st.line()),
		});
	}

	if st[1].kind == TokenKind::Addition && st[2].kind == TokenKind::Register {
		return Ok(format!("\tadd {a}, {b}\t\t\t; {a} += {b}"));
	}
	if st[1].kind == TokenKind::Subtraction && st[2].kind == TokenKind::Register {
		return Ok(format!("\tsub {a}, {b}\t\t\t; {a} -= {b}"));
	}
	if st[1].kind == TokenKind::Multiplication && st[2].kind == TokenKind::Register {
		if is_accumulator(a) {
			return Ok(format!("\tmul {b}\t\t\t; {a} *= {b}"));
		}
		if a == b {
			return Ok(format!("\timul {a}\t\t\t; {a} *= {a}"));
		}
		return Ok(format!("\timul {a}, {b}\t\t\t; {a} *= {b}"));
	}
	if st[1].kind == TokenKind::Division && st[2].kind == TokenKind::Register {
		if is_accumulator(a) {
			return Ok(format!("\tdiv {b}\t\t\t; {a} /= {b}"));
		}
		return Ok(format!("\tidiv {a}, {b}\t\t\t; {a} /= {b}"));
	}

	let value_or_memexpr = matches!(st[2].kind, TokenKind::Value | TokenKind::MemExpr);
	let value_memexpr_or_register =
		matches!(st[2].kind, TokenKind::Value | TokenKind::MemExpr | TokenKind::Register);
	if st[1].kind == TokenKind::Addition && value_or_memexpr {
		if b == "1" {
			return Ok(format!("\tinc {a}\t\t\t; {a}++"));
		}
		return Ok(format!("\tadd {a}, {b}\t\t\t; {a} += {b}"));
	}
	if st[1].kind == TokenKind::Subtraction && value_or_memexpr {
		if b == "1" {
			return Ok(format!("\tdec {a}\t\t\t; {a}--"));
		}
		return Ok(format!("\tsub {a}, {b}\t\t\t; {a} -= {b}"));
	}
	if st[1].kind == TokenKind::And && value_memexpr_or_register {
		return Ok(format!("\tand {a}, {b}\t\t\t; {a} &= {b}"));
	}
	if st[1].kind == TokenKind::Or && value_memexpr_or_register {
		return Ok(format!("\tor {a}, {b}\t\t\t; {a} |= {b}"));
	}
	if st[1].kind == TokenKind::Xor && value_memexpr_or_register {
		return Ok(format!("\txor {a}, {b}\t\t\t; {a} ^= {b}"));
	}
	if st[1].kind == TokenKind::RotateLeft && value_memexpr_or_register {
		return Ok(format!("\trol {a}, {b}\t\t\t; rotate {a} left {b}"));
	}
	if st[1].kind == TokenKind::RotateRight && value_memexpr_or_register {
		return Ok(format!("\tror {a}, {b}\t\t\t; rotate {a} right {b}"));
	}
	if st[1].kind == TokenKind::ShiftLeft && value_memexpr_or_register {
		return Ok(format!("\tshl {a}, {b}\t\t\t; shift {a} left {b}"));
	}
	if st[1].kind == TokenKind::ShiftRight && value_memexpr_or_register {
		return Ok(format!("\tshr {a}, {b}\t\t\t; shift {a} right {b}"));
	}
	if st[1].kind == TokenKind::Exchange && value_memexpr_or_register {
		return Ok(format!("\txchg {a}, {b}\t\t\t; exchange {a} and {b}"));
	}
	if st[1].kind == TokenKind::Out && value_memexpr_or_register {
		return Ok(format!("\tout {a}, {b}\t\t\t; output {a} to IO port {b}"));
	}
	if st[1].kind == TokenKind::In && matches!(st[2].kind, TokenKind::MemExpr | TokenKind::Register) {
		return Ok(format!("\tin {b}, {a}\t\t\t; input {b} from IO port {a}"));
	}
	if st[1].kind == TokenKind::Multiplication && value_or_memexpr {
		if let Some(count) = shift_count(b) {
			return Ok(format!("\tshl {a}, {count}\t\t\t; {a} *= {b}"));
		}
		if is_accumulator(a) {
			return Ok(format!("\tmul {b}\t\t\t; {a} *= {b}"));
		}
		if a == b {
			return Ok(format!("\timul {a}\t\t\t; {a} *= {a}"));
		}
		return Ok(format!("\timul {a}, {b}\t\t\t; {a} *= {b}"));
	}
	if st[1].kind == TokenKind::Division && value_or_memexpr {
		if let Some(count) = shift_count(b) {
			return Ok(format!("\tshr {a}, {count}\t\t; {a} /= {b}"));
		}
		return Ok(full_division(a, b, config));
	}

	log::error!("Unfamiliar 3-token expression!");
	Err(CompileError::UnfamiliarStatement {
		statement: st.to_string(),
		src:       src.clone(),
		location:  src.line_span(st.line()),
	})
}

/// Division by a non-power-of-two. `div` clobbers the accumulator:remainder pair, so full
/// register save and restore sequences are synthesized around it; which registers get saved
/// depends on whether the dividend is itself the accumulator.
#[allow(clippy::too_many_lines)]
fn full_division(a: &str, b: &str, config: &TargetConfig) -> String {
	let mut asmcode = format!("\n\t;--- signed division: {a} /= {b} ---\n");

	if config.platform_bits == PlatformBits::Bits32 {
		if a == "eax" {
			// Dividing edx:eax by ecx, with edx cleared to keep to 32-bit numbers.
			asmcode += "\tpush ecx\t\t; save ecx\n";
			asmcode += "\txor edx, edx\t\t; edx = 0 (32-bit 0:eax instead of 64-bit edx:eax)\n";
			asmcode += &format!("\tmov ecx, {b}\t\t; divisor, ecx = {b}\n");
			asmcode += "\tdiv ecx\t\t\t; eax = edx:eax / ecx\n";
			asmcode += "\t\t\t; remainder is in edx\n";
			asmcode += "\tpop ecx\t\t; restore ecx\n";
		} else if a == "ax" {
			// Dividing dx:ax by cx, with dx cleared to keep to 16-bit numbers.
			asmcode += "\tpush cx\t\t; save cx\n";
			asmcode += "\txor dx, dx\t; dx = 0 (16-bit 0:ax instead of 32-bit dx:ax)\n";
			asmcode += &format!("\tmov cx, {b}\t; divisor, cx = {b}\n");
			asmcode += "\t\t\t; remainder is in dx\n";
			asmcode += "\tdiv cx\t\t; ax = dx:ax / cx\n";
			asmcode += "\tpop cx\t\t; restore cx\n";
		} else {
			// The quotient lands in eax, so the dividend register can not be eax here.
			asmcode += "\tpush eax\t\t; save eax\n";
			if a != "ecx" {
				asmcode += "\tpush ecx\t\t; save ecx\n";
			}
			if a != "edx" {
				asmcode += "\tpush edx\t\t; save edx\n";
			}
			if is_64_bit(a) {
				if downgrade(a) != "eax" {
					asmcode += &format!("\tmov eax, {}\t\t; dividend, number to be divided\n", downgrade(a));
				}
			} else if is_16_bit(a) {
				if upgrade(a) != "eax" {
					asmcode += &format!("\tmov eax, {}\t\t; dividend, number to be divided\n", upgrade(a));
				}
			} else if a != "eax" {
				asmcode += &format!("\tmov eax, {a}\t\t; dividend, number to be divided\n");
			}
			asmcode += "\txor edx, edx\t\t; edx = 0 (32-bit 0:eax instead of 64-bit edx:eax)\n";
			asmcode += &format!("\tmov ecx, {b}\t\t; divisor, ecx = {b}\n");
			asmcode += "\tdiv ecx\t\t\t; eax = edx:eax / ecx\n";
			if a != "edx" {
				asmcode += "\tpop edx\t\t; restore edx\n";
			}
			if a != "ecx" {
				asmcode += "\tpop ecx\t\t; restore ecx\n";
			}
			asmcode += &format!("\tmov {a}, eax\t\t; {a} = eax\n");
			asmcode += "\tpop eax\t\t; restore eax\n";
		}
		asmcode += "\n";
		return asmcode;
	}

	// Dividing rdx:rax by the number in r8, with rdx cleared to keep to 64-bit numbers.
	if a == "rax" {
		asmcode += "\txor rdx, rdx\t\t; rdx = 0 (64-bit 0:rax instead of 128-bit rdx:rax)\n";
		asmcode += &format!("\tmov r8, {b}\t\t; divisor, r8 = {b}\n");
		asmcode += "\tdiv r8\t\t\t; rax = rdx:rax / r8\n";
	} else {
		log::info!("Note: r8, r9 and r10 will be changed when dividing: {a} /= {b}");
		if !is_accumulator(a) {
			asmcode += "\tmov r9, rax\t\t; save rax\n";
		}
		if is_32_bit(a) {
			if a != "eax" {
				asmcode += "\txor rax, rax\t\t; clear rax\n";
				asmcode += &format!("\tmov eax, {a}\t\t; dividend, number to be divided\n");
			}
		} else if is_16_bit(a) {
			if a != "ax" {
				asmcode += "\txor rax, rax\t\t; clear rax\n";
				asmcode += &format!("\tmov ax, {a}\t\t; dividend, number to be divided\n");
			}
		} else if a != "rax" {
			asmcode += &format!("\tmov rax, {a}\t\t; dividend, number to be divided\n");
		}
		asmcode += "\txor rdx, rdx\t\t; rdx = 0 (64-bit 0:rax instead of 128-bit rdx:rax)\n";
		asmcode += &format!("\tmov r8, {b}\t\t; divisor, r8 = {b}\n");
		asmcode += "\tdiv r8\t\t\t; rax = rdx:rax / r8\n";
		if !is_accumulator(a) {
			asmcode += &format!("\tmov {a}, rax\t\t; {a} = rax\n");
			asmcode += "\tmov rax, r9\t\t; restore rax\n";
		}
	}
	asmcode
}
