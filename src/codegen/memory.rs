//! Memory access keywords and the reserved index lists (`funparam`, `sysparam`).

use std::sync::Arc;

use super::MemoryWidth;
use crate::error::{CompileError, SourceFile};
use crate::parser::token::{Statement, Token, TokenKind};
use crate::registers::{downgrade_to_byte, reg_to_double, reg_to_word};
use crate::target::{PlatformBits, TargetConfig};

fn convert_register(value: &Token, width: MemoryWidth) -> String {
	if value.kind == TokenKind::Register {
		match width {
			MemoryWidth::Plain => value.value.to_string(),
			MemoryWidth::Byte => downgrade_to_byte(&value.value),
			MemoryWidth::Word => reg_to_word(&value.value),
			MemoryWidth::Double => reg_to_double(&value.value),
		}
	} else {
		value.value.to_string()
	}
}

const fn width_qualifier(width: MemoryWidth) -> &'static str {
	match width {
		MemoryWidth::Plain => "",
		MemoryWidth::Byte => "BYTE ",
		MemoryWidth::Word => "WORD ",
		MemoryWidth::Double => "DOUBLE ",
	}
}

/// `mem x = v` and the width-qualified variants: a store to the given address, with register
/// operands converted to the matching width.
pub(super) fn memory_write(st: &Statement, width: MemoryWidth) -> String {
	let value = convert_register(&st[3], width);
	format!("\tmov {}[{}], {value}\t\t; memory assignment\n", width_qualifier(width), st[1].value)
}

/// `reg = mem x` and the width-qualified read variants: a load from the given address, with the
/// destination register converted to the matching width.
pub(super) fn memory_read(st: &Statement, width: MemoryWidth) -> String {
	let destination = convert_register(&st[0], width);
	let note = match width {
		MemoryWidth::Plain => "",
		MemoryWidth::Byte => " (byte)",
		MemoryWidth::Word => " (word)",
		MemoryWidth::Double => " (double)",
	};
	format!("\tmov {}{destination}, [{}]\t\t; memory assignment{note}\n", width_qualifier(width), st[3].value)
}

/// Map a reserved word plus an index to the register or stack expression holding that slot.
pub(super) fn reserved_and_value(
	st: &[Token],
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	let offset_error = |too_high: bool| CompileError::InvalidOffset {
		word:     st[0].value.to_string(),
		value:    st[1].value.to_string(),
		too_high,
		src:      src.clone(),
		location: src.line_span(st[1].line),
	};
	if st[0].value == "funparam" {
		let offset = st[1].value.parse::<usize>().map_err(|_| offset_error(false))?;
		config.param_register(offset).ok_or_else(|| CompileError::Unsupported {
			feature:  "function parameters for 16-bit assembly".to_owned(),
			src:      src.clone(),
			location: src.line_span(st[0].line),
		})
	} else if st[0].value == "sysparam" {
		let offset = st[1].value.parse::<usize>().map_err(|_| offset_error(false))?;
		if offset >= config.interrupt_parameter_registers.len() {
			return Err(offset_error(true));
		}
		Ok(config.interrupt_parameter_registers[offset].to_owned())
	} else {
		Err(CompileError::UnsupportedReservedWord { src: src.clone(), location: src.line_span(st[0].line) })
	}
}

/// `reserved idx = x`: store into a parameter slot.
pub(super) fn reserved_assignment(
	st: &Statement,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	let slot = reserved_and_value(&st[.. 2], config, src)?;
	let mut retval = format!("\tmov {slot}, {}\t\t\t; ", st[3].value);
	if config.platform_bits == PlatformBits::Bits32 && st[3].kind != TokenKind::Register {
		retval = retval.replacen("mov", "mov DWORD", 1);
	}
	let pointer_comment = if st[3].kind == TokenKind::ValidName { "&" } else { "" };
	retval += &format!("{}[{}] = {pointer_comment}{}\n", st[0].value, st[1].value, st[3].value);
	Ok(retval)
}

/// `reg = reserved idx`: fetch a parameter slot into a register.
pub(super) fn register_from_reserved(
	st: &Statement,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	let slot = reserved_and_value(&st[2 ..], config, src)?;
	let mut retval = format!("\tmov {}, {slot}\t\t\t; ", st[0].value);
	retval += &format!("{} = {}[{}]\n", st[0].value, st[2].value, st[3].value);
	Ok(retval)
}

/// `reserved idx = reserved idx`: slot-to-slot move, using the accumulator as a scratch register
/// on 32-bit where a memory-to-memory move is not encodable.
pub(super) fn reserved_from_reserved(
	st: &Statement,
	config: &TargetConfig,
	src: &Arc<SourceFile>,
) -> Result<String, CompileError> {
	let destination = reserved_and_value(&st[.. 2], config, src)?;
	let source = reserved_and_value(&st[3 ..], config, src)?;
	let mut retval = if config.platform_bits == PlatformBits::Bits32 {
		format!("\tmov eax, {source}\t\t\t; Uses eax as a temporary variable\n\tmov {destination}, eax\t\t\t; ")
	} else {
		format!("\tmov {destination}, {source}\t\t\t; ")
	};
	retval += &format!("{}[{}] = {}[{}]\n", st[0].value, st[1].value, st[3].value, st[4].value);
	Ok(retval)
}
