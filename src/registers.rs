//! Register name algebra.
//!
//! Pure functions classifying x86 register names by width and converting between widths. The
//! canonical table below is ordered by width group (8-bit, 16-bit, 32-bit, 64-bit); the width
//! classifiers are position-range lookups against the group boundary names, so the table order is
//! load-bearing.

/// Every register name the lexer recognizes, grouped by width.
pub const REGISTERS: &[&str] = &[
	// 8-bit
	"ah", "al", "bh", "bl", "ch", "cl", "dh", "dl",
	// 16-bit
	"ax", "bx", "cx", "dx", "si", "di", "sp", "bp", "ip", "cs", "es", "ds", "fs", "gs", "ss",
	// 32-bit
	"eax", "ebx", "ecx", "edx", "esi", "edi", "esp", "ebp", "eip",
	// 64-bit
	"rax", "rbx", "rcx", "rdx", "rsi", "rdi", "rsp", "rbp", "rip", "r8", "r9", "r10", "r11", "r12", "r13", "r14",
	"r15", "sil", "dil", "spl", "bpl", "xmm8", "xmm9", "xmm10", "xmm11", "xmm12", "xmm13", "xmm14", "xmm15",
];

fn position(register: &str) -> Option<usize> {
	REGISTERS.iter().position(|&candidate| candidate == register)
}

/// Whether the given word is a register name at all.
#[must_use]
pub fn is_register(word: &str) -> bool {
	position(word).is_some()
}

/// Whether the given register name is the 64-bit version of the general purpose registers.
#[must_use]
pub fn is_64_bit(register: &str) -> bool {
	// Anything after "rax" (including).
	position(register) >= position("rax")
}

/// Whether the given register name is the 32-bit version of the general purpose registers.
#[must_use]
pub fn is_32_bit(register: &str) -> bool {
	let register_position = position(register);
	// Between "eax" (including) and "rax" (excluding).
	position("eax") <= register_position && register_position < position("rax")
}

/// Whether the given register name is the 16-bit version of the general purpose registers.
#[must_use]
pub fn is_16_bit(register: &str) -> bool {
	let register_position = position(register);
	// Between "ax" (including) and "eax" (excluding).
	position("ax") <= register_position && register_position < position("eax")
}

/// Whether the given register name is one of the 8-bit registers.
#[must_use]
pub fn is_8_bit(register: &str) -> bool {
	let register_position = position(register);
	register_position.is_some() && register_position < position("ax")
}

/// Find the 32-bit version of a 64-bit register, or the 16-bit version of a 32-bit register.
/// Unrecognized prefixes (and the empty string) pass through unchanged.
#[must_use]
pub fn downgrade(register: &str) -> String {
	if let Some(rest) = register.strip_prefix('r') {
		return format!("e{rest}");
	}
	if let Some(rest) = register.strip_prefix('e') {
		return rest.to_owned();
	}
	register.to_owned()
}

/// Downgrade a register until it is the size of a byte. Requires the string to be non-empty.
#[must_use]
pub fn downgrade_to_byte(register: &str) -> String {
	let bare = register.strip_prefix(['r', 'e']).unwrap_or(register);
	bare.replacen('x', "l", 1)
}

/// Find the 64-bit version of a 32-bit register, or the 32-bit version of a 16-bit register, also
/// covering promotion of an 8-bit low/high-byte name to its 16-bit parent. Requires the string to
/// be non-empty.
#[must_use]
pub fn upgrade(register: &str) -> String {
	if let Some(rest) = register.strip_prefix('e')
		&& is_64_bit(&format!("r{rest}"))
	{
		return format!("r{rest}");
	}
	if is_32_bit(&format!("e{register}")) {
		return format!("e{register}");
	}
	let word = upgrade_8_bit_register_to_16_bit(register);
	if is_16_bit(&word) {
		return word;
	}
	register.to_owned()
}

fn upgrade_8_bit_register_to_16_bit(register: &str) -> String {
	let mut characters = register.chars();
	match (characters.next(), characters.next()) {
		(Some(first), Some('l' | 'h')) => format!("{first}x"),
		_ => register.to_owned(),
	}
}

/// Convert a register to its word sized variant. Requires the string to be non-empty.
#[must_use]
pub fn reg_to_word(register: &str) -> String {
	upgrade(&downgrade_to_byte(register))
}

/// Convert a register to its double sized variant. Requires the string to be non-empty.
#[must_use]
pub fn reg_to_double(register: &str) -> String {
	upgrade(&upgrade(&downgrade_to_byte(register)))
}

/// Whether the register is any width variant of the "a" register. Division and multiplication can
/// use the shorter single-operand instruction forms for these.
#[must_use]
pub fn is_accumulator(register: &str) -> bool {
	matches!(register, "ax" | "eax" | "rax" | "al" | "ah")
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn width_classes_are_disjoint() {
		for &register in REGISTERS {
			let classes =
				[is_8_bit(register), is_16_bit(register), is_32_bit(register), is_64_bit(register)];
			assert_eq!(classes.iter().filter(|&&class| class).count(), 1, "{register} is in exactly one class");
		}
	}

	#[test]
	fn up_down_round_trip() {
		// Within the general purpose prefixed registers, a downgrade followed by an upgrade lands
		// back in the original width class; at the 64-bit top and 8-bit bottom the operations are
		// no-ops in the respective direction.
		for register in ["rax", "rbx", "rcx", "rdx", "rsi", "rdi", "rsp", "rbp"] {
			assert!(is_64_bit(register));
			let down = downgrade(register);
			assert!(is_32_bit(&down), "{down} is 32-bit");
			assert_eq!(upgrade(&down), register);
		}
		for register in ["eax", "ebx", "ecx", "edx"] {
			assert!(is_32_bit(&downgrade(&upgrade(register))));
		}
		assert_eq!(upgrade("rax"), "rax");
		assert_eq!(downgrade("ax"), "ax");
	}

	#[test]
	fn byte_word_double_conversions() {
		assert_eq!(downgrade_to_byte("rax"), "al");
		assert_eq!(downgrade_to_byte("ecx"), "cl");
		assert_eq!(downgrade_to_byte("dx"), "dl");
		assert_eq!(reg_to_word("rax"), "ax");
		assert_eq!(reg_to_double("rbx"), "ebx");
		assert_eq!(reg_to_double("cx"), "ecx");
	}

	#[test]
	fn eight_bit_promotion() {
		assert_eq!(upgrade("al"), "ax");
		assert_eq!(upgrade("ch"), "cx");
		assert_eq!(upgrade("bx"), "ebx");
	}

	#[test]
	fn accumulator_membership() {
		for register in ["al", "ah", "ax", "eax", "rax"] {
			assert!(is_accumulator(register));
		}
		assert!(!is_accumulator("rbx"));
		assert!(!is_accumulator("bl"));
	}

	#[test]
	fn unknown_prefixes_pass_through() {
		assert_eq!(downgrade("si"), "si");
		assert_eq!(upgrade("xmm8"), "xmm8");
	}
}
