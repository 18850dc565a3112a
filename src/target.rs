//! Compilation target configuration.

use flexstr::{SharedStr, shared_str};

use crate::error::CompileError;

/// The bit width of the target platform.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlatformBits {
	/// 16-bit real mode (DOS style executables or boot sectors).
	Bits16,
	/// 32-bit protected mode.
	Bits32,
	/// 64-bit long mode.
	Bits64,
}

impl PlatformBits {
	/// The numeric bit width.
	#[must_use]
	pub const fn bits(self) -> u8 {
		match self {
			Self::Bits16 => 16,
			Self::Bits32 => 32,
			Self::Bits64 => 64,
		}
	}

	/// Parse a numeric bit width.
	/// # Errors
	/// If the bit size is not one of 16, 32 and 64.
	pub fn from_bits(bits: u8) -> Result<Self, CompileError> {
		match bits {
			16 => Ok(Self::Bits16),
			32 => Ok(Self::Bits32),
			64 => Ok(Self::Bits64),
			_ => Err(CompileError::UnsupportedBitSize { bits }),
		}
	}
}

/// Information about the current platform and compile target. Immutable for the duration of a
/// compilation.
#[derive(Clone, Debug)]
pub struct TargetConfig {
	/// The bit width of the target platform.
	pub platform_bits: PlatformBits,

	/// Whether to use the BSD/macOS calling convention for system calls.
	pub macos: bool,

	/// True if this is not a normal executable but a bootable kernel.
	pub bootable_kernel: bool,

	/// The name of the first function the linker should use, typically `_start`.
	pub linker_start_function: SharedStr,

	/// The registers that are primarily used when calling interrupts. Not used for 16-bit
	/// platforms.
	pub(crate) interrupt_parameter_registers: &'static [&'static str],
}

impl TargetConfig {
	/// Create a target configuration for the given bit width and operating system.
	/// # Errors
	/// If the bit size is not one of 16, 32 and 64.
	pub fn new(platform_bits: u8, macos: bool, bootable_kernel: bool) -> Result<Self, CompileError> {
		let platform_bits = PlatformBits::from_bits(platform_bits)?;
		let linker_start_function = if macos { shared_str!("_main") } else { shared_str!("_start") };
		let interrupt_parameter_registers: &[&str] = if platform_bits == PlatformBits::Bits32 {
			&["eax", "ebx", "ecx", "edx"]
		} else {
			&["rax", "rdi", "rsi", "rdx", "rcx", "r8", "r9"]
		};
		Ok(Self { platform_bits, macos, bootable_kernel, linker_start_function, interrupt_parameter_registers })
	}

	/// The register used as a loop counter on this platform.
	#[must_use]
	pub const fn counter_register(&self) -> &'static str {
		match self.platform_bits {
			PlatformBits::Bits16 => "cx",
			PlatformBits::Bits32 => "ecx",
			PlatformBits::Bits64 => "rcx",
		}
	}

	/// Map a function parameter slot to the register (or stack expression) holding it, per the
	/// platform ABI. Returns `None` on 16-bit platforms, where parameters are not implemented.
	#[must_use]
	pub fn param_register(&self, number: usize) -> Option<String> {
		match self.platform_bits {
			PlatformBits::Bits64 => {
				// ref: page 34 of the AMD64 ELF ABI (figure 3.17)
				let offset = number * 8;
				Some(
					match offset {
						0 => "rdi",
						8 => "rsi",
						16 => "rdx",
						24 => "rcx",
						32 => "r8",
						40 => "r9",
						48 => "xmm0",
						64 => "xmm1",
						72 => "xmm2",
						80 => "xmm3",
						88 => "xmm4",
						96 => "xmm5",
						104 => "xmm6",
						112 => "xmm7",
						120 => "xmm8",
						128 => "xmm9",
						136 => "xmm10",
						144 => "xmm11",
						152 => "xmm12",
						160 => "xmm13",
						168 => "xmm14",
						176 => "xmm15",
						_ => return Some(format!("[rbp+{offset}]")),
					}
					.to_owned(),
				)
			},
			PlatformBits::Bits32 => Some(format!("[ebp+{}]", 8 + number * 4)),
			PlatformBits::Bits16 => None,
		}
	}
}
