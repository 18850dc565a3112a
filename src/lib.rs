//! btsc — a compiler for the BTS language.
//!
//! BTS is a small, line-oriented, assembly-adjacent language. This crate lowers it to x86
//! assembly text (NASM dialect) for 16, 32 and 64-bit Linux, macOS (BSD syscall ABI) and
//! bare-metal bootable kernel images, and extracts inline C regions for a companion C compiler.
//!
//! The pipeline is four sequential stages with no grammar and no intermediate representation:
//! [`parser::tokenize`] → [`reducer::reduce`] → [`codegen::generate`] per statement →
//! [`driver::compile`] for the whole program. A [`TargetConfig`] (immutable) and a
//! [`ProgramState`] (mutated statement by statement) are threaded through every stage; the first
//! error aborts the compilation with no partial output.

#[cfg(feature = "binaries")] pub mod cli;
pub mod codegen;
pub mod driver;
mod error;
pub mod inline_c;
pub mod parser;
pub mod program;
pub mod reducer;
pub mod registers;
pub mod target;
#[cfg(test)] mod test;

pub use driver::{CompiledProgram, compile};
pub use error::{CompileError, SourceFile};
pub use program::ProgramState;
pub use target::{PlatformBits, TargetConfig};

/// Provides a name for enum variants.
pub trait VariantName {
	/// Returns the name of this variant.
	fn variant_name(&self) -> &'static str;
}

/// Compile a single BTS file.
/// # Errors
/// If the file can not be read, or any compilation stage fails.
pub fn compile_file(
	file_name: &str,
	config: &TargetConfig,
	component: bool,
) -> Result<CompiledProgram, CompileError> {
	let source = SourceFile::from_file(file_name).map_err(|os_error| CompileError::FileNotFound {
		os_error,
		file_name: file_name.to_owned(),
	})?;
	compile(&source, config, component)
}
