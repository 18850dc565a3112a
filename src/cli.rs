//! Command-line interface related structures.

use std::path::PathBuf;

use clap::Parser;

/// BTS compiler: lowers BTS source code to x86 assembly text.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct BtscCli {
	/// BTS source file to compile.
	#[clap(value_parser)]
	pub input: PathBuf,

	/// Assembly output file. Defaults to the input file name with `.asm` appended.
	#[clap(value_parser, long, short = 'o')]
	pub output: Option<PathBuf>,

	/// C output file for inline C regions. Defaults to the input file name with `.c` appended.
	#[clap(value_parser, long)]
	pub output_c: Option<PathBuf>,

	/// Output 64-bit, 32-bit or 16-bit x86 assembly.
	#[clap(value_parser, default_value_t = 64, long, short = 'b')]
	pub bits: u8,

	/// Target Darwin / OS X / macOS (BSD system call conventions).
	#[clap(long)]
	pub osx: bool,

	/// Build a bootable kernel instead of an executable.
	#[clap(long)]
	pub bootable: bool,

	/// Component, not a standalone program: skip entry point synthesis, only the object file is
	/// wanted.
	#[clap(long, short = 'c')]
	pub component: bool,
}
