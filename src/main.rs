//! The btsc command line compiler.

use std::path::PathBuf;

use btsc::cli::BtscCli;
use btsc::{SourceFile, TargetConfig, compile};
use clap::Parser;
use miette::IntoDiagnostic;

fn main() -> miette::Result<()> {
	human_panic::setup_panic!();
	env_logger::init();

	let arguments = BtscCli::parse();
	let config = TargetConfig::new(arguments.bits, arguments.osx, arguments.bootable)?;

	let input = arguments.input.to_string_lossy().to_string();
	let source = SourceFile::from_file(&input).into_diagnostic()?;
	let program = compile(&source, &config, arguments.component)?;

	let assembly_file = arguments.output.unwrap_or_else(|| PathBuf::from(format!("{input}.asm")));
	std::fs::write(&assembly_file, &program.assembly).into_diagnostic()?;
	log::info!("Wrote {} ({} bytes)", assembly_file.display(), program.assembly.len());

	if !program.inline_c.is_empty() {
		let c_file = arguments.output_c.unwrap_or_else(|| PathBuf::from(format!("{input}.c")));
		let c_data = format!("// Generated with btsc {}\n\n{}", env!("CARGO_PKG_VERSION"), program.inline_c);
		std::fs::write(&c_file, c_data).into_diagnostic()?;
		log::info!("Wrote {}", c_file.display());
	}
	Ok(())
}
