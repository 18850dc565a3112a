//! Compile-time program state.

use std::collections::HashMap;
use std::sync::Arc;

use flexstr::{SharedStr, ToSharedStr};

use crate::error::{CompileError, SourceFile};

/// Label prefix for the types of loops that do not save and restore the counter before and after
/// the loop body.
pub const RAWLOOP_PREFIX: &str = "r_";
/// Label prefix for the types of loops that loop forever.
pub const ENDLESS_LOOP_PREFIX: &str = "e_";

/// The state of the current position in a program while compiling.
///
/// One instance exists per compilation. It is mutated statement by statement during generation and
/// must only ever be threaded sequentially; later statements depend on state mutated by earlier
/// ones, and label numbering must match source order exactly for reproducible output.
#[derive(Debug, Default)]
pub struct ProgramState {
	/// Keeps track of function blocks that are ended with `exit`, so a following stray `end` is
	/// tolerated.
	pub surprise_ending_with_exit: bool,
	/// The last data width set by the `value` keyword (in bytes); decides whether `write` and
	/// `loopwrite` use `stosb` or `stosw` on 16-bit targets.
	pub loop_step: u8,
	/// All defined variable/constant/function/extern names, in declaration order.
	pub defined_names: Vec<SharedStr>,
	/// Map of variable names to reserved byte counts, populated by `var` declarations. Presence
	/// here marks a name as bss-backed.
	pub variables: HashMap<SharedStr, usize>,
	/// Constants that are data rather than values (`x: db 1, 2, 3, ...`); their symbol denotes an
	/// address.
	pub data_constants: Vec<SharedStr>,
	/// The name of the function we are currently in; empty when at the top level.
	pub in_function: SharedStr,
	/// The label of the loop we are currently in; empty outside of loops.
	pub in_loop: SharedStr,
	/// The label of the if-block we are currently in; empty outside of if-blocks.
	pub in_if_block: SharedStr,
	/// Whether the program ends in an endless loop instead of returning.
	pub endless: bool,
	/// Whether this compilation produces a bootable kernel. Seeded from the target configuration
	/// and also set by the `bootable` keyword.
	pub bootable_kernel: bool,
	loop_name_counter: u32,
	if_name_counter:   u32,
}

impl ProgramState {
	/// Create the state for a fresh compilation.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Allocate the next loop label name.
	pub fn new_loop_label(&mut self) -> SharedStr {
		self.loop_name_counter += 1;
		format!("l{}", self.loop_name_counter).to_shared_str()
	}

	/// Allocate the next if-block label name.
	pub fn new_if_label(&mut self) -> SharedStr {
		self.if_name_counter += 1;
		format!("if{}", self.if_name_counter).to_shared_str()
	}

	/// Whether the given name has been declared.
	#[must_use]
	pub fn is_defined(&self, name: &str) -> bool {
		self.defined_names.iter().any(|defined| defined == name)
	}

	/// Declare a name, rejecting redeclaration.
	/// # Errors
	/// If the name is already defined.
	pub fn define(&mut self, name: &SharedStr, src: &Arc<SourceFile>, line: u32) -> Result<(), CompileError> {
		if self.is_defined(name) {
			return Err(CompileError::Redeclaration {
				name:     name.to_string(),
				src:      src.clone(),
				location: src.line_span(line),
			});
		}
		self.defined_names.push(name.clone());
		Ok(())
	}
}
