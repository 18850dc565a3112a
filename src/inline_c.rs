//! Inline C extraction.
//!
//! A line-oriented filter over the raw source, independent of the token stream: the tokenizer
//! skips `inline_c ... end` and `void ... }` regions, and this filter collects them into a C
//! source string for a companion C compiler.

use crate::parser::language::remove_comments;

/// Retrieve the C code between `inline_c ... end` (delimiters excluded) and `void ... }`
/// (delimiters included), with one detected level of leading indentation stripped.
#[must_use]
pub fn extract_inline_c(code: &str) -> String {
	let mut c_lines = String::new();
	let mut in_inline_c_block = false;
	let mut in_void_block = false;
	// How many columns of leading whitespace to strip, detected from the first indented line.
	let mut whitespace: Option<usize> = None;

	for line in code.split('\n') {
		let mut first_word = remove_comments(line).trim();
		if let Some(position) = first_word.find(' ') {
			first_word = &first_word[.. position];
		}
		if !in_void_block && !in_inline_c_block && first_word == "inline_c" {
			log::debug!("found {first_word}, starting inline_c block");
			in_inline_c_block = true;
			continue;
		} else if !in_inline_c_block && !in_void_block && first_word == "void" {
			log::debug!("found {first_word}, starting void block");
			// "void" itself is part of the C code.
			in_void_block = true;
		} else if !in_void_block && in_inline_c_block && first_word == "end" {
			log::debug!("found {first_word}, ending inline_c block");
			in_inline_c_block = false;
			continue;
		} else if !in_inline_c_block && in_void_block && first_word == "}" {
			log::debug!("found {first_word}, ending void block");
			// "}" itself is part of the C code.
			in_void_block = false;
		}

		if !in_inline_c_block && !in_void_block && first_word != "}" {
			continue;
		}

		let strip = *whitespace.get_or_insert_with(|| {
			if line.starts_with("    ") {
				4
			} else if line.starts_with('\t') {
				1
			} else if line.starts_with("  ") {
				2
			} else {
				0
			}
		});
		// Strip the indentation, but only if nothing else would be lost.
		if line.len() >= strip && line.trim() == line[strip ..].trim() {
			c_lines += &line[strip ..];
		} else {
			c_lines += line;
		}
		c_lines.push('\n');
	}
	c_lines
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn inline_c_blocks_drop_their_delimiters() {
		let source = "const x = 2\ninline_c\nint f() { return 1; }\nend\nret";
		let extracted = extract_inline_c(source);
		assert_eq!(extracted, "int f() { return 1; }\n");
	}

	#[test]
	fn void_blocks_keep_their_delimiters() {
		let source = "void main() {\n\tputs(\"hi\");\n}";
		let extracted = extract_inline_c(source);
		assert!(extracted.starts_with("void main() {"));
		assert!(extracted.ends_with("}\n"));
	}

	#[test]
	fn no_c_means_empty_output() {
		assert_eq!(extract_inline_c("fun main\nret\nend"), "");
	}
}
