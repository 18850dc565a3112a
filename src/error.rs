//! Error types and source code handling.

use std::path::PathBuf;
use std::sync::Arc;

use miette::{Diagnostic, MietteError, MietteSpanContents, SourceCode, SourceSpan, SpanContents};
use thiserror::Error;

/// The BTS source code a compilation runs over.
///
/// Tokens only remember their statement (line) number, so spans handed to diagnostics always cover
/// a whole source line; [`Self::line_span`] performs that conversion.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SourceFile {
	pub(crate) text: String,
	pub(crate) name: PathBuf,
}

impl SourceFile {
	/// Create a new source file struct by loading a file's contents.
	/// # Errors
	/// If reading the file fails (doesn't exist, permissions wrong, I/O error etc.)
	pub fn from_file(filename: &str) -> Result<Arc<Self>, std::io::Error> {
		let path = PathBuf::from(filename);
		let contents = std::fs::read_to_string(&path)?;
		Ok(Arc::new(Self { name: path, text: contents }))
	}

	/// Create a source file from in-memory text, e.g. for tests or re-tokenization.
	#[must_use]
	pub fn from_source(text: &str) -> Arc<Self> {
		Arc::new(Self { name: PathBuf::from("<source>"), text: text.to_owned() })
	}

	/// Returns a copy of the file name of this source code.
	#[must_use]
	pub fn file_name(&self) -> String {
		self.name.as_os_str().to_string_lossy().to_string()
	}

	/// Returns the span of the given zero-based source line, for attaching diagnostics to tokens
	/// that only carry a line number.
	#[must_use]
	pub fn line_span(&self, line: u32) -> SourceSpan {
		let mut offset = 0usize;
		for (index, text_line) in self.text.split('\n').enumerate() {
			if index == line as usize {
				return (offset, text_line.len()).into();
			}
			offset += text_line.len() + 1;
		}
		(self.text.len().saturating_sub(1), 0).into()
	}
}

impl SourceCode for SourceFile {
	fn read_span<'a>(
		&'a self,
		span: &SourceSpan,
		context_lines_before: usize,
		context_lines_after: usize,
	) -> Result<Box<dyn SpanContents<'a> + 'a>, MietteError> {
		let result = self.text.read_span(span, context_lines_before, context_lines_after)?;
		let retval = Box::new(MietteSpanContents::new_named(
			self.file_name(),
			result.data(),
			*result.span(),
			result.line(),
			result.column(),
			result.line_count(),
		));
		Ok(retval)
	}
}

/// All types of errors that the compiler can report to the user.
///
/// Every error is fatal: compilation stops at the first one and no partial assembly is emitted.
#[derive(Error, Debug, Diagnostic)]
#[allow(clippy::module_name_repetitions, missing_docs)]
pub enum CompileError {
	#[error("File \"{file_name}\" was not found")]
	#[diagnostic(code(btsc::file_not_found), severity(Error))]
	FileNotFound {
		#[source]
		os_error:  std::io::Error,
		file_name: String,
	},

	//#region Lexical errors: detected while tokenizing
	#[error("Unrecognized token `{word}`")]
	#[diagnostic(
		code(btsc::unrecognized_token),
		severity(Error),
		help("This word matches no register, operator, keyword, builtin or name rule.")
	)]
	UnrecognizedToken {
		word:     String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this statement")]
		location: SourceSpan,
	},

	#[error("Unrecognized segment:offset token `{word}`")]
	#[diagnostic(
		code(btsc::unrecognized_segment_offset),
		severity(Error),
		help("Both sides of the `:` must be register names, like `es:di`.")
	)]
	UnrecognizedSegmentOffset {
		word:     String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this statement")]
		location: SourceSpan,
	},

	#[error("Invalid {typename} `{constant}`")]
	#[diagnostic(code(btsc::invalid_constant), severity(Error))]
	InvalidConstant {
		constant: String,
		typename: String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("Used here")]
		location: SourceSpan,
	},
	//#endregion

	//#region Semantic errors: undefined or re-defined names, nesting violations, bad declarations
	#[error("`{name}` is unfamiliar")]
	#[diagnostic(
		code(btsc::undefined_name),
		severity(Error),
		help("Declare the name first, with `fun`, `const`, `var` or `extern`.")
	)]
	UndefinedName {
		name:     String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("Used here")]
		location: SourceSpan,
	},

	#[error("Can not declare `{name}`, name is already defined")]
	#[diagnostic(code(btsc::redeclaration), severity(Error))]
	Redeclaration {
		name:     String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("Declared again here")]
		location: SourceSpan,
	},

	#[error("`{name}` is not a valid name for a {role}")]
	#[diagnostic(code(btsc::invalid_name), severity(Error))]
	InvalidName {
		name:     String,
		role:     &'static str,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("Declared here")]
		location: SourceSpan,
	},

	#[error("Already in a function named `{existing}` when declaring function `{function}`")]
	#[diagnostic(
		code(btsc::nested_function),
		severity(Error),
		help("Missing `ret` or `end`? Function definitions can not be nested.")
	)]
	NestedFunction {
		function: String,
		existing: String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("Second function opened here")]
		location: SourceSpan,
	},

	#[error("Already in an if-block")]
	#[diagnostic(code(btsc::nested_if), severity(Error), help("Nested if-blocks are not supported."))]
	NestedIfBlock {
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("Second if-block opened here")]
		location: SourceSpan,
	},

	#[error("Already in a loop")]
	#[diagnostic(code(btsc::nested_loop), severity(Error), help("Nested loops are not supported."))]
	NestedLoop {
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("Second loop opened here")]
		location: SourceSpan,
	},

	#[error("Unhandled register: `{register}`")]
	#[diagnostic(code(btsc::unhandled_register), severity(Error))]
	UnhandledRegister {
		register: String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this call")]
		location: SourceSpan,
	},

	#[error("Too many parameters for interrupt call")]
	#[diagnostic(code(btsc::too_many_parameters), severity(Error))]
	TooManyParameters {
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this call")]
		location: SourceSpan,
	},

	#[error("Invalid variable declaration")]
	#[diagnostic(
		code(btsc::invalid_variable),
		severity(Error),
		help("Variable statements are on the form `var x 1024`, for reserving 1024 bytes as x.")
	)]
	InvalidVariableDeclaration {
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this statement")]
		location: SourceSpan,
	},

	#[error("Invalid constant declaration")]
	#[diagnostic(
		code(btsc::invalid_declaration),
		severity(Error),
		help("Constant statements are on the form `const name = value, ...`.")
	)]
	InvalidConstantDeclaration {
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this statement")]
		location: SourceSpan,
	},

	#[error("print can only print const strings, not immediate strings")]
	#[diagnostic(code(btsc::print_of_string_literal), severity(Error))]
	PrintOfStringLiteral {
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("String literal passed here")]
		location: SourceSpan,
	},

	#[error("{feature} is not implemented")]
	#[diagnostic(code(btsc::unsupported), severity(Error))]
	Unsupported {
		feature:  String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("Used here")]
		location: SourceSpan,
	},

	#[error("`{name}` is not recognized as a register (and there is no const qualifier), can not assign")]
	#[diagnostic(code(btsc::not_a_register), severity(Error))]
	NotARegister {
		name:     String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("Assigned here")]
		location: SourceSpan,
	},

	#[error("Unclear which loop to {operation}")]
	#[diagnostic(code(btsc::not_in_loop), severity(Error))]
	NotInLoop {
		operation: &'static str,
		#[source_code]
		src:       Arc<SourceFile>,
		#[label("Outside of any loop")]
		location:  SourceSpan,
	},

	#[error("Not in a function or block of inline C, hard to tell what should be ended with `end`")]
	#[diagnostic(code(btsc::stray_end), severity(Error))]
	StrayEnd {
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("This `end`")]
		location: SourceSpan,
	},

	#[error("Can not pop and push to stack at the same time")]
	#[diagnostic(code(btsc::invalid_stack_expression), severity(Error))]
	InvalidStackExpression {
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this statement")]
		location: SourceSpan,
	},

	#[error("Need a (hexadecimal) interrupt number to call, not `{value}`")]
	#[diagnostic(code(btsc::invalid_interrupt_number), severity(Error))]
	InvalidInterruptNumber {
		value:    String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this call")]
		location: SourceSpan,
	},

	#[error("Invalid offset for `{word}`: `{value}`{}", if *.too_high { " (too high)" } else { "" })]
	#[diagnostic(code(btsc::invalid_offset), severity(Error))]
	InvalidOffset {
		word:     String,
		value:    String,
		too_high: bool,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this statement")]
		location: SourceSpan,
	},

	#[error("Can only handle `funparam` and `sysparam` reserved words")]
	#[diagnostic(code(btsc::unsupported_reserved_word), severity(Error))]
	UnsupportedReservedWord {
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this statement")]
		location: SourceSpan,
	},

	#[error("`{value}` is not a valid platform bit size (like 32 or 64)")]
	#[diagnostic(code(btsc::invalid_asm_bits), severity(Error))]
	InvalidAsmBits {
		value:    String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this asm statement")]
		location: SourceSpan,
	},

	#[error("`address` takes a segment:offset value, not `{value}`")]
	#[diagnostic(code(btsc::invalid_address), severity(Error))]
	InvalidAddress {
		value:    String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this statement")]
		location: SourceSpan,
	},

	#[error("Unable to tell if `{value}` is a word or a byte")]
	#[diagnostic(code(btsc::ambiguous_width), severity(Error))]
	AmbiguousWidth {
		value:    String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this statement")]
		location: SourceSpan,
	},

	#[error("Unimplemented: the `{keyword}` keyword for {bits} bit platforms")]
	#[diagnostic(code(btsc::unimplemented_keyword), severity(Error))]
	UnimplementedKeyword {
		keyword:  String,
		bits:     u8,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("Used here")]
		location: SourceSpan,
	},

	#[error("Calling an invalid name: `{name}`")]
	#[diagnostic(code(btsc::invalid_call), severity(Error))]
	InvalidCall {
		name:     String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("Called here")]
		location: SourceSpan,
	},

	#[error("Empty program")]
	#[diagnostic(code(btsc::empty_program), severity(Error))]
	EmptyProgram {
		#[source_code]
		src: Arc<SourceFile>,
	},

	#[error("Unsupported bit size: {bits}")]
	#[diagnostic(code(btsc::unsupported_bit_size), severity(Error), help("Supported bit sizes are 16, 32 and 64."))]
	UnsupportedBitSize { bits: u8 },
	//#endregion

	//#region Shape errors: statements that match no generation rule
	#[error("Unfamiliar statement layout: {statement}")]
	#[diagnostic(code(btsc::unfamiliar_statement), severity(Error))]
	UnfamiliarStatement {
		statement: String,
		#[source_code]
		src:       Arc<SourceFile>,
		#[label("This statement")]
		location:  SourceSpan,
	},

	#[error("Unhandled builtin: `{builtin}`")]
	#[diagnostic(code(btsc::unhandled_builtin), severity(Error))]
	UnhandledBuiltin {
		builtin:  String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("This statement")]
		location: SourceSpan,
	},

	#[error("Unhandled keyword: `{keyword}`")]
	#[diagnostic(code(btsc::unhandled_keyword), severity(Error))]
	UnhandledKeyword {
		keyword:  String,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("This statement")]
		location: SourceSpan,
	},

	#[error("Unrecognized length of assembly expression: {length}")]
	#[diagnostic(code(btsc::invalid_asm_expression), severity(Error))]
	InvalidAsmExpression {
		length:   usize,
		#[source_code]
		src:      Arc<SourceFile>,
		#[label("In this asm statement")]
		location: SourceSpan,
	},
	//#endregion
}
