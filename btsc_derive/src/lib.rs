//! Derive macros for btsc.

use proc_macro::TokenStream;
use quote::{ToTokens, quote};

/// Derives `btsc::parser::Parse` for a fieldless enum: each variant is matched by its lowercase
/// name.
#[proc_macro_derive(Parse)]
pub fn parse_macro_derive(input: TokenStream) -> TokenStream {
	let type_ = syn::parse::<syn::DeriveInput>(input).unwrap();

	match type_.data {
		syn::Data::Enum(enum_) => {
			let name = type_.ident;
			let name_string = format!("{name}").to_lowercase();
			let variant_identifiers_and_strings = enum_
				.variants
				.iter()
				.map(|variant| match variant.fields {
					syn::Fields::Unit => (variant.ident.clone(), format!("{}", variant.ident).to_lowercase()),
					_ => panic!(
						"Parse cannot be derived for enums containing non-unit variants; variant {} is not a unit.",
						variant.to_token_stream()
					),
				})
				.collect::<Vec<(syn::Ident, String)>>();
			let variant_identifiers = variant_identifiers_and_strings.iter().map(|(identifier, _)| identifier);
			let variant_strings = variant_identifiers_and_strings.iter().map(|(_, string)| string);

			quote! {
				#[automatically_derived]
				#[allow(missing_docs)]
				impl crate::parser::Parse for #name {
					fn parse(value: &str, line: u32, src: std::sync::Arc<SourceFile>) -> Result<Self, CompileError> {
						Ok(match value {
							#( #variant_strings => Self::#variant_identifiers, )*
							_ => return Err(CompileError::InvalidConstant {
								constant: value.to_owned(),
								typename: #name_string.to_owned(),
								location: src.line_span(line),
								src,
							}),
						})
					}
				}
			}
			.into()
		},
		_ => panic!("Parse cannot be derived for non-enum types."),
	}
}

/// Derives `btsc::VariantName` for a fieldless enum, returning the lowercase variant name. For the
/// keyword and builtin enums this is exactly the source spelling of the word.
#[proc_macro_derive(VariantName)]
pub fn variant_name_macro_derive(input: TokenStream) -> TokenStream {
	let type_ = syn::parse::<syn::DeriveInput>(input).unwrap();

	match type_.data {
		syn::Data::Enum(enum_) => {
			let name = type_.ident;
			let arms = enum_.variants.iter().map(|variant| {
				let identifier = &variant.ident;
				let string = format!("{identifier}").to_lowercase();
				quote! { Self::#identifier => #string, }
			});

			quote! {
				#[automatically_derived]
				#[allow(missing_docs)]
				impl crate::VariantName for #name {
					fn variant_name(&self) -> &'static str {
						match self {
							#( #arms )*
						}
					}
				}
			}
			.into()
		},
		_ => panic!("VariantName cannot be derived for non-enum types."),
	}
}
