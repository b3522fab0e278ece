use darling::{ast, FromDeriveInput, FromField};
use proc_macro2::TokenTree;
use quote::{format_ident, quote, ToTokens};
use syn::{punctuated::Punctuated, Meta, Token};

/// Derives that only make sense on the stored row, never on request input.
const ROW_ONLY_DERIVES: &[&str] = &["FromRow"];

#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named), forward_attrs)]
struct ModelInputReceiver {
	ident: syn::Ident,

	generics: syn::Generics,

	data: ast::Data<(), ModelFieldReceiver>,

	attrs: Vec<syn::Attribute>,
}

#[derive(Debug, FromField)]
#[darling(forward_attrs)]
struct ModelFieldReceiver {
	ident: Option<syn::Ident>,

	ty: syn::Type,
	vis: syn::Visibility,

	attrs: Vec<syn::Attribute>,
}

pub fn from_input(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
	let input = syn::parse_macro_input!(input as syn::DeriveInput);
	let receiver = match ModelInputReceiver::from_derive_input(&input) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	let ident = &receiver.ident;
	let vis = &input.vis;
	let generics = &receiver.generics;
	let create_ident = format_ident!("Create{}Input", ident);
	let update_ident = format_ident!("Update{}Input", ident);

	let attrs = match input_attrs(&receiver.attrs) {
		Ok(x) => x,
		Err(e) => return e.into_compile_error().into(),
	};

	let Some(fields) = receiver.data.take_struct() else {
		return syn::Error::new_spanned(ident, "#[model] only supports structs")
			.into_compile_error()
			.into();
	};

	// Fields with #[serde(skip_deserializing)] or #[serde(skip)] are set by the server
	let fields = fields
		.iter()
		.filter_map(|field| {
			let ident = field.ident.as_ref()?;

			if field.attrs.iter().any(is_server_set) {
				return None;
			}

			Some((&field.attrs, ident, &field.ty, &field.vis))
		})
		.collect::<Vec<_>>();

	let create_fields = fields.iter().map(|(attrs, ident, ty, vis)| {
		quote! {
			#(#attrs)*
			#vis #ident: #ty,
		}
	});

	let update_fields = fields.iter().map(|(attrs, ident, ty, vis)| {
		quote! {
			#(#attrs)*
			#vis #ident: Option<#ty>,
		}
	});

	quote! {
		#input

		#(#attrs)*
		#vis struct #create_ident #generics {
			#(
				#create_fields
			)*
		}

		#(#attrs)*
		#vis struct #update_ident #generics {
			#(
				#update_fields
			)*
		}
	}
	.into()
}

fn is_server_set(attr: &syn::Attribute) -> bool {
	let Meta::List(ref list) = attr.meta else {
		return false;
	};

	if !list.path.is_ident("serde") {
		return false;
	}

	list.tokens.to_token_stream().into_iter().any(|token| {
		matches!(token, TokenTree::Ident(ref ident) if ident == "skip_deserializing" || ident == "skip")
	})
}

/// Forwards the model's attributes to the input structs, minus the
/// derives listed in [`ROW_ONLY_DERIVES`].
fn input_attrs(attrs: &[syn::Attribute]) -> syn::Result<Vec<syn::Attribute>> {
	let mut forwarded = Vec::with_capacity(attrs.len());

	for attr in attrs {
		if !attr.path().is_ident("derive") {
			forwarded.push(attr.clone());
			continue;
		}

		let derives = attr
			.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)?
			.into_iter()
			.filter(|path| {
				path.segments
					.last()
					.map_or(true, |segment| !ROW_ONLY_DERIVES.iter().any(|d| segment.ident == d))
			})
			.collect::<Vec<_>>();

		if !derives.is_empty() {
			forwarded.push(syn::parse_quote!(#[derive(#(#derives),*)]));
		}
	}

	Ok(forwarded)
}
