//! Procedural macros for rgcm component development
//!
//! This crate provides a derive macro that generates the declarations of a
//! component together with typed views of its inputs and results, so that
//! component code does not index maps with string literals.
//!
//! # Overview
//!
//! The `ComponentIO` derive reads four struct-level attributes, one per role:
//! `#[inputs(..)]`, `#[tendencies(..)]`, `#[diagnostics(..)]` and
//! `#[outputs(..)]`. Each lists entries of the form
//! `field { name = "...", unit = "..." }`. `name` defaults to the field name.
//!
//! # Example
//!
//! ```ignore
//! use rgcm_core::ComponentIO;
//!
//! #[derive(Debug, ComponentIO)]
//! #[inputs(
//!     temperature { name = "air_temperature", unit = "K" },
//! )]
//! #[tendencies(
//!     temperature { name = "air_temperature", unit = "K day^-1" },
//! )]
//! pub struct NewtonianCooling {
//!     pub timescale_days: f64,
//! }
//! ```
//!
//! This generates:
//! - `NewtonianCooling::generated_definitions()` returning the declarations
//! - `NewtonianCoolingInputs<'a>` with a `temperature: &'a ArrayD<f64>` field
//!   and a `from_input_state` constructor
//! - `NewtonianCoolingTendencies`, `NewtonianCoolingDiagnostics` and
//!   `NewtonianCoolingOutputs` with owned array fields, each convertible into
//!   an `OutputState`

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use std::collections::HashSet;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{braced, parse_macro_input, Data, DeriveInput, Expr, ExprLit, Ident, Lit, MetaNameValue, Token};

/// One declared quantity
struct IoEntry {
    rust_name: Ident,
    quantity_name: String,
    unit: String,
}

impl Parse for IoEntry {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let rust_name: Ident = input.parse()?;
        let content;
        braced!(content in input);
        let pairs = Punctuated::<MetaNameValue, Token![,]>::parse_terminated(&content)?;

        let mut quantity_name = None;
        let mut unit = None;
        for pair in pairs {
            let value = match &pair.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => s.value(),
                other => return Err(syn::Error::new_spanned(other, "expected a string literal")),
            };
            if pair.path.is_ident("name") {
                quantity_name = Some(value);
            } else if pair.path.is_ident("unit") {
                unit = Some(value);
            } else {
                return Err(syn::Error::new_spanned(
                    &pair.path,
                    "unknown key, expected `name` or `unit`",
                ));
            }
        }

        let unit = unit.ok_or_else(|| {
            syn::Error::new(rust_name.span(), format!("`{}` is missing a `unit`", rust_name))
        })?;
        Ok(Self {
            quantity_name: quantity_name.unwrap_or_else(|| rust_name.to_string()),
            rust_name,
            unit,
        })
    }
}

/// The four roles, in declaration order
const ROLES: [(&str, &str); 4] = [
    ("inputs", "input"),
    ("tendencies", "tendency"),
    ("diagnostics", "diagnostic"),
    ("outputs", "output"),
];

/// Parse every `#[<role>(..)]` attribute of the struct
fn extract_entries(input: &DeriveInput) -> syn::Result<Vec<Vec<IoEntry>>> {
    let mut groups: Vec<Vec<IoEntry>> = ROLES.iter().map(|_| Vec::new()).collect();
    for attr in &input.attrs {
        let Some(index) = ROLES.iter().position(|(role, _)| attr.path().is_ident(role)) else {
            continue;
        };
        let entries =
            attr.parse_args_with(Punctuated::<IoEntry, Token![,]>::parse_terminated)?;
        groups[index].extend(entries);
    }

    for (group, (role, _)) in groups.iter().zip(ROLES) {
        let mut seen = HashSet::new();
        for entry in group {
            if !seen.insert(entry.rust_name.to_string()) {
                return Err(syn::Error::new(
                    entry.rust_name.span(),
                    format!("`{}` appears twice in #[{}]", entry.rust_name, role),
                ));
            }
        }
    }
    Ok(groups)
}

/// Generate an owned result struct and its conversion into `OutputState`
fn result_struct(name: &Ident, entries: &[IoEntry]) -> TokenStream2 {
    let fields = entries.iter().map(|e| {
        let rust_name = &e.rust_name;
        quote! { pub #rust_name: ::rgcm_core::ndarray::ArrayD<::rgcm_core::FloatValue> }
    });
    let inserts = entries.iter().map(|e| {
        let rust_name = &e.rust_name;
        let quantity_name = &e.quantity_name;
        quote! { map.insert(#quantity_name.to_string(), value.#rust_name); }
    });
    let doc = format!(" Generated result struct `{}`", name);

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, Default)]
        pub struct #name {
            #(#fields,)*
        }

        impl From<#name> for ::rgcm_core::state::OutputState {
            #[allow(unused_mut, unused_variables)]
            fn from(value: #name) -> Self {
                let mut map = ::rgcm_core::state::OutputState::new();
                #(#inserts)*
                map
            }
        }
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !matches!(input.data, Data::Struct(_)) {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "ComponentIO can only be derived for structs",
        ));
    }
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let groups = extract_entries(input)?;

    let definitions = groups.iter().zip(ROLES).flat_map(|(group, (_, constructor))| {
        let constructor = format_ident!("{}", constructor);
        group.iter().map(move |e| {
            let quantity_name = &e.quantity_name;
            let unit = &e.unit;
            quote! {
                ::rgcm_core::component::RequirementDefinition::#constructor(#quantity_name, #unit)
            }
        })
    });

    let inputs_name = format_ident!("{}Inputs", struct_name);
    let input_fields = groups[0].iter().map(|e| {
        let rust_name = &e.rust_name;
        quote! { pub #rust_name: &'a ::rgcm_core::ndarray::ArrayD<::rgcm_core::FloatValue> }
    });
    let input_getters = groups[0].iter().map(|e| {
        let rust_name = &e.rust_name;
        let quantity_name = &e.quantity_name;
        quote! { #rust_name: input_state.get(#quantity_name)? }
    });
    let inputs_doc = format!(" Generated input view for `{}`", struct_name);

    let tendencies = result_struct(&format_ident!("{}Tendencies", struct_name), &groups[1]);
    let diagnostics = result_struct(&format_ident!("{}Diagnostics", struct_name), &groups[2]);
    let outputs = result_struct(&format_ident!("{}Outputs", struct_name), &groups[3]);

    Ok(quote! {
        #[doc = #inputs_doc]
        #[derive(Debug, Clone, Copy)]
        pub struct #inputs_name<'a> {
            #(#input_fields,)*
            #[doc(hidden)]
            pub _marker: ::std::marker::PhantomData<&'a ()>,
        }

        impl<'a> #inputs_name<'a> {
            /// Borrows every declared input from `input_state`.
            pub fn from_input_state(
                input_state: &'a ::rgcm_core::state::InputState<'_>,
            ) -> ::rgcm_core::errors::RGCMResult<Self> {
                Ok(Self {
                    #(#input_getters,)*
                    _marker: ::std::marker::PhantomData,
                })
            }
        }

        #tendencies
        #diagnostics
        #outputs

        impl #impl_generics #struct_name #ty_generics #where_clause {
            /// Returns the quantity declarations for this component
            pub fn generated_definitions() -> Vec<::rgcm_core::component::RequirementDefinition> {
                vec![
                    #(#definitions,)*
                ]
            }
        }
    })
}

/// Derive macro for generating component declarations and typed I/O structs
///
/// # Attributes
///
/// Struct-level, each optional and repeatable:
/// - `#[inputs(field { name = "...", unit = "..." }, ...)]`
/// - `#[tendencies(...)]`
/// - `#[diagnostics(...)]`
/// - `#[outputs(...)]`
///
/// # Generated Types
///
/// For a struct `Foo`, this macro generates:
/// - `FooInputs<'a>` borrowing the declared inputs
/// - `FooTendencies`, `FooDiagnostics` and `FooOutputs` owning their arrays
#[proc_macro_derive(ComponentIO, attributes(inputs, tendencies, diagnostics, outputs))]
pub fn derive_component_io(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}
