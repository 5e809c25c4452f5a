use proc_macro::TokenStream;
use syn::{DeriveInput, GenericParam, Generics, parse_macro_input, parse_quote};

mod attrs;
mod record;
mod union;

use record::Kind;

/// Derive macro for records with generated conversion methods.
///
/// Implements `Record`, `Field` and `Datamodel` for a struct with named
/// fields. The engine introspects the struct once, on first conversion.
///
/// # Example
///
/// ```ignore
/// #[derive(Datamodel)]
/// #[datamodel(frozen = false)]
/// pub struct Simple {
///     pub x: i64,
///
///     #[field(default)]
///     pub y: Vec<String>,
///
///     #[field(default = "default_tags", init = false)]
///     pub tags: Vec<String>,
/// }
/// ```
///
/// Container options: `name = "..."` (signature name), and `init`, `repr`,
/// `eq`, `order`, `unsafe_hash`, `frozen` (bare key means `true`).
/// Field options: `default`, `default = "path"`, `init = false`.
#[proc_macro_derive(Datamodel, attributes(datamodel, field))]
pub fn derive_datamodel(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match record::derive_impl(&input, Kind::Datamodel) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derive macro for plain records: convertible as a field of a datamodel,
/// with no methods and no cached plan of their own.
#[proc_macro_derive(Record, attributes(datamodel, field))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match record::derive_impl(&input, Kind::Plain) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derive macro for union types: an enum of single-field tuple variants.
///
/// ```ignore
/// #[derive(Union)]
/// enum IntOrStr {
///     Int(i64),
///     Str(String),
/// }
/// ```
#[proc_macro_derive(Union, attributes(datamodel))]
pub fn derive_union(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match union::derive_union(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derive macro for opaque newtypes converted only through registered hooks.
#[proc_macro_derive(Custom, attributes(datamodel))]
pub fn derive_custom(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match union::derive_custom(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Add `Field + 'static` to every type parameter. Lifetimes and const
/// generics are rejected.
fn bounded_generics(generics: &Generics) -> Result<Generics, syn::Error> {
    let mut generics = generics.clone();
    for param in &mut generics.params {
        match param {
            GenericParam::Type(t) => {
                t.bounds.push(parse_quote!(datamodel::Field));
                t.bounds.push(parse_quote!('static));
            }
            GenericParam::Lifetime(l) => {
                return Err(syn::Error::new_spanned(l, "lifetime parameters are not supported"));
            }
            GenericParam::Const(c) => {
                return Err(syn::Error::new_spanned(c, "const generics are not supported"));
            }
        }
    }
    Ok(generics)
}
