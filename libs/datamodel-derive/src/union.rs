use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

use crate::attrs::container_attrs;

/// `#[derive(Union)]`: an enum whose variants each wrap one field type.
/// Arms are tried in declaration order.
pub(crate) fn derive_union(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;
    let name_str = name.to_string();

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(name, "Union only supports enums"));
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(name, "Union needs at least one variant"));
    }
    let attrs = container_attrs(&input.attrs)?;
    if attrs.name.is_some() || !attrs.options.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "Union takes no #[datamodel(...)] options; its signature is built from its arms",
        ));
    }

    let generics = crate::bounded_generics(&input.generics)?;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut arm_types = Vec::new();
    let mut to_arms = Vec::new();
    let mut from_arms = Vec::new();

    for (index, variant) in data.variants.iter().enumerate() {
        let ident = &variant.ident;
        let ty = match &variant.fields {
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => &fields.unnamed[0].ty,
            _ => {
                return Err(syn::Error::new_spanned(
                    variant,
                    "Union variants must wrap exactly one field, e.g. `Int(i64)`",
                ));
            }
        };
        arm_types.push(ty);
        to_arms.push(quote! {
            Self::#ident(inner) => datamodel::FieldValue::Variant {
                index: #index,
                value: ::std::boxed::Box::new(<#ty as datamodel::Field>::to_field_value(inner)),
            },
        });
        from_arms.push(quote! {
            datamodel::FieldValue::Variant { index: #index, value } => {
                <#ty as datamodel::Field>::from_field_value(*value).map(Self::#ident)
            }
        });
    }

    Ok(quote! {
        impl #impl_generics datamodel::Field for #name #ty_generics #where_clause {
            fn descriptor() -> datamodel::TypeDescriptor {
                datamodel::TypeDescriptor::Union(vec![
                    #(<#arm_types as datamodel::Field>::descriptor()),*
                ])
            }

            fn to_field_value(&self) -> datamodel::FieldValue {
                match self {
                    #(#to_arms)*
                }
            }

            fn from_field_value(
                value: datamodel::FieldValue,
            ) -> ::core::result::Result<Self, datamodel::ConvertError> {
                match value {
                    #(#from_arms)*
                    datamodel::FieldValue::Variant { index, .. } => Err(datamodel::ConvertError::union(
                        format!("`{}` has no arm {}", #name_str, index),
                    )),
                    other => Err(datamodel::ConvertError::shape(
                        format!("expected union value, found {}", other.kind_name()),
                    )),
                }
            }
        }
    })
}

/// `#[derive(Custom)]`: a newtype converted only through hooks registered
/// under its name.
pub(crate) fn derive_custom(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;

    let inner = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => &fields.unnamed[0].ty,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Custom only supports single-field tuple structs",
                ));
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Custom only supports structs")),
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Custom types cannot be generic",
        ));
    }
    let attrs = container_attrs(&input.attrs)?;
    if !attrs.options.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "Custom only accepts #[datamodel(name = \"...\")]",
        ));
    }
    let type_name = attrs.name.unwrap_or_else(|| name.to_string());

    Ok(quote! {
        impl datamodel::Field for #name {
            fn descriptor() -> datamodel::TypeDescriptor {
                datamodel::TypeDescriptor::Custom(#type_name)
            }

            fn to_field_value(&self) -> datamodel::FieldValue {
                <#inner as datamodel::Field>::to_field_value(&self.0)
            }

            fn from_field_value(
                value: datamodel::FieldValue,
            ) -> ::core::result::Result<Self, datamodel::ConvertError> {
                <#inner as datamodel::Field>::from_field_value(value).map(Self)
            }
        }
    })
}
