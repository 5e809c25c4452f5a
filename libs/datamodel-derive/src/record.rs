use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, GenericParam};

use crate::attrs::{FieldDefault, container_attrs, field_attrs};

#[derive(Clone, Copy)]
pub(crate) enum Kind {
    Datamodel,
    Plain,
}

pub(crate) fn derive_impl(input: &DeriveInput, kind: Kind) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;
    let macro_name = match kind {
        Kind::Datamodel => "Datamodel",
        Kind::Plain => "Record",
    };

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    format!("{macro_name} only supports structs with named fields"),
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                format!("{macro_name} only supports structs"),
            ));
        }
    };

    let attrs = container_attrs(&input.attrs)?;
    let record_name = attrs.name.unwrap_or_else(|| name.to_string());
    let option_names = attrs.options.iter().map(|(k, _)| k);
    let option_values = attrs.options.iter().map(|(_, v)| v);

    let generics = crate::bounded_generics(&input.generics)?;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let type_params: Vec<_> = input
        .generics
        .params
        .iter()
        .filter_map(|p| match p {
            GenericParam::Type(t) => Some(&t.ident),
            _ => None,
        })
        .collect();

    let mut field_decls = Vec::new();
    let mut pack = Vec::new();
    let mut unpack = Vec::new();

    for field in fields {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let field_name_str = field_name.to_string();
        let field_ty = &field.ty;
        let field_attrs = field_attrs(&field.attrs)?;

        let default = match &field_attrs.default {
            FieldDefault::None => {
                if !field_attrs.init {
                    return Err(syn::Error::new_spanned(
                        field_name,
                        "`init = false` requires `#[field(default)]` or `#[field(default = \"...\")]`",
                    ));
                }
                quote! { None }
            }
            FieldDefault::Trait => quote! {
                Some((|| <#field_ty as datamodel::Field>::to_field_value(
                    &<#field_ty as ::core::default::Default>::default()
                )) as fn() -> datamodel::FieldValue)
            },
            FieldDefault::Path(path) => quote! {
                Some((|| <#field_ty as datamodel::Field>::to_field_value(&#path()))
                    as fn() -> datamodel::FieldValue)
            },
        };
        let init = field_attrs.init;

        field_decls.push(quote! {
            datamodel::schema::FieldDecl {
                name: #field_name_str,
                descriptor: <#field_ty as datamodel::Field>::descriptor(),
                default: #default,
                init: #init,
            }
        });
        pack.push(quote! {
            values.push(#field_name_str, <#field_ty as datamodel::Field>::to_field_value(&self.#field_name));
        });
        unpack.push(quote! {
            #field_name: values.take_as::<#field_ty>(#field_name_str)?,
        });
    }

    let field_count = field_decls.len();
    let kind_variant = match kind {
        Kind::Datamodel => quote! { datamodel::schema::RecordKind::Datamodel },
        Kind::Plain => quote! { datamodel::schema::RecordKind::Plain },
    };
    let datamodel_impl = match kind {
        Kind::Datamodel => quote! {
            impl #impl_generics datamodel::model::Datamodel for #name #ty_generics #where_clause {}
        },
        Kind::Plain => quote! {},
    };

    Ok(quote! {
        impl #impl_generics datamodel::model::Record for #name #ty_generics #where_clause {
            fn record_ref() -> datamodel::schema::RecordRef {
                datamodel::schema::RecordRef::new::<Self>(
                    #record_name,
                    #kind_variant,
                    vec![#(<#type_params as datamodel::Field>::descriptor()),*],
                    <Self as datamodel::model::Record>::declaration,
                )
            }

            fn declaration() -> datamodel::schema::RecordDeclaration {
                datamodel::schema::RecordDeclaration {
                    name: #record_name,
                    type_args: vec![#(<#type_params as datamodel::Field>::descriptor()),*],
                    options: datamodel::options::RecordOptions::new()
                        #(.with(#option_names, #option_values))*,
                    fields: vec![#(#field_decls),*],
                }
            }

            #[allow(unused_mut)]
            fn to_fields(&self) -> datamodel::record::RecordValues {
                let mut values = datamodel::record::RecordValues::with_capacity(#field_count);
                #(#pack)*
                values
            }

            #[allow(unused_mut, unused_variables)]
            fn from_fields(
                mut values: datamodel::record::RecordValues,
            ) -> ::core::result::Result<Self, datamodel::ConvertError> {
                Ok(Self {
                    #(#unpack)*
                })
            }
        }

        impl #impl_generics datamodel::Field for #name #ty_generics #where_clause {
            fn descriptor() -> datamodel::TypeDescriptor {
                datamodel::TypeDescriptor::NestedRecord(
                    <Self as datamodel::model::Record>::record_ref(),
                )
            }

            fn to_field_value(&self) -> datamodel::FieldValue {
                datamodel::FieldValue::Record(<Self as datamodel::model::Record>::to_fields(self))
            }

            fn from_field_value(
                value: datamodel::FieldValue,
            ) -> ::core::result::Result<Self, datamodel::ConvertError> {
                datamodel::model::record_from_field_value(value)
            }
        }

        #datamodel_impl
    })
}
