use syn::{Attribute, ExprPath, LitBool, LitStr, Token};

/// Declaration options accepted in `#[datamodel(...)]`.
const OPTIONS: &[&str] = &["init", "repr", "eq", "order", "unsafe_hash", "frozen"];

#[derive(Default)]
pub(crate) struct ContainerAttrs {
    /// `name = "..."` overrides the record/type name used in signatures.
    pub name: Option<String>,
    /// `frozen`, `frozen = false`, ... in declaration order.
    pub options: Vec<(String, bool)>,
}

/// Parse every `#[datamodel(...)]` attribute on the item.
pub(crate) fn container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut out = ContainerAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("datamodel") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                out.name = Some(value.value());
                return Ok(());
            }
            let Some(option) = OPTIONS.iter().find(|o| meta.path.is_ident(o)) else {
                return Err(meta.error(format!(
                    "unknown datamodel option (expected `name` or one of: {})",
                    OPTIONS.join(", ")
                )));
            };
            // A bare key means `true`.
            let value = if meta.input.peek(Token![=]) {
                let lit: LitBool = meta.value()?.parse()?;
                lit.value
            } else {
                true
            };
            out.options.retain(|(k, _)| k != option);
            out.options.push((option.to_string(), value));
            Ok(())
        })?;
    }
    Ok(out)
}

pub(crate) enum FieldDefault {
    None,
    /// `#[field(default)]`: `Default::default()` of the field type.
    Trait,
    /// `#[field(default = "path::to_fn")]`.
    Path(ExprPath),
}

pub(crate) struct FieldAttrs {
    pub default: FieldDefault,
    pub init: bool,
}

/// Parse every `#[field(...)]` attribute on a struct field.
pub(crate) fn field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs {
        default: FieldDefault::None,
        init: true,
    };
    for attr in attrs {
        if !attr.path().is_ident("field") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                out.default = if meta.input.peek(Token![=]) {
                    let value: LitStr = meta.value()?.parse()?;
                    FieldDefault::Path(value.parse()?)
                } else {
                    FieldDefault::Trait
                };
                Ok(())
            } else if meta.path.is_ident("init") {
                let value: LitBool = meta.value()?.parse()?;
                out.init = value.value;
                Ok(())
            } else {
                Err(meta.error("unknown field option (expected `default` or `init`)"))
            }
        })?;
    }
    Ok(out)
}
