//! Bindable derive macro implementation

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, LitStr, Result};

/// Parsed `#[bind("...")]` tag of one field.
struct FieldTag {
    name: String,
    nested: bool,
    skip: bool,
}

fn parse_field_tag(field: &syn::Field) -> Result<FieldTag> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
    let default_name = ident.unraw().to_string().to_snake_case();

    let mut tag = FieldTag {
        name: default_name,
        nested: false,
        skip: false,
    };

    for attr in &field.attrs {
        if !attr.path().is_ident("bind") {
            continue;
        }
        let lit: LitStr = attr.parse_args()?;
        let value = lit.value();
        if value == "-" {
            tag.skip = true;
            continue;
        }

        let mut parts = value.split(',');
        let name = parts.next().unwrap_or_default().trim();
        let mut nested = false;
        for opt in parts {
            match opt.trim() {
                "bind" => nested = true,
                "" => {}
                other => {
                    return Err(syn::Error::new_spanned(
                        &lit,
                        format!("unknown bind option `{other}`, expected `bind`"),
                    ));
                }
            }
        }

        tag.nested = nested;
        if !name.is_empty() {
            tag.name = name.to_string();
        } else if nested {
            // `,bind` matches the nested fields without a prefix.
            tag.name = String::new();
        }
    }
    Ok(tag)
}

/// `#[bind(relationships = path::to::fn)]` on the struct.
fn parse_relationships(input: &DeriveInput) -> Result<Option<syn::Path>> {
    for attr in &input.attrs {
        if !attr.path().is_ident("bind") {
            continue;
        }
        let nv: syn::MetaNameValue = attr.parse_args()?;
        if !nv.path.is_ident("relationships") {
            return Err(syn::Error::new_spanned(
                &nv.path,
                "unknown bind attribute, expected `relationships = path`",
            ));
        }
        match nv.value {
            syn::Expr::Path(p) => return Ok(Some(p.path)),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "expected a path to `fn() -> &'static Relationships<Self>`",
                ));
            }
        }
    }
    Ok(None)
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Bindable cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Bindable can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Bindable can only be derived for structs",
            ));
        }
    };

    let mut table = Vec::new();
    let mut mut_arms = Vec::new();
    let mut ref_arms = Vec::new();

    for field in fields {
        let tag = parse_field_tag(field)?;
        if tag.skip {
            continue;
        }
        let idx = table.len();
        let ident = &field.ident;
        let ty = &field.ty;
        let bind_name = &tag.name;

        if tag.nested {
            table.push(quote! {
                ::sqlmold::BindField::nested(
                    #bind_name,
                    <#ty as ::sqlmold::NestedBind>::nested_fields,
                )
            });
            mut_arms.push(quote! {
                #idx => ::core::option::Option::Some(::sqlmold::FieldMut::Nested(&mut self.#ident))
            });
            ref_arms.push(quote! {
                #idx => ::core::option::Option::Some(::sqlmold::FieldRef::Nested(&self.#ident))
            });
        } else {
            table.push(quote! { ::sqlmold::BindField::scalar(#bind_name) });
            mut_arms.push(quote! {
                #idx => ::core::option::Option::Some(::sqlmold::FieldMut::Scalar(&mut self.#ident))
            });
            ref_arms.push(quote! {
                #idx => ::core::option::Option::Some(::sqlmold::FieldRef::Scalar(&self.#ident))
            });
        }
    }

    if table.len() >= 255 {
        return Err(syn::Error::new_spanned(
            &input,
            "Bindable supports at most 254 bound fields",
        ));
    }

    let count = table.len();
    let relationships = parse_relationships(&input)?.map(|path| {
        quote! {
            fn relationships() -> ::core::option::Option<&'static ::sqlmold::Relationships<Self>> {
                ::core::option::Option::Some(#path())
            }
        }
    });

    Ok(quote! {
        impl ::sqlmold::BindTarget for #name {
            fn field_mut(&mut self, idx: usize) -> ::core::option::Option<::sqlmold::FieldMut<'_>> {
                match idx {
                    #(#mut_arms,)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_ref(&self, idx: usize) -> ::core::option::Option<::sqlmold::FieldRef<'_>> {
                match idx {
                    #(#ref_arms,)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl ::sqlmold::Bindable for #name {
            fn bind_fields() -> &'static [::sqlmold::BindField] {
                static FIELDS: [::sqlmold::BindField; #count] = [#(#table),*];
                &FIELDS
            }

            #relationships
        }

        impl ::sqlmold::NestedBind for #name {
            fn nested_fields() -> &'static [::sqlmold::BindField] {
                <Self as ::sqlmold::Bindable>::bind_fields()
            }
        }
    })
}
