//! Derive support for `triprotocol_core::Record`.
//!
//! Generates the static per-field wire table of a struct together with the
//! binding and stringification code that walks it. Wire names resolve as
//! `#[wire(name = "..")]`, then `#[serde(rename = "..")]`, then the field
//! identifier.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields, LitStr, Token};

#[proc_macro_derive(Record, attributes(wire, serde))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct FieldAttrs {
    wire_name: Option<String>,
    serde_rename: Option<String>,
    omittable: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let data = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record can only be derived for structs",
            ))
        }
    };

    let fields: Vec<&Field> = match &data.fields {
        Fields::Named(named) => named.named.iter().collect(),
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Record requires named fields",
            ))
        }
    };

    let mut specs = Vec::with_capacity(fields.len());
    let mut binds = Vec::with_capacity(fields.len());
    let mut texts = Vec::with_capacity(fields.len());
    let mut values = Vec::with_capacity(fields.len());

    for (index, field) in fields.iter().enumerate() {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let attrs = parse_field_attrs(field)?;

        let ident_name = ident.to_string().trim_start_matches("r#").to_string();
        let json_name = attrs.serde_rename.unwrap_or_else(|| ident_name.clone());
        let wire_name = attrs.wire_name.unwrap_or_else(|| json_name.clone());
        let omittable = attrs.omittable;

        specs.push(quote! {
            ::triprotocol_core::record::FieldSpec {
                ident: #ident_name,
                wire_name: #wire_name,
                json_name: #json_name,
                omittable: #omittable,
            }
        });
        binds.push(quote! {
            #ident: ::triprotocol_core::record::bind_field(
                source,
                naming,
                &<Self as ::triprotocol_core::record::Record>::FIELDS[#index],
            )?
        });
        texts.push(quote! {
            (
                <Self as ::triprotocol_core::record::Record>::FIELDS[#index].wire_name,
                ::triprotocol_core::field::FieldValue::to_text(&self.#ident),
            )
        });
        values.push(quote! {
            fields.insert(
                <Self as ::triprotocol_core::record::Record>::FIELDS[#index]
                    .name(naming)
                    .to_owned(),
                ::triprotocol_core::field::FieldValue::to_value(&self.#ident, naming),
            );
        });
    }

    let construct = match &data.fields {
        Fields::Unit => quote! { Self },
        _ => quote! { Self { #(#binds),* } },
    };

    Ok(quote! {
        impl #impl_generics ::triprotocol_core::record::Record for #name #ty_generics #where_clause {
            const FIELDS: &'static [::triprotocol_core::record::FieldSpec] = &[#(#specs),*];

            #[allow(unused_variables)]
            fn bind(
                source: &dyn ::triprotocol_core::record::FieldSource,
                naming: ::triprotocol_core::record::Naming,
            ) -> ::triprotocol_core::Result<Self> {
                ::core::result::Result::Ok(#construct)
            }

            fn to_text_fields(&self) -> ::std::vec::Vec<(&'static str, ::std::string::String)> {
                ::std::vec![#(#texts),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn to_value_fields(
                &self,
                naming: ::triprotocol_core::record::Naming,
            ) -> ::std::collections::BTreeMap<::std::string::String, ::triprotocol_core::value::Value> {
                let mut fields = ::std::collections::BTreeMap::new();
                #(#values)*
                fields
            }
        }

        impl #impl_generics ::triprotocol_core::field::FieldValue for #name #ty_generics #where_clause {
            fn from_text(text: &str) -> ::triprotocol_core::Result<Self> {
                ::triprotocol_core::record::record_from_text(text)
            }

            fn from_value(
                value: &::triprotocol_core::value::Value,
                naming: ::triprotocol_core::record::Naming,
            ) -> ::triprotocol_core::Result<Self> {
                ::triprotocol_core::record::record_from_value(value, naming)
            }

            fn to_text(&self) -> ::std::string::String {
                ::triprotocol_core::record::record_to_text(self)
            }

            fn to_value(
                &self,
                naming: ::triprotocol_core::record::Naming,
            ) -> ::triprotocol_core::value::Value {
                ::triprotocol_core::value::Value::Map(
                    ::triprotocol_core::record::Record::to_value_fields(self, naming),
                )
            }
        }
    })
}

fn parse_field_attrs(field: &Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();

    for attr in &field.attrs {
        if attr.path().is_ident("wire") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    attrs.wire_name = Some(lit.value());
                    Ok(())
                } else if meta.path.is_ident("omittable") {
                    attrs.omittable = true;
                    Ok(())
                } else {
                    Err(meta.error("unsupported wire attribute, expected `name` or `omittable`"))
                }
            })?;
        } else if attr.path().is_ident("serde") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                    let lit: LitStr = meta.value()?.parse()?;
                    attrs.serde_rename = Some(lit.value());
                } else if meta.input.peek(Token![=]) {
                    // Other serde options are serde's business.
                    let _: syn::Expr = meta.value()?.parse()?;
                } else if meta.input.peek(syn::token::Paren) {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let _: TokenStream2 = content.parse()?;
                }
                Ok(())
            })?;
        }
    }

    Ok(attrs)
}
