//! rowmap Derive: procedural macros for rowmap.
//!
//! Provides `#[derive(Record)]`, the statically-typed entity representation.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use std::collections::HashSet;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// Derive macro for statically-typed records.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, Default, Record)]
/// #[rowmap(name = "user", namespace = "com.example")]
/// pub struct User {
///     pub id: i64,
///     #[rowmap(rename = "displayName")]
///     pub display_name: String,
///     pub email: Option<String>,
///     pub prefs: BTreeMap<String, i32>,
/// }
/// ```
///
/// Generates:
/// - `Record` (positional get/put in field declaration order)
/// - `SpecificRecord` (`SCHEMA_NAME` is the full name, schema built once)
/// - `SchemaType`, `IntoValue`, `FromValue` so the type nests in other records
///
/// The struct must also implement `Debug`, `Clone` and `Default`.
#[proc_macro_derive(Record, attributes(rowmap))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct RecordField<'a> {
    ident: &'a syn::Ident,
    ty: &'a syn::Type,
    schema_name: String,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (record_name, namespace) = record_attrs(input)?;
    let full_name = match &namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}.{record_name}"),
        _ => record_name.clone(),
    };

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Record can only be derived for structs")),
    };

    let mut fields = Vec::with_capacity(named.len());
    let mut seen = HashSet::new();
    for f in named {
        let Some(ident) = f.ident.as_ref() else {
            continue;
        };
        let schema_name = field_rename(f)?.unwrap_or_else(|| ident.to_string());
        if !seen.insert(schema_name.clone()) {
            return Err(syn::Error::new_spanned(
                ident,
                format!("duplicate record field name '{schema_name}'"),
            ));
        }
        fields.push(RecordField {
            ident,
            ty: &f.ty,
            schema_name,
        });
    }

    let schema_fields = fields.iter().map(|f| {
        let field_name = &f.schema_name;
        let ty = f.ty;
        quote! {
            ::rowmap_core::schema::Field::new(
                #field_name,
                <#ty as ::rowmap_core::api::SchemaType>::schema_type(),
            )
        }
    });

    let get_arms = fields.iter().enumerate().map(|(idx, f)| {
        let ident = f.ident;
        quote! {
            #idx => ::rowmap_core::api::IntoValue::into_value(::std::clone::Clone::clone(&self.#ident))
        }
    });

    let put_arms = fields.iter().enumerate().map(|(idx, f)| {
        let ident = f.ident;
        quote! {
            #idx => {
                self.#ident = ::rowmap_core::api::FromValue::from_value(value)?;
                Ok(())
            }
        }
    });

    let into_fields = fields.iter().map(|f| {
        let ident = f.ident;
        quote! { ::rowmap_core::api::IntoValue::into_value(self.#ident) }
    });

    let from_fields = fields.iter().map(|f| {
        let ident = f.ident;
        let field_name = &f.schema_name;
        quote! {
            if let ::std::option::Option::Some(v) = record.get_by_name(#field_name) {
                out.#ident = ::rowmap_core::api::FromValue::from_value(::std::clone::Clone::clone(v))?;
            }
        }
    });

    let namespace_tokens = match &namespace {
        Some(ns) => quote! { ::std::option::Option::Some(#ns) },
        None => quote! { ::std::option::Option::None },
    };
    let field_count = fields.len();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::rowmap_core::record::SpecificRecord for #name #ty_generics #where_clause {
            const SCHEMA_NAME: &'static str = #full_name;

            fn record_schema() -> ::std::sync::Arc<::rowmap_core::schema::RecordSchema> {
                static SCHEMA: ::std::sync::OnceLock<::std::sync::Arc<::rowmap_core::schema::RecordSchema>> =
                    ::std::sync::OnceLock::new();
                ::std::clone::Clone::clone(SCHEMA.get_or_init(|| {
                    ::std::sync::Arc::new(::rowmap_core::schema::RecordSchema::derived(
                        #record_name,
                        #namespace_tokens,
                        ::std::vec![#(#schema_fields),*],
                    ))
                }))
            }
        }

        impl #impl_generics ::rowmap_core::record::Record for #name #ty_generics #where_clause {
            fn schema(&self) -> ::std::sync::Arc<::rowmap_core::schema::RecordSchema> {
                <Self as ::rowmap_core::record::SpecificRecord>::record_schema()
            }

            fn get(&self, pos: usize) -> ::rowmap_core::value::Value {
                match pos {
                    #(#get_arms,)*
                    _ => ::rowmap_core::value::Value::Null,
                }
            }

            fn put(
                &mut self,
                pos: usize,
                value: ::rowmap_core::value::Value,
            ) -> ::rowmap_core::error::MappingResult<()> {
                match pos {
                    #(#put_arms)*
                    _ => Err(::rowmap_core::error::MappingError::Precondition(::std::format!(
                        "position {} out of range for record '{}' with {} fields",
                        pos,
                        #full_name,
                        #field_count
                    ))),
                }
            }

            fn field_count(&self) -> usize {
                #field_count
            }
        }

        impl #impl_generics ::rowmap_core::api::SchemaType for #name #ty_generics #where_clause {
            fn schema_type() -> ::rowmap_core::schema::Schema {
                ::rowmap_core::schema::Schema::Record(
                    <Self as ::rowmap_core::record::SpecificRecord>::record_schema(),
                )
            }
        }

        impl #impl_generics ::rowmap_core::api::IntoValue for #name #ty_generics #where_clause {
            fn into_value(self) -> ::rowmap_core::value::Value {
                ::rowmap_core::value::Value::Record(::rowmap_core::record::GenericRecord::from_values(
                    <Self as ::rowmap_core::record::SpecificRecord>::record_schema(),
                    ::std::vec![#(#into_fields),*],
                ))
            }
        }

        impl #impl_generics ::rowmap_core::api::FromValue for #name #ty_generics #where_clause {
            fn from_value(value: ::rowmap_core::value::Value) -> ::rowmap_core::error::MappingResult<Self> {
                match value {
                    ::rowmap_core::value::Value::Record(record) => {
                        let mut out = <Self as ::std::default::Default>::default();
                        #(#from_fields)*
                        Ok(out)
                    }
                    ::rowmap_core::value::Value::Null => Ok(<Self as ::std::default::Default>::default()),
                    other => Err(::rowmap_core::error::MappingError::Serialization(::std::format!(
                        "type mismatch: expected record {}, got {}",
                        #full_name,
                        other.type_label()
                    ))),
                }
            }
        }
    })
}

/// `#[rowmap(name = "...", namespace = "...")]` on the struct.
fn record_attrs(input: &DeriveInput) -> syn::Result<(String, Option<String>)> {
    let mut name = input.ident.to_string();
    let mut namespace = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("rowmap") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else if meta.path.is_ident("namespace") {
                namespace = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("expected `name` or `namespace`"))
            }
        })?;
    }
    Ok((name, namespace))
}

/// `#[rowmap(rename = "...")]` on a field.
fn field_rename(field: &syn::Field) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("rowmap") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                rename = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("expected `rename`"))
            }
        })?;
    }
    Ok(rename)
}
