//! Derive macro for mapping structs to query arguments and result columns.
//!
//! This crate provides the `#[derive(Record)]` macro, which implements
//! `groundwork_sql::Record` and `groundwork_sql::FieldAccess` for a struct.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, Ident, Lit, Meta, Visibility};

/// Derives `Record` and `FieldAccess` for a struct with named fields.
///
/// Only `pub` fields are mapped, in declaration order. The struct must also
/// implement `Default`, which is used to create records before scanning.
///
/// # Field Attributes
///
/// - `#[column(name = "column_name")]` - Uses `column_name` instead of the
///   field name. Anything after a `,` is ignored, so `"id,primary"` maps to
///   `id`.
/// - `#[column(flatten)]` - The field is a record (or `Option` of one) whose
///   fields are mapped as if they were declared on this struct.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Default, Record)]
/// pub struct Audit {
///     pub created_by: String,
/// }
///
/// #[derive(Debug, Default, Record)]
/// pub struct User {
///     #[column(name = "id,primary")]
///     pub id: i64,
///     pub name: Option<String>,
///     #[column(flatten)]
///     pub audit: Audit,
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(column))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_record_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_record_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record derive only supports structs",
            ));
        }
    };

    let mut field_infos: Vec<FieldInfo> = Vec::new();
    for field in fields {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let column_attrs = parse_column_attrs(&field.attrs)?;

        if !matches!(field.vis, Visibility::Public(_)) {
            if column_attrs.is_some() {
                return Err(syn::Error::new_spanned(
                    field_ident,
                    "#[column] has no effect on fields that are not `pub`",
                ));
            }
            continue;
        }

        let column_attrs = column_attrs.unwrap_or_default();
        if column_attrs.flatten && column_attrs.name.is_some() {
            return Err(syn::Error::new_spanned(
                field_ident,
                "flattened fields cannot be renamed",
            ));
        }

        field_infos.push(FieldInfo {
            field_ident: field_ident.clone(),
            field_type: field.ty.clone(),
            rename: column_attrs.name,
            flatten: column_attrs.flatten,
        });
    }

    let positions: Vec<usize> = (0..field_infos.len()).collect();

    let field_refs: Vec<TokenStream2> = field_infos
        .iter()
        .map(|info| {
            let ident = &info.field_ident;
            if info.flatten {
                quote! { ::groundwork_sql::record::FieldRef::Record(&self.#ident) }
            } else {
                quote! { ::groundwork_sql::record::FieldRef::Value(&self.#ident) }
            }
        })
        .collect();

    let field_muts: Vec<TokenStream2> = field_infos
        .iter()
        .map(|info| {
            let ident = &info.field_ident;
            if info.flatten {
                quote! { ::groundwork_sql::record::FieldMut::Record(&mut self.#ident) }
            } else {
                quote! { ::groundwork_sql::record::FieldMut::Value(&mut self.#ident) }
            }
        })
        .collect();

    let descriptors: Vec<TokenStream2> = field_infos
        .iter()
        .map(|info| {
            let name = info.field_ident.unraw().to_string();
            let field_type = &info.field_type;

            if info.flatten {
                quote! {
                    ::groundwork_sql::record::FieldDescriptor::embedded(
                        #name,
                        <#field_type as ::groundwork_sql::record::Record>::fields,
                    )
                }
            } else {
                let rename = match &info.rename {
                    Some(rename) => quote! { ::core::option::Option::Some(#rename) },
                    None => quote! { ::core::option::Option::None },
                };
                quote! {
                    ::groundwork_sql::record::FieldDescriptor::value(#name, #rename)
                }
            }
        })
        .collect();

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::groundwork_sql::record::FieldAccess for #struct_name #ty_generics #where_clause {
            fn field(
                &self,
                position: usize,
            ) -> ::core::option::Option<::groundwork_sql::record::FieldRef<'_>> {
                match position {
                    #(#positions => ::core::option::Option::Some(#field_refs),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_mut(
                &mut self,
                position: usize,
            ) -> ::core::option::Option<::groundwork_sql::record::FieldMut<'_>> {
                match position {
                    #(#positions => ::core::option::Option::Some(#field_muts),)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl #impl_generics ::groundwork_sql::record::Record for #struct_name #ty_generics #where_clause {
            fn fields() -> ::std::vec::Vec<::groundwork_sql::record::FieldDescriptor> {
                ::std::vec![
                    #(#descriptors),*
                ]
            }
        }
    };

    Ok(expanded)
}

struct FieldInfo {
    field_ident: Ident,
    field_type: syn::Type,
    rename: Option<String>,
    flatten: bool,
}

#[derive(Default)]
struct ColumnAttrs {
    name: Option<String>,
    flatten: bool,
}

/// Returns `None` if the field has no `#[column(...)]` attribute.
fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<Option<ColumnAttrs>> {
    let mut result: Option<ColumnAttrs> = None;

    for attr in attrs {
        if !attr.path().is_ident("column") {
            continue;
        }

        let column = result.get_or_insert_with(ColumnAttrs::default);

        // Handle empty attribute like #[column]
        if matches!(attr.meta, Meta::Path(_)) {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("flatten") {
                column.flatten = true;
                Ok(())
            } else if meta.path.is_ident("name") {
                let value: Expr = meta.value()?.parse()?;
                match value {
                    Expr::Lit(lit) => match lit.lit {
                        Lit::Str(s) => {
                            column.name = Some(s.value());
                            Ok(())
                        }
                        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
                    },
                    other => Err(syn::Error::new_spanned(other, "expected a string literal")),
                }
            } else {
                Err(meta.error("unsupported column attribute, expected `name` or `flatten`"))
            }
        })?;
    }

    Ok(result)
}
