use proc_macro2::TokenStream;
use proc_macro_error2::abort;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, Type};

#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    read_only: bool,
    write_only: bool,
    rename: Option<String>,
}

struct ShapeField<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    name: String,
    readable: bool,
    writable: bool,
}

pub fn expand_derive_shape(input: &DeriveInput) -> TokenStream {
    let struct_name = &input.ident;
    let (shape_name, table) = match parse_shape(input) {
        Ok(parsed) => parsed,
        Err(err) => abort!(err.span(), err.to_string()),
    };

    let descriptors = table.iter().map(|f| {
        let name = &f.name;
        let ty = f.ty;
        let access = match (f.readable, f.writable) {
            (true, false) => quote! { .read_only() },
            (false, true) => quote! { .write_only() },
            _ => quote! {},
        };
        quote! {
            ::modkit_mapper::FieldDescriptor::new(
                #name,
                <#ty as ::modkit_mapper::ValueType>::FIELD_TYPE,
            )#access
        }
    });

    let read_arms = table.iter().filter(|f| f.readable).map(|f| {
        let name = &f.name;
        let ident = f.ident;
        quote! {
            #name => ::core::option::Option::Some(::modkit_mapper::IntoValue::into_value(
                ::core::clone::Clone::clone(&self.#ident),
            ))
        }
    });

    let write_arms = table.iter().filter(|f| f.writable).map(|f| {
        let name = &f.name;
        let ident = f.ident;
        let ty = f.ty;
        quote! {
            #name => match <#ty as ::modkit_mapper::FromValue>::from_value(value) {
                ::core::option::Option::Some(v) => {
                    self.#ident = v;
                    true
                }
                ::core::option::Option::None => false,
            }
        }
    });

    quote! {
        #[automatically_derived]
        impl ::modkit_mapper::Shape for #struct_name {
            const NAME: &'static str = #shape_name;

            fn fields() -> &'static [::modkit_mapper::FieldDescriptor] {
                const FIELDS: &[::modkit_mapper::FieldDescriptor] = &[#(#descriptors),*];
                FIELDS
            }

            #[allow(clippy::match_single_binding)]
            fn read(&self, field: &str) -> ::core::option::Option<::modkit_mapper::Value> {
                match field {
                    #(#read_arms,)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables, clippy::match_single_binding)]
            fn write(&mut self, field: &str, value: ::modkit_mapper::Value) -> bool {
                match field {
                    #(#write_arms,)*
                    _ => false,
                }
            }
        }
    }
}

/// Shape name and field table, or the first misuse found.
fn parse_shape(input: &DeriveInput) -> syn::Result<(String, Vec<ShapeField<'_>>)> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Shape cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Shape only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Shape can only be derived for structs",
            ));
        }
    };

    let shape_name = container_name(&input.attrs)?.unwrap_or_else(|| input.ident.to_string());

    let mut table = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "Shape requires named fields"));
        };
        let attrs = field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        if attrs.read_only && attrs.write_only {
            return Err(syn::Error::new_spanned(
                field,
                "a field cannot be both `read_only` and `write_only`",
            ));
        }
        table.push(ShapeField {
            ident,
            ty: &field.ty,
            name: attrs.rename.unwrap_or_else(|| ident.to_string()),
            readable: !attrs.write_only,
            writable: !attrs.read_only,
        });
    }
    Ok((shape_name, table))
}

fn container_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut name = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("shape")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                name = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unsupported container attribute; expected `name = \"...\"`"))
            }
        })?;
    }
    Ok(name)
}

fn field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("shape")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                out.skip = true;
            } else if meta.path.is_ident("read_only") {
                out.read_only = true;
            } else if meta.path.is_ident("write_only") {
                out.write_only = true;
            } else if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                out.rename = Some(lit.value());
            } else {
                return Err(meta.error(
                    "unsupported field attribute; expected `skip`, `read_only`, `write_only` or `rename = \"...\"`",
                ));
            }
            Ok(())
        })?;
    }
    Ok(out)
}
