//! `#[derive(FromServices)]` implementation.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, spanned::Spanned};

pub fn derive_from_services(input: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "FromServices can only be derived for structs",
        ));
    };

    let body = match &data.fields {
        Fields::Unit => quote!(Self),
        Fields::Named(fields) => {
            let inits = fields
                .named
                .iter()
                .map(|field| {
                    let ident = &field.ident;
                    let value = field_value(field)?;
                    Ok(quote!(#ident: #value))
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote!(Self { #(#inits),* })
        }
        Fields::Unnamed(fields) => {
            let values = fields
                .unnamed
                .iter()
                .map(field_value)
                .collect::<syn::Result<Vec<_>>>()?;
            quote!(Self(#(#values),*))
        }
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::mediator_core::FromServices for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn from_services(
                services: &::mediator_core::ServiceProvider,
            ) -> ::mediator_core::ConstructResult<Self> {
                ::core::result::Result::Ok(#body)
            }
        }
    })
}

fn field_value(field: &Field) -> syn::Result<TokenStream> {
    let mut use_default = false;
    for attr in &field.attrs {
        if !attr.path().is_ident("inject") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                use_default = true;
                Ok(())
            } else {
                Err(meta.error("unknown inject attribute, expected `default`"))
            }
        })?;
    }

    Ok(if use_default {
        quote!(::core::default::Default::default())
    } else {
        quote!(services.require()?)
    })
}
