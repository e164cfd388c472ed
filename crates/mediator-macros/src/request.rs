//! `#[derive(Request)]` implementation.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Type};

pub fn derive_request(input: &DeriveInput) -> syn::Result<TokenStream> {
    if let Data::Union(data) = &input.data {
        return Err(syn::Error::new(
            data.union_token.span,
            "Request cannot be derived for unions",
        ));
    }

    let mut response: Option<Type> = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("request") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("response") {
                response = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unknown request attribute, expected `response = Type`"))
            }
        })?;
    }

    let response = match response {
        Some(ty) => quote!(#ty),
        None => quote!(()),
    };
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::mediator_core::Request for #name #ty_generics #where_clause {
            type Response = #response;
        }
    })
}
