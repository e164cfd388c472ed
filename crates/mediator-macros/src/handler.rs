//! `#[handler]` attribute implementation.

use proc_macro2::{Span, TokenStream};
use quote::{ToTokens, quote};
use syn::{GenericArgument, Ident, ItemImpl, PathArguments, Type, spanned::Spanned};

pub fn expand_handler(attr: TokenStream, item: &ItemImpl) -> syn::Result<TokenStream> {
    if !attr.is_empty() {
        return Err(syn::Error::new_spanned(attr, "#[handler] takes no arguments"));
    }

    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "#[handler] cannot register a generic impl; implement Handler for a concrete type",
        ));
    }

    let request = request_type(item)?;
    let self_ty = &item.self_ty;
    let static_name = Ident::new(
        &format!(
            "__MEDIATOR_HANDLER_{}__{}",
            sanitize(self_ty.as_ref()),
            sanitize(request)
        ),
        Span::call_site(),
    );

    Ok(quote! {
        #item

        #[doc(hidden)]
        #[::mediator_core::linkme::distributed_slice(::mediator_core::HANDLERS)]
        #[linkme(crate = ::mediator_core::linkme)]
        static #static_name: ::mediator_core::HandlerDescriptor =
            ::mediator_core::HandlerDescriptor::of::<#self_ty, #request>(::core::module_path!());
    })
}

/// Extracts `R` from `impl Handler<R> for H`.
fn request_type(item: &ItemImpl) -> syn::Result<&Type> {
    let expected = "#[handler] expects `impl Handler<Request> for Type`";

    let Some((negative, path, _)) = &item.trait_ else {
        return Err(syn::Error::new(item.self_ty.span(), expected));
    };
    if let Some(bang) = negative {
        return Err(syn::Error::new_spanned(bang, expected));
    }

    let segment = path
        .segments
        .last()
        .filter(|segment| segment.ident == "Handler")
        .ok_or_else(|| syn::Error::new_spanned(path, expected))?;

    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return Err(syn::Error::new_spanned(segment, expected));
    };

    let mut types = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    });
    match (types.next(), types.next()) {
        (Some(ty), None) => Ok(ty),
        _ => Err(syn::Error::new_spanned(args, expected)),
    }
}

/// Turns a type into an identifier fragment, e.g. `users::Create<u8>` into
/// `USERS_CREATE_U8`.
fn sanitize(ty: &Type) -> String {
    let mut out = String::new();
    for ch in ty.to_token_stream().to_string().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_uppercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}
