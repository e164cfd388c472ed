//! Procedural macros for the Mediator framework.
//!
//! This crate provides:
//!
//! - `#[handler]` - Links a `Handler<R>` impl into the handler registry
//! - `#[derive(Request)]` - Implements `Request` with a declared response type
//! - `#[derive(FromServices)]` - Constructor injection from the service container
//!
//! The generated code refers to `::mediator_core`, so the crate using these
//! macros must depend on `mediator-core`.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediator_core::prelude::*;
//!
//! #[derive(Request)]
//! #[request(response = String)]
//! pub struct CreateUser {
//!     pub name: String,
//! }
//!
//! #[derive(FromServices)]
//! pub struct CreateUserHandler {
//!     users: Arc<UserRepository>,
//! }
//!
//! #[handler]
//! #[async_trait]
//! impl Handler<CreateUser> for CreateUserHandler {
//!     async fn handle(&self, request: CreateUser, _cancel: CancellationToken) -> String {
//!         self.users.save(&request.name);
//!         format!("{} user created.", request.name)
//!     }
//! }
//! ```

mod handler;
mod request;
mod services;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemImpl, parse_macro_input};

/// Registers a handler impl for discovery.
///
/// Apply it to an `impl Handler<R> for H` block, above `#[async_trait]`. The
/// impl is emitted unchanged, followed by a static `HandlerDescriptor` in the
/// `HANDLERS` distributed slice, tagged with the current module path so scans
/// can be narrowed to a module.
///
/// `H` must implement `FromServices`. Generic impls are rejected: an open
/// handler type has no single binding to register.
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as ItemImpl);

    match handler::expand_handler(attr.into(), &item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derives `Request`.
///
/// # Attributes
///
/// - `#[request(response = Type)]` - The response type (default: `()`)
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Request)]
/// #[request(response = Vec<User>)]
/// pub struct ListUsers;
///
/// // Fire-and-forget style request, answered with `()`
/// #[derive(Request)]
/// pub struct Touch(pub UserId);
/// ```
#[proc_macro_derive(Request, attributes(request))]
pub fn derive_request(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match request::derive_request(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derives `FromServices` for structs.
///
/// Every field is resolved with `ServiceProvider::require`, so it must be an
/// `Arc<T>` of a registered service. Fields marked `#[inject(default)]` are
/// filled with `Default::default()` instead.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(FromServices)]
/// pub struct CreateUserHandler {
///     users: Arc<UserRepository>,
///     #[inject(default)]
///     created: AtomicUsize,
/// }
/// ```
#[proc_macro_derive(FromServices, attributes(inject))]
pub fn derive_from_services(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match services::derive_from_services(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
