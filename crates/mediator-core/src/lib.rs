//! # Mediator Core
//!
//! The dispatch engine of the Mediator framework.
//!
//! A caller hands a request object to the [`Mediator`]; the mediator finds the
//! one handler bound for the request's concrete type and response type, builds
//! it from the container and returns whatever the handler produces. Callers
//! never name handler types.
//!
//! ## Building Blocks
//!
//! - **Requests**: [`Request`] ties a request type to its response type
//! - **Handlers**: [`Handler`] answers one request type; [`TypedHandler`]
//!   erases it into a [`HandlerInstance`]
//! - **Keys**: [`DispatchKey`] identifies a `(request, response)` pair
//! - **Registry**: [`HandlerRegistry`] binds linked [`HandlerDescriptor`]s
//!   while keeping every key unique
//! - **Container**: [`ServiceCollection`] at composition time,
//!   [`ServiceProvider`] at resolution time
//! - **Dispatcher**: [`Mediator`] resolves a handler per request and awaits it
//!
//! ```text
//! ┌──────────┐ send  ┌──────────┐ resolve ┌─────────────────┐
//! │  Caller  │──────▶│ Mediator │────────▶│ ServiceProvider │
//! └──────────┘       └──────────┘         └─────────────────┘
//!                         │ invoke                 ▲
//!                         ▼                        │ bindings
//!                   ┌───────────┐          ┌─────────────────┐
//!                   │  Handler  │          │ HandlerRegistry │
//!                   └───────────┘          └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use mediator_core::prelude::*;
//!
//! #[derive(Request)]
//! #[request(response = String)]
//! struct CreateUser {
//!     name: String,
//! }
//!
//! #[derive(FromServices)]
//! struct CreateUserHandler;
//!
//! #[handler]
//! #[async_trait]
//! impl Handler<CreateUser> for CreateUserHandler {
//!     async fn handle(&self, request: CreateUser, _cancel: CancellationToken) -> String {
//!         format!("{} user created.", request.name)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut services = ServiceCollection::new();
//!     services.add_mediator(&[ScanTarget::All]).unwrap();
//!
//!     let mediator = services.build().mediator();
//!     let message = mediator.send(CreateUser { name: "Mars".into() }).await.unwrap();
//!     assert_eq!(message, "Mars user created.");
//! }
//! ```

// Lets the macros' `::mediator_core` paths resolve inside this crate's tests.
extern crate self as mediator_core;

pub mod container;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod key;
pub mod registry;
pub mod request;

pub use container::{
    BoundHandler, FromServices, HandlerRegistrar, InstanceResolver, Lifetime, Recipe,
    ServiceCollection, ServiceProvider,
};
pub use dispatcher::Mediator;
pub use error::{
    ConstructError, ConstructResult, DispatchError, DispatchResult, RegistrationError,
    RegistrationResult,
};
pub use handler::{ErasedHandler, Handler, HandlerInstance, Invocation, TypedHandler};
pub use key::DispatchKey;
pub use registry::{
    DuplicatePolicy, HANDLERS, HandlerDescriptor, HandlerRegistry, RegistrationReport, ScanTarget,
    linked_handlers,
};
pub use request::{AnyRequest, BoxedRequest, Request};

// Re-exported for user code and macro expansions.
pub use async_trait::async_trait;
pub use futures::future::BoxFuture;
pub use linkme;
pub use mediator_macros::{FromServices, Request, handler};
pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        BoxedRequest, CancellationToken, DispatchError, DispatchResult, FromServices, Handler,
        Lifetime, Mediator, Request, ScanTarget, ServiceCollection, ServiceProvider, async_trait,
        handler,
    };
}
