//! # Mediator
//!
//! A type-safe request/handler mediator for Rust.
//!
//! ## Overview
//!
//! Callers send request objects; each request type is answered by exactly
//! one handler, found by the request's concrete type and its response type.
//! Handlers are discovered at link time, built by a small service container
//! with constructor injection, and invoked asynchronously with a
//! cancellation token.
//!
//! ```text
//! ┌──────────┐ send  ┌──────────┐ resolve ┌───────────┐ construct ┌──────────┐
//! │  Caller  │──────▶│ Mediator │────────▶│ Container │──────────▶│ Handler  │
//! └──────────┘       └──────────┘         └───────────┘           └──────────┘
//! ```
//!
//! - **Core**: requests, handlers, registry, container and dispatcher
//! - **Runtime**: configuration, logging and the [`MediatorHost`](prelude::MediatorHost)
//!   composition root
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mediator::prelude::*;
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
//! async fn main() -> anyhow::Result<()> {
//!     let host = MediatorHost::builder().build()?;
//!     let message = host.mediator().send(CreateUser { name: "Mars".into() }).await?;
//!     println!("{message}");
//!     Ok(())
//! }
//! ```
//!
//! The macros expand to paths under `mediator_core`, so applications depend
//! on `mediator-core` alongside this crate.
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use mediator_core as core;
pub use mediator_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use mediator::prelude::*;
/// ```
pub mod prelude {
    // Composition root - main entry point
    pub use mediator_runtime::{HostBuilder, MediatorConfig, MediatorHost, RuntimeError};

    // Requests and handlers
    pub use mediator_core::{
        BoxedRequest, CancellationToken, Handler, Request, async_trait, handler,
    };

    // Container
    pub use mediator_core::{FromServices, Lifetime, ServiceCollection, ServiceProvider};

    // Dispatch
    pub use mediator_core::{DispatchError, DispatchResult, Mediator, ScanTarget};
}
