//! Handler system for the mediator.
//!
//! This module defines the [`Handler`] capability that user code implements,
//! and the type-erased [`ErasedHandler`] form the container stores and the
//! dispatcher invokes.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediator_core::prelude::*;
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

use std::any::{Any, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::container::{FromServices, ServiceProvider};
use crate::error::{ConstructResult, DispatchError, DispatchResult};
use crate::key::DispatchKey;
use crate::request::Request;

// ============================================================================
// Handler Trait
// ============================================================================

/// The capability a type implements to answer requests of type `R`.
///
/// A type may implement `Handler` for several request types; each impl is a
/// separate binding. The cancellation token is whatever the caller handed to
/// the mediator; observing it is entirely up to the handler.
#[async_trait]
pub trait Handler<R: Request>: Send + Sync + 'static {
    /// Handles one request.
    async fn handle(&self, request: R, cancel: CancellationToken) -> R::Response;
}

// ============================================================================
// Type erasure
// ============================================================================

/// A handler whose request and response types have been erased.
pub type HandlerInstance = Arc<dyn ErasedHandler>;

/// Object-safe view over a [`Handler`], keyed by its [`DispatchKey`].
///
/// [`TypedHandler`] is the only implementation the framework creates; the
/// trait is public so that custom [`InstanceResolver`](crate::InstanceResolver)s
/// can hand out their own instances.
pub trait ErasedHandler: Send + Sync {
    /// Type name of the underlying handler.
    fn handler_name(&self) -> &'static str;

    /// The key this instance can handle.
    fn key(&self) -> DispatchKey;

    /// Starts handling a type-erased request.
    ///
    /// Fails with [`DispatchError::HandlerMethodNotFound`] if the request is
    /// not of the type this handler accepts.
    fn invoke(
        self: Arc<Self>,
        request: Box<dyn Any + Send>,
        cancel: CancellationToken,
    ) -> DispatchResult<Invocation>;
}

/// The erased result of invoking a handler: a boxed future of some output.
pub struct Invocation {
    future: Box<dyn Any + Send>,
    output: &'static str,
}

impl Invocation {
    /// Wraps a future producing `T`.
    pub fn new<T: Send + 'static>(future: BoxFuture<'static, T>) -> Self {
        Self {
            future: Box::new(future),
            output: type_name::<T>(),
        }
    }

    /// Wraps an arbitrary value that is not a handler future.
    ///
    /// Only useful for resolvers that need to report a broken handler.
    pub fn opaque<V: Send + 'static>(value: V) -> Self {
        Self {
            future: Box::new(value),
            output: type_name::<V>(),
        }
    }

    /// Name of the output type this invocation carries.
    pub fn output_name(&self) -> &'static str {
        self.output
    }

    /// Recovers the typed future, checking that it yields exactly `T`.
    pub fn into_future<T: Send + 'static>(
        self,
        handler: &'static str,
    ) -> DispatchResult<BoxFuture<'static, T>> {
        let Self { future, output } = self;
        future
            .downcast::<BoxFuture<'static, T>>()
            .map(|future| *future)
            .map_err(|_| DispatchError::UnexpectedReturnType {
                handler,
                expected: type_name::<BoxFuture<'static, T>>(),
                actual: output.to_string(),
            })
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TypedHandler
// ============================================================================

/// Adapter from a concrete `Handler<R>` to [`ErasedHandler`].
pub struct TypedHandler<H, R> {
    inner: H,
    _request: PhantomData<fn(R)>,
}

impl<H, R> TypedHandler<H, R>
where
    H: Handler<R>,
    R: Request,
{
    /// Wraps a handler value.
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            _request: PhantomData,
        }
    }

    /// Returns the wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }

    /// Erases a handler value into a [`HandlerInstance`].
    pub fn erase(inner: H) -> HandlerInstance {
        Arc::new(Self::new(inner))
    }

    /// Builds `H` from the provider and erases it.
    ///
    /// This is the construction recipe stored for every scanned handler.
    pub fn construct(services: &ServiceProvider) -> ConstructResult<HandlerInstance>
    where
        H: FromServices,
    {
        H::from_services(services).map(Self::erase)
    }
}

impl<H, R> ErasedHandler for TypedHandler<H, R>
where
    H: Handler<R>,
    R: Request,
{
    fn handler_name(&self) -> &'static str {
        type_name::<H>()
    }

    fn key(&self) -> DispatchKey {
        DispatchKey::of::<R, R::Response>()
    }

    fn invoke(
        self: Arc<Self>,
        request: Box<dyn Any + Send>,
        cancel: CancellationToken,
    ) -> DispatchResult<Invocation> {
        let request = request
            .downcast::<R>()
            .map_err(|_| DispatchError::HandlerMethodNotFound {
                handler: type_name::<H>(),
                key: DispatchKey::of::<R, R::Response>(),
            })?;

        let future: BoxFuture<'static, R::Response> =
            Box::pin(async move { self.inner.handle(*request, cancel).await });

        Ok(Invocation::new(future))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Double(u32);

    impl Request for Double {
        type Response = u32;
    }

    struct Doubler;

    #[async_trait]
    impl Handler<Double> for Doubler {
        async fn handle(&self, request: Double, _cancel: CancellationToken) -> u32 {
            request.0 * 2
        }
    }

    #[tokio::test]
    async fn test_typed_handler_round_trip() {
        let handler = TypedHandler::<Doubler, Double>::erase(Doubler);
        assert_eq!(handler.key(), DispatchKey::of::<Double, u32>());

        let invocation = handler
            .invoke(Box::new(Double(21)), CancellationToken::new())
            .unwrap();
        let future = invocation.into_future::<u32>("Doubler").unwrap();
        assert_eq!(future.await, 42);
    }

    #[test]
    fn test_wrong_request_type_is_method_not_found() {
        let handler = TypedHandler::<Doubler, Double>::erase(Doubler);
        let err = handler
            .invoke(Box::new("not a request"), CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, DispatchError::HandlerMethodNotFound { .. }));
    }

    #[test]
    fn test_wrong_output_is_unexpected_return_type() {
        let invocation = Invocation::new::<u32>(Box::pin(async { 1 }));
        match invocation.into_future::<String>("Doubler") {
            Err(DispatchError::UnexpectedReturnType { actual, .. }) => assert_eq!(actual, "u32"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("downcast to the wrong output type succeeded"),
        }
    }
}
