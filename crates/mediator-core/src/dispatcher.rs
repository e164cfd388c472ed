//! Request dispatcher.
//!
//! This module provides the [`Mediator`], the single entry point callers use
//! to send a request to whichever handler is bound for it.
//!
//! # Dispatch
//!
//! Every `send` runs the same sequence, failing at the first step that
//! cannot be completed:
//!
//! 1. Derive the key from the *concrete* request type and the static
//!    response type.
//! 2. Resolve one handler instance for the key
//!    ([`DispatchError::HandlerNotFound`]).
//! 3. Check that the instance handles exactly that key
//!    ([`DispatchError::HandlerMethodNotFound`]).
//! 4. Invoke it and recover a future of the response type
//!    ([`DispatchError::UnexpectedReturnType`]).
//! 5. Await the future and return its output.
//!
//! ```rust,ignore
//! let provider = services.build();
//! let mediator = provider.mediator();
//!
//! let message = mediator.send(CreateUser { name: "Mars".into() }).await?;
//! assert_eq!(message, "Mars user created.");
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, trace};

use crate::container::InstanceResolver;
use crate::error::{DispatchError, DispatchResult};
use crate::key::DispatchKey;
use crate::request::{BoxedRequest, Request};

/// Sends requests to their handlers.
///
/// The mediator holds no state of its own beyond the resolver it was created
/// with; every call performs its own lookup, and transient handlers are built
/// fresh for each call.
///
/// # Thread Safety
///
/// `Mediator` is `Send + Sync` and cheap to clone, so it can be shared across
/// tasks and used for any number of concurrent dispatches.
#[derive(Clone)]
pub struct Mediator {
    resolver: Arc<dyn InstanceResolver>,
}

impl Mediator {
    /// Creates a mediator resolving handlers through `resolver`.
    pub fn new(resolver: Arc<dyn InstanceResolver>) -> Self {
        Self { resolver }
    }

    /// Sends a request with a token that is never cancelled.
    pub async fn send<R: Request>(&self, request: R) -> DispatchResult<R::Response> {
        self.send_with(request, CancellationToken::new()).await
    }

    /// Sends a request, handing `cancel` through to the handler.
    pub async fn send_with<R: Request>(
        &self,
        request: R,
        cancel: CancellationToken,
    ) -> DispatchResult<R::Response> {
        self.send_boxed(Box::new(request), cancel).await
    }

    /// Sends a request whose concrete type is only known at runtime.
    pub async fn send_boxed<T: Send + 'static>(
        &self,
        request: BoxedRequest<T>,
        cancel: CancellationToken,
    ) -> DispatchResult<T> {
        let key = DispatchKey::from_runtime::<T>(
            (*request).request_type_id(),
            (*request).request_type_name(),
        );
        let span = debug_span!(
            "dispatch",
            request = key.request_name(),
            response = key.response_name()
        );

        self.dispatch(key, request, cancel)
            .instrument(span)
            .await
            .inspect_err(|e| debug!(error = %e, "Dispatch failed"))
    }

    async fn dispatch<T: Send + 'static>(
        &self,
        key: DispatchKey,
        request: BoxedRequest<T>,
        cancel: CancellationToken,
    ) -> DispatchResult<T> {
        let handler = self
            .resolver
            .resolve(&key)?
            .ok_or(DispatchError::HandlerNotFound {
                request: key.request_name(),
                response: key.response_name(),
            })?;

        let handler_name = handler.handler_name();
        if handler.key() != key {
            return Err(DispatchError::HandlerMethodNotFound {
                handler: handler_name,
                key,
            });
        }
        trace!(handler = handler_name, "Invoking handler");

        let future = handler
            .invoke(request.into_any(), cancel)?
            .into_future::<T>(handler_name)?;

        Ok(future.await)
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ServiceCollection;
    use crate::error::ConstructResult;
    use crate::handler::{ErasedHandler, Handler, HandlerInstance, Invocation, TypedHandler};
    use crate::registry::ScanTarget;
    use crate::{FromServices, Request as DeriveRequest, async_trait, handler};
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct InvocationLog(AtomicUsize);

    impl InvocationLog {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct UserRepository {
        saved: parking_lot::Mutex<Vec<String>>,
    }

    #[derive(DeriveRequest)]
    #[request(response = String)]
    struct CreateUser(String);

    #[derive(DeriveRequest)]
    #[request(response = String)]
    struct Ping;

    #[derive(DeriveRequest)]
    #[request(response = bool)]
    struct CheckCancelled;

    #[derive(DeriveRequest)]
    #[request(response = u64)]
    struct Square(u64);

    #[derive(FromServices)]
    struct CreateUserHandler {
        users: Arc<UserRepository>,
        log: Arc<InvocationLog>,
    }

    #[handler]
    #[async_trait]
    impl Handler<CreateUser> for CreateUserHandler {
        async fn handle(&self, request: CreateUser, _cancel: CancellationToken) -> String {
            self.log.0.fetch_add(1, Ordering::SeqCst);
            self.users.saved.lock().push(request.0.clone());
            format!("{} user created.", request.0)
        }
    }

    #[derive(FromServices)]
    struct CancellationProbe;

    #[handler]
    #[async_trait]
    impl Handler<CheckCancelled> for CancellationProbe {
        async fn handle(&self, _request: CheckCancelled, cancel: CancellationToken) -> bool {
            cancel.is_cancelled()
        }
    }

    #[derive(FromServices)]
    struct SlowSquare {
        log: Arc<InvocationLog>,
    }

    #[handler]
    #[async_trait]
    impl Handler<Square> for SlowSquare {
        async fn handle(&self, request: Square, _cancel: CancellationToken) -> u64 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.log.0.fetch_add(1, Ordering::SeqCst);
            request.0 * request.0
        }
    }

    fn provider() -> crate::ServiceProvider {
        let mut services = ServiceCollection::new();
        services
            .add_mediator(&[ScanTarget::module(module_path!())])
            .unwrap();
        services.add_singleton(InvocationLog::default());
        services.add_singleton(UserRepository {
            saved: parking_lot::Mutex::new(Vec::new()),
        });
        services.build()
    }

    #[tokio::test]
    async fn test_send_create_user() {
        let provider = provider();
        let mediator = provider.mediator();

        let result = mediator.send(CreateUser("Mars".to_string())).await.unwrap();

        assert_eq!(result, "Mars user created.");
        assert_eq!(provider.require::<InvocationLog>().unwrap().count(), 1);
        assert_eq!(
            *provider.require::<UserRepository>().unwrap().saved.lock(),
            vec!["Mars".to_string()]
        );
    }

    #[tokio::test]
    async fn test_send_unregistered_request() {
        let provider = provider();
        let mediator = provider.mediator();

        let err = mediator.send(Ping).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("handler not found for"));
        assert!(err.to_string().contains("Ping"));
        assert_eq!(provider.require::<InvocationLog>().unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_send_boxed_uses_concrete_type() {
        let mediator = provider().mediator();
        let request: BoxedRequest<String> = Box::new(CreateUser("Venus".to_string()));

        let result = mediator
            .send_boxed(request, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result, "Venus user created.");
    }

    #[tokio::test]
    async fn test_cancellation_passes_through() {
        let mediator = provider().mediator();

        let token = CancellationToken::new();
        assert!(!mediator.send_with(CheckCancelled, token.clone()).await.unwrap());

        token.cancel();
        assert!(mediator.send_with(CheckCancelled, token).await.unwrap());
    }

    #[tokio::test]
    async fn test_each_send_invokes_handler() {
        let provider = provider();
        let mediator = provider.mediator();

        mediator.send(CreateUser("Mars".to_string())).await.unwrap();
        mediator.send(CreateUser("Mars".to_string())).await.unwrap();

        assert_eq!(provider.require::<InvocationLog>().unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_mediator_is_resolvable_service() {
        let provider = provider();
        let mediator = provider.require::<Mediator>().unwrap();
        assert_eq!(mediator.send(Square(3)).await.unwrap(), 9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dispatch() {
        let provider = provider();
        let mediator = provider.mediator();

        let tasks: Vec<_> = (0..32u64)
            .map(|n| {
                let mediator = mediator.clone();
                tokio::spawn(async move { mediator.send(Square(n)).await })
            })
            .collect();

        for (n, task) in tasks.into_iter().enumerate() {
            let n = n as u64;
            assert_eq!(task.await.unwrap().unwrap(), n * n);
        }
        assert_eq!(provider.require::<InvocationLog>().unwrap().count(), 32);
    }

    #[tokio::test]
    async fn test_missing_dependency_surfaces_construction_error() {
        let mut services = ServiceCollection::new();
        services
            .add_mediator(&[ScanTarget::module(module_path!())])
            .unwrap();
        let mediator = services.build().mediator();

        let err = mediator.send(CreateUser("Mars".to_string())).await.unwrap_err();
        assert!(matches!(err, DispatchError::Construction(_)));
    }

    // A resolver that hands out whatever instance it was given, for any key.
    struct FixedResolver(HandlerInstance);

    impl InstanceResolver for FixedResolver {
        fn resolve(&self, _key: &DispatchKey) -> ConstructResult<Option<HandlerInstance>> {
            Ok(Some(Arc::clone(&self.0)))
        }
    }

    #[tokio::test]
    async fn test_mismatched_instance_is_method_not_found() {
        let instance = TypedHandler::<CancellationProbe, CheckCancelled>::erase(CancellationProbe);
        let mediator = Mediator::new(Arc::new(FixedResolver(instance)));

        let err = mediator.send(Ping).await.unwrap_err();
        assert!(matches!(err, DispatchError::HandlerMethodNotFound { .. }));
    }

    struct BrokenHandler;

    impl ErasedHandler for BrokenHandler {
        fn handler_name(&self) -> &'static str {
            "BrokenHandler"
        }

        fn key(&self) -> DispatchKey {
            DispatchKey::of::<Ping, String>()
        }

        fn invoke(
            self: Arc<Self>,
            _request: Box<dyn Any + Send>,
            _cancel: CancellationToken,
        ) -> DispatchResult<Invocation> {
            Ok(Invocation::opaque(42u8))
        }
    }

    #[tokio::test]
    async fn test_non_future_result_is_unexpected_return_type() {
        let mediator = Mediator::new(Arc::new(FixedResolver(Arc::new(BrokenHandler))));

        let err = mediator.send(Ping).await.unwrap_err();
        match err {
            DispatchError::UnexpectedReturnType { actual, .. } => assert_eq!(actual, "u8"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
