//! Composition-phase builder.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::{BoundHandler, FromServices, HandlerRegistrar, Lifetime, Recipe, ServiceArc, ServiceProvider, Slot};
use crate::dispatcher::Mediator;
use crate::error::{ConstructResult, RegistrationResult};
use crate::handler::HandlerInstance;
use crate::key::DispatchKey;
use crate::registry::{HandlerDescriptor, HandlerRegistry, RegistrationReport, ScanTarget};

/// Mutable registration surface for services and handlers.
///
/// # Example
///
/// ```rust,ignore
/// let mut services = ServiceCollection::new();
/// services.add_mediator(&[ScanTarget::module("create_user")])?;
/// services.add_transient::<UserRepository>();
///
/// let provider = services.build();
/// let mediator = provider.mediator();
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    services: HashMap<TypeId, Slot<ServiceArc>>,
    handlers: HashMap<DispatchKey, Slot<HandlerInstance>>,
    bound: HashMap<DispatchKey, BoundHandler>,
    registry: HandlerRegistry,
}

impl ServiceCollection {
    /// Creates an empty collection with the default registry policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty collection that registers handlers through `registry`.
    pub fn with_registry(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    /// The registry used by [`add_mediator`](Self::add_mediator) and
    /// [`add_handlers`](Self::add_handlers).
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Mutable access to the registry, e.g. to change its duplicate policy.
    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    // -------------------------------------------------------------------------
    // Services
    // -------------------------------------------------------------------------

    /// Registers an already built shared service.
    pub fn add_singleton<T>(&mut self, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        let value: ServiceArc = Arc::new(value);
        self.insert_service::<T>(Slot::ready(type_name::<T>(), value))
    }

    /// Registers a shared service built lazily on first use.
    pub fn add_singleton_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> ConstructResult<T> + Send + Sync + 'static,
    {
        self.add_service_with(Lifetime::Singleton, factory)
    }

    /// Registers a service built through its [`FromServices`] impl on every
    /// resolution.
    pub fn add_transient<T>(&mut self) -> &mut Self
    where
        T: FromServices + Send + Sync + 'static,
    {
        self.add_service_with(Lifetime::Transient, T::from_services)
    }

    /// Registers a service built by `factory` on every resolution.
    pub fn add_transient_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> ConstructResult<T> + Send + Sync + 'static,
    {
        self.add_service_with(Lifetime::Transient, factory)
    }

    fn add_service_with<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> ConstructResult<T> + Send + Sync + 'static,
    {
        let build = Arc::new(move |services: &ServiceProvider| {
            factory(services).map(|value| Arc::new(value) as ServiceArc)
        });
        self.insert_service::<T>(Slot::new(type_name::<T>(), lifetime, build))
    }

    fn insert_service<T: Any>(&mut self, slot: Slot<ServiceArc>) -> &mut Self {
        trace!(service = slot.name(), lifetime = %slot.lifetime(), "Registered service");
        self.services.insert(TypeId::of::<T>(), slot);
        self
    }

    /// Returns `true` if a service of type `T` has been registered.
    pub fn contains<T: Any>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered services (handlers excluded).
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    // -------------------------------------------------------------------------
    // Handlers
    // -------------------------------------------------------------------------

    /// Makes [`Mediator`] resolvable and binds every linked handler that
    /// lives under one of `targets`.
    ///
    /// May be called more than once; the registry keeps track of what has
    /// already been bound.
    pub fn add_mediator(&mut self, targets: &[ScanTarget]) -> RegistrationResult<RegistrationReport> {
        if !self.contains::<Mediator>() {
            self.add_transient_with(|services: &ServiceProvider| Ok(services.mediator()));
        }

        let mut registry = std::mem::take(&mut self.registry);
        let report = registry.scan(self, targets);
        self.registry = registry;
        report
    }

    /// Binds an explicit list of handler descriptors.
    pub fn add_handlers<'a, I>(&mut self, candidates: I) -> RegistrationResult<RegistrationReport>
    where
        I: IntoIterator<Item = &'a HandlerDescriptor>,
    {
        let mut registry = std::mem::take(&mut self.registry);
        let report = registry.register_handlers(self, candidates);
        self.registry = registry;
        report
    }

    /// Number of handler bindings.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Freezes the collection into a [`ServiceProvider`].
    pub fn build(self) -> ServiceProvider {
        debug!(
            services = self.services.len(),
            handlers = self.handlers.len(),
            "Building service provider"
        );
        ServiceProvider::new(self.services, self.handlers)
    }
}

impl HandlerRegistrar for ServiceCollection {
    fn bound(&self, key: &DispatchKey) -> Option<BoundHandler> {
        self.bound.get(key).copied()
    }

    fn register(
        &mut self,
        key: DispatchKey,
        handler: BoundHandler,
        recipe: Recipe,
        lifetime: Lifetime,
    ) -> Option<BoundHandler> {
        self.handlers.insert(key, Slot::new(handler.name(), lifetime, recipe));
        self.bound.insert(key, handler)
    }
}

impl std::fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("service_count", &self.services.len())
            .field("handler_count", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConstructError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Clock(u64);

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[test]
    fn test_singleton_is_shared() {
        let mut services = ServiceCollection::new();
        services.add_singleton(Counter::default());
        let provider = services.build();

        let a = provider.require::<Counter>().unwrap();
        let b = provider.require::<Counter>().unwrap();
        a.0.fetch_add(1, Ordering::SeqCst);
        assert_eq!(b.0.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_transient_is_fresh() {
        let mut services = ServiceCollection::new();
        services.add_transient_with(|_| Ok(Counter::default()));
        let provider = services.build();

        let a = provider.require::<Counter>().unwrap();
        let b = provider.require::<Counter>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_lazy_singleton_built_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&builds);

        let mut services = ServiceCollection::new();
        services.add_singleton_with(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(Clock(7))
        });
        let provider = services.build();

        assert_eq!(builds.load(Ordering::SeqCst), 0);
        assert_eq!(provider.require::<Clock>().unwrap().0, 7);
        assert_eq!(provider.require::<Clock>().unwrap().0, 7);
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_service() {
        let provider = ServiceCollection::new().build();
        assert!(provider.get::<Clock>().unwrap().is_none());
        assert!(matches!(
            provider.require::<Clock>(),
            Err(ConstructError::MissingService { .. })
        ));
    }

    #[test]
    fn test_factory_error_propagates() {
        let mut services = ServiceCollection::new();
        services.add_transient_with::<Clock, _>(|_| Err(ConstructError::custom::<Clock>("no tick")));
        let provider = services.build();

        let err = provider.require::<Clock>().err().unwrap();
        assert!(err.to_string().contains("no tick"));
    }
}
