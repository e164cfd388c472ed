//! Resolution-phase container.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use super::{InstanceResolver, Lifetime, ServiceArc, Slot};
use crate::dispatcher::Mediator;
use crate::error::{ConstructError, ConstructResult};
use crate::handler::HandlerInstance;
use crate::key::DispatchKey;

struct ProviderInner {
    services: HashMap<TypeId, Slot<ServiceArc>>,
    handlers: HashMap<DispatchKey, Slot<HandlerInstance>>,
}

/// Read-only container produced by [`ServiceCollection::build`](super::ServiceCollection::build).
///
/// Cloning is cheap; all clones share the same registrations and singleton
/// instances.
///
/// # Thread Safety
///
/// `ServiceProvider` is `Send + Sync`. After `build` nothing can be
/// registered, so concurrent resolution needs no coordination beyond the
/// per-singleton cache lock.
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    pub(crate) fn new(
        services: HashMap<TypeId, Slot<ServiceArc>>,
        handlers: HashMap<DispatchKey, Slot<HandlerInstance>>,
    ) -> Self {
        Self {
            inner: Arc::new(ProviderInner { services, handlers }),
        }
    }

    /// Resolves a service, returning `Ok(None)` if it was never registered.
    pub fn get<T>(&self) -> ConstructResult<Option<Arc<T>>>
    where
        T: Send + Sync + 'static,
    {
        let Some(slot) = self.inner.services.get(&TypeId::of::<T>()) else {
            return Ok(None);
        };

        slot.get(self)?
            .downcast::<T>()
            .map(Some)
            .map_err(|_| ConstructError::ServiceTypeMismatch {
                service: type_name::<T>(),
            })
    }

    /// Resolves a service that must be registered.
    pub fn require<T>(&self) -> ConstructResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.get::<T>()?.ok_or(ConstructError::MissingService {
            service: type_name::<T>(),
        })
    }

    /// Returns `true` if a service of type `T` is registered.
    pub fn contains<T: Any>(&self) -> bool {
        self.inner.services.contains_key(&TypeId::of::<T>())
    }

    /// Returns `true` if a handler is bound under `key`.
    pub fn has_handler(&self, key: &DispatchKey) -> bool {
        self.inner.handlers.contains_key(key)
    }

    /// Type name of the handler bound under `key`, if any.
    pub fn handler_name(&self, key: &DispatchKey) -> Option<&'static str> {
        self.inner.handlers.get(key).map(Slot::name)
    }

    /// Lifetime of the handler bound under `key`, if any.
    pub fn handler_lifetime(&self, key: &DispatchKey) -> Option<Lifetime> {
        self.inner.handlers.get(key).map(Slot::lifetime)
    }

    /// Number of handler bindings.
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.len()
    }

    /// Creates a [`Mediator`] that resolves handlers from this provider.
    pub fn mediator(&self) -> Mediator {
        Mediator::new(Arc::new(self.clone()))
    }
}

impl InstanceResolver for ServiceProvider {
    fn resolve(&self, key: &DispatchKey) -> ConstructResult<Option<HandlerInstance>> {
        match self.inner.handlers.get(key) {
            Some(slot) => {
                trace!(handler = slot.name(), %key, "Resolving handler");
                slot.get(self).map(Some)
            }
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("service_count", &self.inner.services.len())
            .field("handler_count", &self.inner.handlers.len())
            .finish()
    }
}
