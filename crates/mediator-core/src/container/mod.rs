//! Instance container backing the mediator.
//!
//! The container has an explicit two-phase lifecycle:
//!
//! 1. **Composition**: a [`ServiceCollection`] is filled with services and
//!    handler bindings on a single thread.
//! 2. **Resolution**: [`ServiceCollection::build`] freezes it into a
//!    [`ServiceProvider`], which is immutable, cheap to clone and safe to use
//!    from any number of concurrent dispatches.
//!
//! The dispatcher only sees the container through [`InstanceResolver`]; the
//! handler registry only sees it through [`HandlerRegistrar`]. Either side can
//! be swapped for another container.

mod collection;
mod provider;

use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ConstructResult;
use crate::handler::HandlerInstance;
use crate::key::DispatchKey;

pub use collection::ServiceCollection;
pub use provider::ServiceProvider;

/// Type-erased service value stored in the container.
pub(crate) type ServiceArc = Arc<dyn Any + Send + Sync>;

/// Construction recipe for a handler bound under a [`DispatchKey`].
pub type Recipe = Arc<dyn Fn(&ServiceProvider) -> ConstructResult<HandlerInstance> + Send + Sync>;

// =============================================================================
// Lifetime
// =============================================================================

/// How long a resolved instance lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// A fresh instance for every resolution.
    #[default]
    Transient,
    /// One instance, built on first resolution and shared afterwards.
    Singleton,
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient => f.write_str("transient"),
            Self::Singleton => f.write_str("singleton"),
        }
    }
}

// =============================================================================
// Collaborator traits
// =============================================================================

/// Constructor injection: builds `Self` from registered services.
///
/// Usually derived:
///
/// ```rust,ignore
/// #[derive(FromServices)]
/// pub struct CreateUserHandler {
///     users: Arc<UserRepository>,
///     #[inject(default)]
///     greeting: String,
/// }
/// ```
pub trait FromServices: Sized {
    /// Builds a new value, resolving dependencies from `services`.
    fn from_services(services: &ServiceProvider) -> ConstructResult<Self>;
}

/// Identity of the handler type behind a binding.
///
/// Equality compares the `TypeId` only; the name is kept for logs and errors.
#[derive(Debug, Clone, Copy)]
pub struct BoundHandler {
    type_id: TypeId,
    name: &'static str,
}

impl BoundHandler {
    /// Identity of handler type `H`.
    pub fn of<H: Any>() -> Self {
        Self {
            type_id: TypeId::of::<H>(),
            name: type_name::<H>(),
        }
    }

    /// Builds an identity from its parts.
    pub fn new(type_id: TypeId, name: &'static str) -> Self {
        Self { type_id, name }
    }

    /// The handler's `TypeId`.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified handler type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for BoundHandler {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for BoundHandler {}

/// Composition-time side of the container: accepts handler bindings.
pub trait HandlerRegistrar {
    /// Handler currently bound under `key`, if any.
    fn bound(&self, key: &DispatchKey) -> Option<BoundHandler>;

    /// Binds `key` to a construction recipe.
    ///
    /// A later binding for the same key overwrites the earlier one and the
    /// displaced handler is returned. Uniqueness policy is enforced by
    /// [`HandlerRegistry`](crate::HandlerRegistry), which consults
    /// [`bound`](Self::bound) before writing.
    fn register(
        &mut self,
        key: DispatchKey,
        handler: BoundHandler,
        recipe: Recipe,
        lifetime: Lifetime,
    ) -> Option<BoundHandler>;
}

/// Resolution-time side of the container: hands out handler instances.
pub trait InstanceResolver: Send + Sync {
    /// Resolves one instance bound to `key`, or `None` if nothing is bound.
    fn resolve(&self, key: &DispatchKey) -> ConstructResult<Option<HandlerInstance>>;
}

// =============================================================================
// Slot (internal)
// =============================================================================

type Build<T> = Arc<dyn Fn(&ServiceProvider) -> ConstructResult<T> + Send + Sync>;

/// One registered entry: a builder plus the lifetime-dependent cache.
pub(crate) struct Slot<T> {
    name: &'static str,
    lifetime: Lifetime,
    build: Build<T>,
    cached: Mutex<Option<T>>,
}

impl<T: Clone> Slot<T> {
    pub(crate) fn new(name: &'static str, lifetime: Lifetime, build: Build<T>) -> Self {
        Self {
            name,
            lifetime,
            build,
            cached: Mutex::new(None),
        }
    }

    /// A singleton slot that already holds its value.
    pub(crate) fn ready(name: &'static str, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        let stored = value.clone();
        Self {
            name,
            lifetime: Lifetime::Singleton,
            build: Arc::new(move |_| Ok(stored.clone())),
            cached: Mutex::new(Some(value)),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Produces a value according to the slot's lifetime.
    ///
    /// Singletons are built outside the lock so a factory may resolve other
    /// singletons; if two threads race, the first stored value wins.
    pub(crate) fn get(&self, provider: &ServiceProvider) -> ConstructResult<T> {
        match self.lifetime {
            Lifetime::Transient => (self.build)(provider),
            Lifetime::Singleton => {
                if let Some(value) = self.cached.lock().as_ref() {
                    return Ok(value.clone());
                }
                let built = (self.build)(provider)?;
                let mut cached = self.cached.lock();
                Ok(cached.get_or_insert(built).clone())
            }
        }
    }
}
