//! Handler discovery and registration.
//!
//! Every `impl Handler<R> for H` annotated with `#[handler]` contributes one
//! [`HandlerDescriptor`] to the [`HANDLERS`] distributed slice at link time.
//! At composition time a [`HandlerRegistry`] walks those descriptors (or an
//! explicit list), enforces that each `(request, response)` key is claimed by
//! at most one handler type, and binds the survivors into a
//! [`HandlerRegistrar`].
//!
//! # Scan targets
//!
//! Descriptors remember the module they were declared in, so a registration
//! pass can be limited to a crate or module, much like scanning a single
//! library:
//!
//! ```rust,ignore
//! let mut services = ServiceCollection::new();
//! services.add_mediator(&[ScanTarget::module("billing"), ScanTarget::module("users::admin")])?;
//! ```

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use linkme::distributed_slice;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::container::{BoundHandler, FromServices, HandlerRegistrar, Lifetime, ServiceProvider};
use crate::error::{ConstructResult, RegistrationError, RegistrationResult};
use crate::handler::{Handler, HandlerInstance, TypedHandler};
use crate::key::DispatchKey;
use crate::request::Request;

// =============================================================================
// Descriptors
// =============================================================================

/// Static description of one handler binding.
///
/// Built by the `#[handler]` attribute, or by hand with
/// [`HandlerDescriptor::of`] for explicit registration lists.
#[derive(Clone, Copy)]
pub struct HandlerDescriptor {
    module_path: &'static str,
    handler_type: fn() -> TypeId,
    handler_name: fn() -> &'static str,
    key: fn() -> DispatchKey,
    create: fn(&ServiceProvider) -> ConstructResult<HandlerInstance>,
}

impl HandlerDescriptor {
    /// Describes the binding of handler `H` for request `R`.
    pub const fn of<H, R>(module_path: &'static str) -> Self
    where
        H: Handler<R> + FromServices,
        R: Request,
    {
        Self {
            module_path,
            handler_type: TypeId::of::<H>,
            handler_name: type_name::<H>,
            key: DispatchKey::of::<R, R::Response>,
            create: TypedHandler::<H, R>::construct,
        }
    }

    /// Module the handler impl was declared in.
    pub fn module_path(&self) -> &'static str {
        self.module_path
    }

    /// Fully qualified handler type name.
    pub fn handler_name(&self) -> &'static str {
        (self.handler_name)()
    }

    /// Identity of the handler type, compared by `TypeId`.
    pub fn handler(&self) -> BoundHandler {
        BoundHandler::new((self.handler_type)(), self.handler_name())
    }

    /// The key this handler answers.
    pub fn key(&self) -> DispatchKey {
        (self.key)()
    }

    /// Builds an instance from `services`.
    pub fn create(&self, services: &ServiceProvider) -> ConstructResult<HandlerInstance> {
        (self.create)(services)
    }
}

impl std::fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("handler", &self.handler_name())
            .field("key", &self.key())
            .field("module_path", &self.module_path)
            .finish()
    }
}

/// Every handler descriptor linked into the binary.
#[distributed_slice]
pub static HANDLERS: [HandlerDescriptor];

// =============================================================================
// Scan targets
// =============================================================================

/// Selects which linked descriptors a registration pass considers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScanTarget {
    /// Every descriptor in the binary.
    All,
    /// Descriptors declared in this module or any module below it.
    ///
    /// Prefixes match on `::` boundaries, so `users` matches
    /// `users::admin` but not `users_v2`.
    Module(String),
}

impl ScanTarget {
    /// Targets a crate (`"billing"`) or module (`"billing::invoices"`).
    pub fn module(path: impl Into<String>) -> Self {
        Self::Module(path.into())
    }

    /// Returns `true` if a descriptor declared in `module_path` is selected.
    pub fn matches(&self, module_path: &str) -> bool {
        match self {
            Self::All => true,
            Self::Module(prefix) => module_path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::")),
        }
    }
}

impl From<&str> for ScanTarget {
    fn from(path: &str) -> Self {
        match path {
            "*" => Self::All,
            _ => Self::module(path),
        }
    }
}

impl std::fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Module(path) => f.write_str(path),
        }
    }
}

/// Iterates the linked descriptors selected by `targets`.
pub fn linked_handlers(targets: &[ScanTarget]) -> impl Iterator<Item = &'static HandlerDescriptor> + '_ {
    HANDLERS.iter().filter(move |descriptor| {
        targets
            .iter()
            .any(|target| target.matches(descriptor.module_path()))
    })
}

// =============================================================================
// Registry
// =============================================================================

/// What to do when two distinct handler types claim the same key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail the registration pass with
    /// [`RegistrationError::DuplicateHandlerBinding`].
    #[default]
    Reject,
    /// Keep the last registration and log a warning.
    Replace,
}

/// Outcome of one registration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Bindings installed into the registrar.
    pub registered: usize,
    /// Installed bindings that displaced another handler type.
    pub replaced: usize,
    /// Candidates skipped because the same handler was already bound.
    pub skipped: usize,
}

impl RegistrationReport {
    fn absorb(&mut self, other: RegistrationReport) {
        self.registered += other.registered;
        self.replaced += other.replaced;
        self.skipped += other.skipped;
    }
}

impl std::ops::Add for RegistrationReport {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self.absorb(other);
        self
    }
}

impl std::fmt::Display for RegistrationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} registered, {} replaced, {} skipped",
            self.registered, self.replaced, self.skipped
        )
    }
}

/// Turns candidate descriptors into unique handler bindings.
///
/// The registry remembers every key it has bound, so several passes over
/// overlapping targets stay consistent: re-binding the same handler type is a
/// no-op, and a different type for a known key is a duplicate.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    policy: DuplicatePolicy,
    lifetime: Lifetime,
    bindings: HashMap<DispatchKey, BoundHandler>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new(policy: DuplicatePolicy, lifetime: Lifetime) -> Self {
        Self {
            policy,
            lifetime,
            bindings: HashMap::new(),
        }
    }

    /// Sets the duplicate policy (builder pattern).
    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the handler lifetime (builder pattern).
    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Sets the duplicate policy for later passes.
    pub fn set_policy(&mut self, policy: DuplicatePolicy) {
        self.policy = policy;
    }

    /// Sets the lifetime used for later bindings.
    pub fn set_lifetime(&mut self, lifetime: Lifetime) {
        self.lifetime = lifetime;
    }

    /// The active duplicate policy.
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// The lifetime new bindings are registered with.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Handler type currently bound under `key`.
    pub fn handler_for(&self, key: &DispatchKey) -> Option<&'static str> {
        self.bindings.get(key).map(BoundHandler::name)
    }

    /// All bindings made so far.
    pub fn bindings(&self) -> impl Iterator<Item = (&DispatchKey, &'static str)> {
        self.bindings.iter().map(|(key, handler)| (key, handler.name()))
    }

    /// Number of bound keys.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing has been bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Binds every linked handler selected by `targets`.
    pub fn scan(
        &mut self,
        registrar: &mut dyn HandlerRegistrar,
        targets: &[ScanTarget],
    ) -> RegistrationResult<RegistrationReport> {
        let candidates: Vec<&HandlerDescriptor> = linked_handlers(targets).collect();
        debug!(
            targets = ?targets.iter().map(ToString::to_string).collect::<Vec<_>>(),
            candidates = candidates.len(),
            "Scanning for handlers"
        );
        self.register_handlers(registrar, candidates)
    }

    /// Binds `candidates` into `registrar`.
    ///
    /// The pass is validated before anything is installed: under
    /// [`DuplicatePolicy::Reject`] a conflicting candidate fails the whole
    /// pass and leaves both the registry and the registrar untouched.
    /// Conflicts are checked against this pass, the registrar's existing
    /// bindings (whoever made them) and this registry's earlier passes.
    pub fn register_handlers<'a, I>(
        &mut self,
        registrar: &mut dyn HandlerRegistrar,
        candidates: I,
    ) -> RegistrationResult<RegistrationReport>
    where
        I: IntoIterator<Item = &'a HandlerDescriptor>,
    {
        let mut report = RegistrationReport::default();
        let mut plan: Vec<&HandlerDescriptor> = Vec::new();
        let mut planned: HashMap<DispatchKey, usize> = HashMap::new();

        for descriptor in candidates {
            let key = descriptor.key();
            let incoming = descriptor.handler();
            let existing = planned
                .get(&key)
                .map(|&index| plan[index].handler())
                .or_else(|| registrar.bound(&key))
                .or_else(|| self.bindings.get(&key).copied());

            match existing {
                Some(existing) if existing == incoming => {
                    debug!(handler = incoming.name(), %key, "Handler already bound, skipping");
                    report.skipped += 1;
                    continue;
                }
                Some(existing) => match self.policy {
                    DuplicatePolicy::Reject => {
                        return Err(RegistrationError::DuplicateHandlerBinding {
                            key,
                            existing: existing.name(),
                            incoming: incoming.name(),
                        });
                    }
                    DuplicatePolicy::Replace => {
                        warn!(
                            %key,
                            prev_handler = existing.name(),
                            new_handler = incoming.name(),
                            "Duplicate handler binding, last registration wins"
                        );
                        report.replaced += 1;
                    }
                },
                None => {}
            }

            match planned.get(&key) {
                Some(&index) => plan[index] = descriptor,
                None => {
                    planned.insert(key, plan.len());
                    plan.push(descriptor);
                }
            }
        }

        for descriptor in plan {
            let key = descriptor.key();
            let handler = descriptor.handler();
            let displaced =
                registrar.register(key, handler, Arc::new(descriptor.create), self.lifetime);
            self.bindings.insert(key, handler);
            match displaced {
                Some(previous) => debug!(
                    handler = handler.name(),
                    previous = previous.name(),
                    %key,
                    lifetime = %self.lifetime,
                    "Rebound handler"
                ),
                None => debug!(
                    handler = handler.name(),
                    %key,
                    lifetime = %self.lifetime,
                    "Bound handler"
                ),
            }
            report.registered += 1;
        }

        info!(%report, total = self.bindings.len(), "Handler registration complete");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ServiceCollection;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct Lookup;

    impl Request for Lookup {
        type Response = u64;
    }

    struct Scanned;

    impl Request for Scanned {
        type Response = ();
    }

    macro_rules! unit_handler {
        ($name:ident, $request:ty, $value:expr) => {
            struct $name;

            impl FromServices for $name {
                fn from_services(_: &ServiceProvider) -> ConstructResult<Self> {
                    Ok($name)
                }
            }

            #[async_trait]
            impl Handler<$request> for $name {
                async fn handle(
                    &self,
                    _request: $request,
                    _cancel: CancellationToken,
                ) -> <$request as Request>::Response {
                    $value
                }
            }
        };
    }

    unit_handler!(PrimaryLookup, Lookup, 1);
    unit_handler!(SecondaryLookup, Lookup, 2);
    unit_handler!(ScannedHandler, Scanned, ());

    #[distributed_slice(HANDLERS)]
    static SCANNED_HANDLER: HandlerDescriptor =
        HandlerDescriptor::of::<ScannedHandler, Scanned>(module_path!());

    const PRIMARY: HandlerDescriptor = HandlerDescriptor::of::<PrimaryLookup, Lookup>(module_path!());
    const SECONDARY: HandlerDescriptor =
        HandlerDescriptor::of::<SecondaryLookup, Lookup>(module_path!());

    #[test]
    fn test_scan_target_matches_on_module_boundaries() {
        let target = ScanTarget::module("users");
        assert!(target.matches("users"));
        assert!(target.matches("users::admin"));
        assert!(!target.matches("users_v2"));
        assert!(!target.matches("billing::users"));
        assert!(ScanTarget::All.matches("anything"));
        assert_eq!(ScanTarget::from("*"), ScanTarget::All);
    }

    #[test]
    fn test_scan_finds_linked_descriptor() {
        let mut services = ServiceCollection::new();
        let mut registry = HandlerRegistry::default();

        let report = registry
            .scan(&mut services, &[ScanTarget::module(module_path!())])
            .unwrap();

        assert_eq!(report.registered, 1);
        assert_eq!(
            registry.handler_for(&DispatchKey::of::<Scanned, ()>()),
            Some(type_name::<ScannedHandler>())
        );
    }

    #[test]
    fn test_scan_ignores_other_modules() {
        let mut services = ServiceCollection::new();
        let mut registry = HandlerRegistry::default();

        let report = registry
            .scan(&mut services, &[ScanTarget::module("mediator_core::registry::elsewhere")])
            .unwrap();

        assert_eq!(report.registered, 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_rejected_and_nothing_installed() {
        let mut services = ServiceCollection::new();
        let mut registry = HandlerRegistry::default();

        let err = registry
            .register_handlers(&mut services, [&PRIMARY, &SECONDARY])
            .unwrap_err();

        match err {
            RegistrationError::DuplicateHandlerBinding {
                existing, incoming, ..
            } => {
                assert!(existing.ends_with("PrimaryLookup"));
                assert!(incoming.ends_with("SecondaryLookup"));
            }
        }
        assert!(registry.is_empty());
        assert_eq!(services.handler_count(), 0);
    }

    #[test]
    fn test_duplicate_against_earlier_pass_rejected() {
        let mut services = ServiceCollection::new();
        let mut registry = HandlerRegistry::default();

        registry.register_handlers(&mut services, [&PRIMARY]).unwrap();
        assert!(registry.register_handlers(&mut services, [&SECONDARY]).is_err());
        assert_eq!(
            registry.handler_for(&DispatchKey::of::<Lookup, u64>()),
            Some(type_name::<PrimaryLookup>())
        );
    }

    #[test]
    fn test_duplicate_against_other_registry_rejected() {
        let mut services = ServiceCollection::new();
        HandlerRegistry::default()
            .register_handlers(&mut services, [&PRIMARY])
            .unwrap();

        let mut second = HandlerRegistry::default();
        let err = second
            .register_handlers(&mut services, [&SECONDARY])
            .unwrap_err();

        assert!(matches!(
            err,
            RegistrationError::DuplicateHandlerBinding { existing, .. }
                if existing.ends_with("PrimaryLookup")
        ));
        assert!(second.is_empty());
        assert_eq!(
            services.bound(&DispatchKey::of::<Lookup, u64>()),
            Some(PRIMARY.handler())
        );
    }

    #[test]
    fn test_binding_made_outside_registry_rejected() {
        let mut services = ServiceCollection::new();
        services.register(
            PRIMARY.key(),
            PRIMARY.handler(),
            Arc::new(PRIMARY.create),
            Lifetime::Transient,
        );

        let mut registry = HandlerRegistry::default();
        assert!(registry.register_handlers(&mut services, [&SECONDARY]).is_err());

        // The same handler type already in the container is skipped.
        let report = registry.register_handlers(&mut services, [&PRIMARY]).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.registered, 0);
    }

    #[test]
    fn test_replace_across_registries_counts_replacement() {
        let mut services = ServiceCollection::new();
        HandlerRegistry::default()
            .register_handlers(&mut services, [&PRIMARY])
            .unwrap();

        let report = HandlerRegistry::default()
            .with_policy(DuplicatePolicy::Replace)
            .register_handlers(&mut services, [&SECONDARY])
            .unwrap();

        assert_eq!(report.replaced, 1);
        assert_eq!(
            services.bound(&DispatchKey::of::<Lookup, u64>()),
            Some(SECONDARY.handler())
        );
    }

    #[test]
    fn test_descriptor_identity_uses_type_id() {
        assert_eq!(PRIMARY.handler().type_id(), TypeId::of::<PrimaryLookup>());
        assert_ne!(PRIMARY.handler(), SECONDARY.handler());
        assert_eq!(PRIMARY.handler().name(), type_name::<PrimaryLookup>());
    }

    #[test]
    fn test_replace_policy_last_wins() {
        let mut services = ServiceCollection::new();
        let mut registry = HandlerRegistry::default().with_policy(DuplicatePolicy::Replace);

        let report = registry
            .register_handlers(&mut services, [&PRIMARY, &SECONDARY])
            .unwrap();

        assert_eq!(report.registered, 1);
        assert_eq!(report.replaced, 1);
        assert_eq!(services.handler_count(), 1);
        assert_eq!(
            registry.handler_for(&DispatchKey::of::<Lookup, u64>()),
            Some(type_name::<SecondaryLookup>())
        );
    }

    #[test]
    fn test_same_handler_twice_is_skipped() {
        let mut services = ServiceCollection::new();
        let mut registry = HandlerRegistry::default();

        registry.register_handlers(&mut services, [&PRIMARY]).unwrap();
        let report = registry
            .register_handlers(&mut services, [&PRIMARY, &PRIMARY])
            .unwrap();

        assert_eq!(report.registered, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_report_display() {
        let report = RegistrationReport {
            registered: 3,
            replaced: 1,
            skipped: 0,
        } + RegistrationReport {
            registered: 1,
            replaced: 0,
            skipped: 2,
        };
        assert_eq!(report.to_string(), "4 registered, 1 replaced, 2 skipped");
    }
}
