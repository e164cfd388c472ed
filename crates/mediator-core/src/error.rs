//! Unified error types for the mediator core.
//!
//! Errors are split by the phase in which they occur:
//!
//! - [`RegistrationError`]: at composition time, while handlers are bound.
//! - [`ConstructError`]: whenever the container builds a handler or one of
//!   its dependencies.
//! - [`DispatchError`]: for every individual `send` call.

use thiserror::Error;

use crate::key::DispatchKey;

// =============================================================================
// Construction Errors
// =============================================================================

/// Errors that can occur while the container builds an instance.
#[derive(Debug, Clone, Error)]
pub enum ConstructError {
    /// A required service was never registered.
    #[error("service '{service}' is not registered")]
    MissingService {
        /// Type name of the missing service.
        service: &'static str,
    },

    /// A factory returned a value of a different type than it was registered for.
    #[error("service '{service}' was built with an unexpected type")]
    ServiceTypeMismatch {
        /// Type name the service was registered under.
        service: &'static str,
    },

    /// Custom construction failure raised by a factory.
    #[error("failed to construct '{target}': {reason}")]
    Custom {
        /// Type name of the value being constructed.
        target: &'static str,
        /// Reason for failure.
        reason: String,
    },
}

impl ConstructError {
    /// Creates a custom construction error for `T`.
    pub fn custom<T: ?Sized>(reason: impl Into<String>) -> Self {
        Self::Custom {
            target: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Registration Errors
// =============================================================================

/// Errors raised while handlers are registered.
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    /// Two distinct handler types claim the same dispatch key.
    #[error("duplicate handler binding for {key}: '{existing}' and '{incoming}'")]
    DuplicateHandlerBinding {
        /// The contested key.
        key: DispatchKey,
        /// Handler that was bound first.
        existing: &'static str,
        /// Handler that attempted to bind the same key.
        incoming: &'static str,
    },
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors returned by [`Mediator::send`](crate::Mediator::send) and friends.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No binding exists for the derived dispatch key.
    #[error("handler not found for {request} (response {response})")]
    HandlerNotFound {
        /// Concrete request type name.
        request: &'static str,
        /// Requested response type name.
        response: &'static str,
    },

    /// The resolved instance does not handle the derived key.
    #[error("handler '{handler}' has no handle operation for {key}")]
    HandlerMethodNotFound {
        /// Type name of the resolved handler.
        handler: &'static str,
        /// The key the dispatcher was looking for.
        key: DispatchKey,
    },

    /// The handler produced something other than a future of the response type.
    #[error("handler '{handler}' returned unexpected type {actual}, expected {expected}")]
    UnexpectedReturnType {
        /// Type name of the resolved handler.
        handler: &'static str,
        /// Type the dispatcher expected.
        expected: &'static str,
        /// Description of what was actually returned.
        actual: String,
    },

    /// The handler or one of its dependencies could not be constructed.
    #[error(transparent)]
    Construction(#[from] ConstructError),
}

impl DispatchError {
    /// Returns `true` if this error means no handler is bound for the request.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::HandlerNotFound { .. })
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for construction operations.
pub type ConstructResult<T> = Result<T, ConstructError>;

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
