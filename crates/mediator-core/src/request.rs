//! Request types.
//!
//! A request is any value whose type names the response it expects:
//!
//! ```rust,ignore
//! use mediator_core::Request;
//!
//! #[derive(Request)]
//! #[request(response = String)]
//! pub struct CreateUser {
//!     pub name: String,
//! }
//! ```
//!
//! Callers may hold requests through the type-erased [`BoxedRequest<T>`]
//! form; the dispatcher always keys the lookup by the *concrete* type behind
//! the box, never by the box itself.

use std::any::{Any, TypeId, type_name};

/// Runtime type information for a request, available through trait objects.
///
/// Implemented for every `Send + 'static` type; never implement it by hand.
pub trait AnyRequest: Send + 'static {
    /// [`TypeId`] of the concrete request type.
    fn request_type_id(&self) -> TypeId;

    /// Fully qualified name of the concrete request type.
    fn request_type_name(&self) -> &'static str;

    /// Converts the boxed request into a `Box<dyn Any>` for downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Any + Send> AnyRequest for T {
    fn request_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn request_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// A value that expects exactly one response type from its handler.
pub trait Request: AnyRequest {
    /// The type a handler produces for this request.
    type Response: Send + 'static;
}

/// A request whose concrete type has been erased.
pub type BoxedRequest<T> = Box<dyn Request<Response = T>>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Greet;

    impl Request for Greet {
        type Response = String;
    }

    #[test]
    fn test_erased_request_reports_concrete_type() {
        let boxed: BoxedRequest<String> = Box::new(Greet);
        assert_eq!((*boxed).request_type_id(), TypeId::of::<Greet>());
        assert!((*boxed).request_type_name().ends_with("Greet"));
    }

    #[test]
    fn test_into_any_downcasts_to_concrete_type() {
        let boxed: BoxedRequest<String> = Box::new(Greet);
        let any = AnyRequest::into_any(boxed);
        assert!(any.downcast::<Greet>().is_ok());
    }
}
