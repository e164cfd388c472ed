//! Dispatch keys.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// The `(request type, response type)` pair a handler is bound under.
///
/// Equality and hashing only consider the two [`TypeId`]s; the type names are
/// carried along for log output and error messages.
#[derive(Clone, Copy)]
pub struct DispatchKey {
    request: TypeId,
    response: TypeId,
    request_name: &'static str,
    response_name: &'static str,
}

impl DispatchKey {
    /// Builds the key for a statically known request/response pair.
    pub fn of<R: 'static, T: 'static>() -> Self {
        Self {
            request: TypeId::of::<R>(),
            response: TypeId::of::<T>(),
            request_name: type_name::<R>(),
            response_name: type_name::<T>(),
        }
    }

    /// Builds a key from a request type observed at runtime and a static
    /// response type.
    pub fn from_runtime<T: 'static>(request: TypeId, request_name: &'static str) -> Self {
        Self {
            request,
            response: TypeId::of::<T>(),
            request_name,
            response_name: type_name::<T>(),
        }
    }

    /// The request half of the key.
    pub fn request(&self) -> TypeId {
        self.request
    }

    /// The response half of the key.
    pub fn response(&self) -> TypeId {
        self.response
    }

    /// Fully qualified request type name.
    pub fn request_name(&self) -> &'static str {
        self.request_name
    }

    /// Fully qualified response type name.
    pub fn response_name(&self) -> &'static str {
        self.response_name
    }
}

impl PartialEq for DispatchKey {
    fn eq(&self, other: &Self) -> bool {
        self.request == other.request && self.response == other.response
    }
}

impl Eq for DispatchKey {}

impl Hash for DispatchKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.request.hash(state);
        self.response.hash(state);
    }
}

impl fmt::Debug for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchKey")
            .field("request", &self.request_name)
            .field("response", &self.response_name)
            .finish()
    }
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler<{}, {}>", self.request_name, self.response_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Ping;
    struct Pong;

    #[test]
    fn test_key_identity_ignores_names() {
        let a = DispatchKey::of::<Ping, String>();
        let b = DispatchKey::from_runtime::<String>(TypeId::of::<Ping>(), "renamed");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_response_type_is_part_of_key() {
        assert_ne!(
            DispatchKey::of::<Ping, String>(),
            DispatchKey::of::<Ping, u32>()
        );
        assert_ne!(
            DispatchKey::of::<Ping, String>(),
            DispatchKey::of::<Pong, String>()
        );
    }

    #[test]
    fn test_display_names_both_types() {
        let key = DispatchKey::of::<Ping, String>();
        let shown = key.to_string();
        assert!(shown.contains("Ping"));
        assert!(shown.contains("String"));
    }
}
