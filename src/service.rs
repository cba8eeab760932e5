//! Service keys: what a caller asks the container for.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::pipeline::DecoratorContext;

/// Identity of a service type, sized or `dyn Trait`.
///
/// Equality and hashing use the `TypeId` only; the name is carried for
/// diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::ServiceType;
///
/// trait Logger: Send + Sync {}
///
/// let a = ServiceType::of::<dyn Logger>();
/// let b = ServiceType::of::<dyn Logger>();
/// assert_eq!(a, b);
/// assert!(a.name().contains("Logger"));
/// ```
#[derive(Clone, Copy)]
pub struct ServiceType {
    id: TypeId,
    name: &'static str,
}

impl ServiceType {
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type name as reported by `std::any::type_name`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without module paths, e.g. `Vec<Foo>` for `alloc::vec::Vec<app::Foo>`.
    pub fn short_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len());
        let mut segment = String::new();
        for ch in self.name.chars() {
            match ch {
                ':' => segment.clear(),
                '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                    out.push_str(&segment);
                    segment.clear();
                    out.push(ch);
                }
                _ => segment.push(ch),
            }
        }
        out.push_str(&segment);
        out
    }
}

impl PartialEq for ServiceType {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Predicate deciding whether a decorator applies to the current decoration state.
pub type DecoratorCondition = Arc<dyn Fn(&DecoratorContext) -> bool + Send + Sync>;

/// Key identifying "what was requested".
///
/// - **Typed**: the default registration of a service type
/// - **Keyed**: a registration of a service type under a key
/// - **Decorator**: a decorator standing over a service type; its condition
///   does not take part in equality
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::Service;
///
/// let typed = Service::typed::<u32>();
/// let keyed = Service::keyed::<u32>("port");
///
/// assert_ne!(typed, keyed);
/// assert_eq!(keyed.key(), Some("port"));
/// assert_eq!(typed.service_type(), keyed.service_type());
/// ```
#[derive(Clone)]
pub enum Service {
    Typed(ServiceType),
    Keyed(ServiceType, Arc<str>),
    Decorator(ServiceType, Option<DecoratorCondition>),
}

impl Service {
    #[inline(always)]
    pub fn typed<T: ?Sized + 'static>() -> Self {
        Service::Typed(ServiceType::of::<T>())
    }

    pub fn keyed<T: ?Sized + 'static>(key: impl Into<Arc<str>>) -> Self {
        Service::Keyed(ServiceType::of::<T>(), key.into())
    }

    /// Lookup key for the decorators of `T`.
    pub fn decorator_of<T: ?Sized + 'static>() -> Self {
        Service::Decorator(ServiceType::of::<T>(), None)
    }

    pub fn service_type(&self) -> ServiceType {
        match self {
            Service::Typed(ty) | Service::Keyed(ty, _) | Service::Decorator(ty, _) => *ty,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Service::Keyed(_, key) => Some(key),
            _ => None,
        }
    }

    /// Decorator services are never decorated themselves.
    pub fn is_decoratable(&self) -> bool {
        !matches!(self, Service::Decorator(..))
    }

    pub(crate) fn condition(&self) -> Option<&DecoratorCondition> {
        match self {
            Service::Decorator(_, condition) => condition.as_ref(),
            _ => None,
        }
    }

    /// Name used in error messages.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Service::Typed(a), Service::Typed(b)) => a == b,
            (Service::Keyed(a, ka), Service::Keyed(b, kb)) => a == b && ka == kb,
            (Service::Decorator(a, _), Service::Decorator(b, _)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Service {}

impl Hash for Service {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Service::Typed(ty) => {
                0u8.hash(state);
                ty.hash(state);
            }
            Service::Keyed(ty, key) => {
                1u8.hash(state);
                ty.hash(state);
                key.hash(state);
            }
            Service::Decorator(ty, _) => {
                2u8.hash(state);
                ty.hash(state);
            }
        }
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Typed(ty) => write!(f, "{}", ty),
            Service::Keyed(ty, key) => write!(f, "{} ('{}')", ty, key),
            Service::Decorator(ty, _) => write!(f, "Decorator ({})", ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    trait Greeter: Send + Sync {}

    #[test]
    fn decorator_condition_is_ignored_by_equality() {
        let plain = Service::decorator_of::<dyn Greeter>();
        let conditional = Service::Decorator(
            ServiceType::of::<dyn Greeter>(),
            Some(Arc::new(|_: &DecoratorContext| false)),
        );
        assert_eq!(plain, conditional);

        let mut set = HashSet::new();
        set.insert(plain);
        assert!(set.contains(&conditional));
    }

    #[test]
    fn variants_never_compare_equal() {
        assert_ne!(Service::typed::<u8>(), Service::decorator_of::<u8>());
        assert_ne!(Service::keyed::<u8>("a"), Service::keyed::<u8>("b"));
        assert_ne!(Service::typed::<u8>(), Service::typed::<u16>());
    }

    #[test]
    fn short_name_strips_paths() {
        let ty = ServiceType::of::<Vec<std::string::String>>();
        assert_eq!(ty.short_name(), "Vec<String>");
    }
}
