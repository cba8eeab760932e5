//! Type-erased component instances.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::service::ServiceType;

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// A produced component instance.
///
/// Holds an `Arc<S>` of the service type behind type erasure, so both sized
/// types and trait objects travel through the pipeline the same way. Cloning
/// is cheap and preserves identity.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::Instance;
/// use std::sync::Arc;
///
/// trait Shape: Send + Sync { fn area(&self) -> f64; }
/// struct Square(f64);
/// impl Shape for Square { fn area(&self) -> f64 { self.0 * self.0 } }
///
/// let instance = Instance::new::<dyn Shape>(Arc::new(Square(2.0)));
/// let shape = instance.downcast::<dyn Shape>().unwrap();
/// assert_eq!(shape.area(), 4.0);
/// assert!(instance.downcast::<Square>().is_none());
/// ```
#[derive(Clone)]
pub struct Instance {
    value: AnyArc,
    service_type: ServiceType,
    address: usize,
}

impl Instance {
    pub fn new<S: ?Sized + Send + Sync + 'static>(value: Arc<S>) -> Self {
        let address = Arc::as_ptr(&value) as *const () as usize;
        Self {
            value: Arc::new(value),
            service_type: ServiceType::of::<S>(),
            address,
        }
    }

    /// Recovers the `Arc<S>` this instance was created from.
    pub fn downcast<S: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<S>> {
        self.value.downcast_ref::<Arc<S>>().cloned()
    }

    /// The service type the instance was stored as.
    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    /// Identity comparison of the underlying values.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        self.address == other.address
    }

    pub(crate) fn address(&self) -> usize {
        self.address
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("service_type", &self.service_type)
            .finish()
    }
}
