//! Input parameters threaded through a resolve request to the activator.

use std::sync::Arc;

use crate::instance::Instance;
use crate::service::ServiceType;

/// A single input supplied to an activator.
#[derive(Debug, Clone)]
pub enum Parameter {
    /// Addressed by position in the parameter list
    Positional(usize, Instance),
    /// Addressed by name
    Named(Arc<str>, Instance),
    /// Addressed by the service type of the value
    Typed(ServiceType, Instance),
}

impl Parameter {
    pub fn positional<T: ?Sized + Send + Sync + 'static>(index: usize, value: Arc<T>) -> Self {
        Parameter::Positional(index, Instance::new(value))
    }

    pub fn named<T: ?Sized + Send + Sync + 'static>(name: impl Into<Arc<str>>, value: Arc<T>) -> Self {
        Parameter::Named(name.into(), Instance::new(value))
    }

    pub fn typed<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Parameter::Typed(ServiceType::of::<T>(), Instance::new(value))
    }

    fn instance(&self) -> &Instance {
        match self {
            Parameter::Positional(_, instance)
            | Parameter::Named(_, instance)
            | Parameter::Typed(_, instance) => instance,
        }
    }
}

/// Ordered list of [`Parameter`]s.
///
/// Lookups return the first match in list order.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{Parameter, Parameters};
/// use std::sync::Arc;
///
/// let params = Parameters::from(vec![
///     Parameter::named("name", Arc::new("db".to_string())),
///     Parameter::typed(Arc::new(5432u16)),
///     Parameter::positional(0, Arc::new(true)),
/// ]);
///
/// assert_eq!(params.named::<String>("name").unwrap().as_str(), "db");
/// assert_eq!(*params.typed::<u16>().unwrap(), 5432);
/// assert!(*params.positional::<bool>(0).unwrap());
/// assert!(params.typed::<String>().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    items: Vec<Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, parameter: Parameter) -> Self {
        self.items.push(parameter);
        self
    }

    pub fn push(&mut self, parameter: Parameter) {
        self.items.push(parameter);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.items.iter()
    }

    pub fn positional<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Option<Arc<T>> {
        self.items.iter().find_map(|p| match p {
            Parameter::Positional(i, instance) if *i == index => instance.downcast::<T>(),
            _ => None,
        })
    }

    pub fn named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.items.iter().find_map(|p| match p {
            Parameter::Named(n, instance) if &**n == name => instance.downcast::<T>(),
            _ => None,
        })
    }

    /// First typed parameter whose type is `T`.
    pub fn typed<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let wanted = ServiceType::of::<T>();
        self.items.iter().find_map(|p| match p {
            Parameter::Typed(ty, instance) if *ty == wanted => instance.downcast::<T>(),
            _ => None,
        })
    }

    /// First parameter of any kind holding a `T`.
    pub fn any<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.items.iter().find_map(|p| p.instance().downcast::<T>())
    }
}

impl From<Vec<Parameter>> for Parameters {
    fn from(items: Vec<Parameter>) -> Self {
        Self { items }
    }
}

impl FromIterator<Parameter> for Parameters {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
