//! Core traits for resolution and instance lifecycle.

mod dispose;
mod resolver;
mod startable;

pub use dispose::{Dispose, AsyncDispose};
pub use resolver::{Resolver, ResolverCore};
pub use startable::Startable;
