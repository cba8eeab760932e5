//! Registration modules.
//!
//! A module groups the registrations of one feature so applications can
//! assemble a container from reusable pieces.

use crate::error::DiResult;

use super::ContainerBuilder;

/// A reusable bundle of registrations.
///
/// # Example
///
/// ```rust
/// use ferrous_scopes::{
///     ContainerBuilder, ContainerBuilderModuleExt, ContainerModule, DiResult, Resolver,
/// };
/// use std::sync::Arc;
///
/// struct Pool { size: usize }
/// struct Users { pool: Arc<Pool> }
///
/// struct StorageModule { pool_size: usize }
///
/// impl ContainerModule for StorageModule {
///     fn load(self, builder: &mut ContainerBuilder) -> DiResult<()> {
///         let size = self.pool_size;
///         builder.register(move |_, _| Ok(Arc::new(Pool { size }))).single_instance();
///         builder
///             .register(|ctx, _| Ok(Arc::new(Users { pool: ctx.resolve()? })))
///             .instance_per_lifetime_scope();
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let mut builder = ContainerBuilder::new();
/// builder.register_module(StorageModule { pool_size: 4 })?;
/// let container = builder.build();
///
/// let scope = container.begin_lifetime_scope();
/// assert_eq!(scope.resolve::<Users>()?.pool.size, 4);
/// # Ok(())
/// # }
/// ```
pub trait ContainerModule {
    /// Adds this module's registrations to `builder`.
    fn load(self, builder: &mut ContainerBuilder) -> DiResult<()>;
}

/// Module loading for [`ContainerBuilder`].
pub trait ContainerBuilderModuleExt {
    /// Loads `module` into the builder, returning it for chaining.
    fn register_module<M: ContainerModule>(&mut self, module: M) -> DiResult<&mut Self>;
}

impl ContainerBuilderModuleExt for ContainerBuilder {
    fn register_module<M: ContainerModule>(&mut self, module: M) -> DiResult<&mut Self> {
        module.load(self)?;
        Ok(self)
    }
}

impl<F> ContainerModule for F
where
    F: FnOnce(&mut ContainerBuilder) -> DiResult<()>,
{
    fn load(self, builder: &mut ContainerBuilder) -> DiResult<()> {
        self(builder)
    }
}
