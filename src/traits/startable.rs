/// A component that performs work when it is first activated.
///
/// Declared on a registration with [`startable`](crate::RegistrationBuilder::startable)
/// and honored when [`ContainerOptions::start_on_activate`](crate::ContainerOptions) is
/// enabled. A registration is started at most once; it is marked started before
/// `start` runs, so `start` may itself resolve the same component without recursing.
pub trait Startable: Send + Sync + 'static {
    fn start(&self);
}
