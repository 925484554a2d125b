//! Core traits: lifecycle capabilities recognised by the activation
//! pipeline and the resolver interface.

mod lifecycle;
pub mod resolver;

pub use lifecycle::{Dispose, Initializable, Startable};
pub use resolver::{Resolver, ResolverCore};
