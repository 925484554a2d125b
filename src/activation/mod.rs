//! Activation: requests, contexts, providers and the pipeline that together
//! turn a binding into a live instance.

pub mod block;
pub mod context;
pub mod instance;
pub mod pipeline;
pub mod providers;
pub mod request;
pub mod strategies;

pub use block::{ActivationBlock, BlockScope};
pub use context::Context;
pub use instance::{AnyArc, InstanceReference};
pub use pipeline::{ActivationStrategy, Pipeline};
pub use providers::{CallbackProvider, ConstantProvider, Provider, StandardProvider};
pub use request::Request;
pub use strategies::{
    BindingActionStrategy, DisposableStrategy, InitializableStrategy, MethodInjectionStrategy,
    PropertyInjectionStrategy, StartableStrategy,
};

pub use crate::kernel::Resolution;
