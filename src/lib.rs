//! # ferrous-kernel
//!
//! The activation engine of a dependency-injection kernel: bindings map services to
//! implementations, a planner describes how each type is built and wired, and an
//! activation pipeline turns bindings into live, cached instances.
//!
//! ## Features
//!
//! - **Lifetimes**: Transient, Singleton, Thread and custom scopes keyed by any object
//! - **Construction plans**: Constructor, property and method injection planned once per type
//! - **Activation pipeline**: Initialize, start, dispose and per-binding activation actions,
//!   run exactly once per instance
//! - **Contextual bindings**: Named and conditional bindings, constraints and parameters
//! - **Open generics**: Bind a generic definition once, resolve any instantiation
//! - **Cycle detection**: Circular graphs fail with the full activation path
//! - **Scope cache**: Deterministic release, block disposal and background pruning of dead scopes
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_kernel::{Kernel, Resolver, Target, TypeInfo};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let kernel = Kernel::new();
//! kernel.catalog().register(
//!     TypeInfo::of::<UserService>()
//!         .constructor([Target::of::<Database>("db")], |args| Ok(UserService { db: args.get(0)? })),
//! );
//! kernel.bind::<Database>(|b| b.to_constant(Database { url: "postgres://localhost".to_string() }));
//!
//! let users = kernel.get::<UserService>().unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! ## Lifetimes
//!
//! - **Transient**: A new instance per resolution (the default)
//! - **Singleton**: One instance per kernel
//! - **Thread**: One instance per OS thread
//! - **Custom**: One instance per scope object returned by a callback
//!
//! ## Trait Resolution
//!
//! ```rust
//! use ferrous_kernel::{Kernel, Resolver, TypeInfo};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) -> String {
//!         format!("[LOG] {}", message)
//!     }
//! }
//!
//! let kernel = Kernel::new();
//! kernel.catalog().register(
//!     TypeInfo::of::<ConsoleLogger>()
//!         .constructor([], |_| Ok(ConsoleLogger))
//!         .provides::<dyn Logger, _>(|logger| logger as Arc<dyn Logger>),
//! );
//! kernel.bind::<dyn Logger>(|b| b.to_type::<ConsoleLogger>().in_singleton_scope());
//!
//! let logger = kernel.get_trait::<dyn Logger>().unwrap();
//! assert_eq!(logger.log("Hello, World!"), "[LOG] Hello, World!");
//! ```
//!
//! ## Activation Blocks
//!
//! ```rust
//! use ferrous_kernel::{Kernel, Resolver, TypeInfo};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! struct RequestId(u32);
//!
//! let kernel = Kernel::new();
//! let counter = Arc::new(AtomicU32::new(0));
//! let next = counter.clone();
//! kernel.bind::<RequestId>(move |b| b.to_method(move |_| Ok(RequestId(next.fetch_add(1, Ordering::SeqCst)))));
//!
//! let block = kernel.begin_block();
//! let first = block.get::<RequestId>().unwrap();
//! let again = block.get::<RequestId>().unwrap();
//! assert_eq!(first.0, again.0);
//!
//! let other = kernel.begin_block().get::<RequestId>().unwrap();
//! assert_ne!(first.0, other.0);
//! ```

pub mod activation;
pub mod binding;
pub mod caching;
pub mod catalog;
pub mod descriptors;
pub mod error;
pub mod kernel;
pub mod lifetime;
pub mod parameters;
pub mod planning;
pub mod settings;
pub mod traits;
pub mod types;

mod internal;

pub use activation::{
    ActivationBlock, ActivationStrategy, AnyArc, Context, InstanceReference, Pipeline, Provider, Request,
};
pub use binding::{Binding, BindingBuilder, BindingMetadata, BindingTarget};
pub use caching::{
    ActivationCache, ActivationClaim, Cache, CachePruner, IntervalCachePruner, NoopCachePruner, Pruneable, ScopeKey,
};
pub use catalog::{Arguments, Target, TypeCatalog, TypeInfo};
pub use descriptors::BindingDescriptor;
pub use error::{ActivationError, ActivationResult, BoxError};
pub use kernel::{Kernel, KernelBuilder, Resolution};
pub use lifetime::Lifetime;
pub use parameters::{Parameter, ParameterKind};
pub use planning::{Plan, Planner};
pub use settings::KernelSettings;
pub use traits::{Dispose, Initializable, Resolver, ResolverCore, Startable};
pub use types::ServiceType;
