//! # Trellis Dependency Injection
//!
//! A small dependency injection container: independently declared modules
//! are composed into one binding table, and values are built on demand from
//! the key requested.
//!
//! ## Features
//!
//! - **Type-safe**: constructor parameters are resolved from their static types
//! - **Async-first**: factories and constructors are async
//! - **Composable**: modules depend on modules; shared (diamond) dependencies
//!   are evaluated once
//! - **Fail-fast**: missing bindings, duplicate bindings and cycles are
//!   reported with the declaration sites involved
//!
//! There is a single scope and no instance cache: every resolution rebuilds
//! everything reachable from the requested key. Share a value by binding an
//! instance.
//!
//! ## Development Tools (dev-tools feature)
//!
//! - **Visualization**: [`Context::dependency_graph`] exports the static
//!   dependency graph in DOT format for Graphviz
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use trellis_di::{module, Binder, Context, DiResult};
//!
//! struct Greeting(String);
//! struct Length(usize);
//!
//! module!(GREETING => |binder| {
//!     binder.factory(|| async { DiResult::Ok(Greeting("hello".to_string())) });
//! });
//!
//! module!(LENGTH => |binder| {
//!     binder.dependency(&GREETING);
//!     binder.provide(|greeting: Arc<Greeting>| async move {
//!         DiResult::Ok(Length(greeting.0.chars().count()))
//!     });
//! });
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> DiResult<()> {
//! let ctx = Context::build(&LENGTH)?;
//! assert_eq!(ctx.required::<Length>().await?.0, 5);
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod context;
mod cycle_detection;
pub mod error;
pub mod factory;
pub mod injectable;
pub mod injected;
pub mod key;
pub mod launch;
pub mod module;
pub mod provider;
pub mod runtime;
pub mod table;

#[cfg(feature = "dev-tools")]
pub mod visualization;

pub use binding::{Binding, BindingVariant};
pub use context::Context;
pub use error::{DiError, DiResult};
pub use factory::{BoxFuture, Constructor, Instance};
pub use injectable::Injectable;
pub use injected::{Injected, OptionalInjected};
pub use key::{Classifier, TypeKey};
pub use launch::{AppBuilder, EntryPoint, RUNTIME_MODULE_SOURCE, launch};
pub use module::{Binder, Module, ModuleBinder, ModuleGraph, ModuleHandle};
pub use provider::Provider;
pub use runtime::{ConfigError, RuntimeArgs, RuntimeEnv, RuntimeProps};
pub use table::{BindingTable, TableEntry};

#[cfg(feature = "dev-tools")]
pub use visualization::{DependencyGraph, GraphNode, GraphStatistics};
