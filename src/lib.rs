//! # Trellis
//!
//! A small, module-based dependency injection container with an async
//! entry-point bootstrap.
//!
//! Applications are composed from modules. Each module declares the modules
//! it builds on and the bindings it contributes; [`launch`] flattens every
//! reachable module into one binding table, resolves the requested
//! [`EntryPoint`] and runs it.
//!
//! ## Feature Flags
//!
//! - `dev-tools` (default) - dependency graph export (DOT) and graph statistics
//!
//! ## Quick Example
//!
//! ```rust
//! use trellis::prelude::*;
//!
//! struct Port(i64);
//!
//! struct Server {
//!     port: Arc<Port>,
//! }
//!
//! #[async_trait]
//! impl EntryPoint for Server {
//!     type Output = String;
//!
//!     async fn run(&self) -> String {
//!         format!("listening on {}", self.port.0)
//!     }
//! }
//!
//! module!(SERVER => |binder| {
//!     binder.provide(|env: Arc<RuntimeEnv>| async move {
//!         let port = env.int_with_default("PORT", Some(8000))?;
//!         DiResult::Ok(Port(port))
//!     });
//!     binder.provide(|port: Arc<Port>| async move { DiResult::Ok(Server { port }) });
//! });
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> DiResult<()> {
//! let output = launch::<Server, _>(|app| {
//!     app.env([("PORT", "8080")]);
//!     app.dependency(&SERVER);
//! })
//! .await?;
//!
//! assert_eq!(output, "listening on 8080");
//! # Ok(())
//! # }
//! ```

pub use trellis_di as di;

pub use trellis_di::{
	AppBuilder, Binder, Binding, BindingTable, BindingVariant, Classifier, ConfigError, Context,
	DiError, DiResult, EntryPoint, Injectable, Injected, Module, ModuleBinder, ModuleGraph,
	ModuleHandle, OptionalInjected, Provider, RuntimeArgs, RuntimeEnv, RuntimeProps, TypeKey,
	launch, module,
};

#[cfg(feature = "dev-tools")]
pub use trellis_di::{DependencyGraph, GraphStatistics};

/// Everything needed to declare modules and launch an application
pub mod prelude {
	pub use crate::{
		AppBuilder, Binder, Binding, Context, DiError, DiResult, EntryPoint, Injected, ModuleHandle,
		OptionalInjected, Provider, RuntimeArgs, RuntimeEnv, RuntimeProps, launch, module,
	};

	// External
	pub use async_trait::async_trait;
	pub use std::sync::Arc;
}
