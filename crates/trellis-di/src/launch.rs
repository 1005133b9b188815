//! Entry-point bootstrap
//!
//! [`launch`] assembles a synthetic root module from the modules and bindings
//! registered on an [`AppBuilder`], adds the implicit runtime module that
//! binds [`RuntimeArgs`], [`RuntimeEnv`] and [`RuntimeProps`], builds the
//! binding table, resolves the entry point and runs it.

use crate::binding::Binding;
use crate::context::Context;
use crate::module::{Binder, ModuleHandle};
use crate::runtime::{RuntimeArgs, RuntimeEnv, RuntimeProps};
use crate::{DiError, DiResult};
use async_trait::async_trait;
use std::any::Any;

/// Source id of the implicit runtime module
pub const RUNTIME_MODULE_SOURCE: &str = "trellis::runtime";

/// The single root type an application resolves and runs.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use trellis_di::{launch, Binder, DiResult, EntryPoint, RuntimeArgs};
///
/// struct Echo {
///     args: Arc<RuntimeArgs>,
/// }
///
/// #[async_trait]
/// impl EntryPoint for Echo {
///     type Output = String;
///
///     async fn run(&self) -> String {
///         self.args.iter().collect::<Vec<_>>().join(" ")
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> DiResult<()> {
/// let output = launch::<Echo, _>(|app| {
///     app.args(["hello", "world"]);
///     app.provide(|args: Arc<RuntimeArgs>| async move { DiResult::Ok(Echo { args }) });
/// })
/// .await?;
///
/// assert_eq!(output, "hello world");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait EntryPoint: Send + Sync + 'static {
	type Output: Send;

	async fn run(&self) -> Self::Output;
}

/// Collects everything [`launch`] needs: runtime values, user modules and
/// bindings contributed directly to the synthetic root module.
#[derive(Debug)]
pub struct AppBuilder {
	source: String,
	args: RuntimeArgs,
	env: RuntimeEnv,
	props: RuntimeProps,
	dependencies: Vec<ModuleHandle>,
	bindings: Vec<Binding>,
	pending_error: Option<DiError>,
}

impl AppBuilder {
	pub fn new(source: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			args: RuntimeArgs::default(),
			env: RuntimeEnv::default(),
			props: RuntimeProps::default(),
			dependencies: Vec::new(),
			bindings: Vec::new(),
			pending_error: None,
		}
	}

	/// Override the source id of the synthetic root module.
	pub fn root_source(&mut self, source: impl Into<String>) -> &mut Self {
		self.source = source.into();
		self
	}

	pub fn args<I, S>(&mut self, args: I) -> &mut Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args = RuntimeArgs::new(args);
		self
	}

	/// Add environment variables; later values override earlier ones.
	pub fn env<I, K, V>(&mut self, vars: I) -> &mut Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		for (key, value) in vars {
			self.env.insert(key, value);
		}
		self
	}

	pub fn props<I, K, V>(&mut self, props: I) -> &mut Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		for (key, value) in props {
			self.props.insert(key, value);
		}
		self
	}

	/// Merge a TOML document into the properties.
	///
	/// A malformed document makes the launch fail with the parse error.
	pub fn props_toml(&mut self, document: &str) -> &mut Self {
		match RuntimeProps::from_toml_str(document) {
			Ok(props) => self.props.merge(props),
			Err(err) => {
				self.pending_error.get_or_insert(err.into());
			}
		}
		self
	}

	/// Capture the arguments and environment of the current process.
	pub fn from_process(&mut self) -> &mut Self {
		self.args = RuntimeArgs::from_process();
		for (key, value) in RuntimeEnv::from_process().iter() {
			self.env.insert(key, value);
		}
		self
	}

	fn runtime_module(&self) -> ModuleHandle {
		let args = self.args.clone();
		let env = self.env.clone();
		let props = self.props.clone();
		ModuleHandle::new(RUNTIME_MODULE_SOURCE, move |binder| {
			let args = args.clone();
			binder.factory(move || {
				let args = args.clone();
				async move { DiResult::Ok(args) }
			});
			let env = env.clone();
			binder.factory(move || {
				let env = env.clone();
				async move { DiResult::Ok(env) }
			});
			let props = props.clone();
			binder.factory(move || {
				let props = props.clone();
				async move { DiResult::Ok(props) }
			});
		})
	}

	/// Assemble the root module and build its context.
	pub fn build_context(mut self) -> DiResult<Context> {
		if let Some(err) = self.pending_error.take() {
			return Err(err);
		}
		let runtime = self.runtime_module();
		let Self {
			source,
			dependencies,
			bindings,
			..
		} = self;
		let root = ModuleHandle::new(source, move |binder| {
			for dependency in &dependencies {
				binder.dependency(dependency);
			}
			binder.dependency(&runtime);
			for binding in &bindings {
				binder.contribute(binding.clone());
			}
		});
		Context::build(&root)
	}
}

impl Binder for AppBuilder {
	fn source(&self) -> &str {
		&self.source
	}

	fn dependency(&mut self, module: &ModuleHandle) {
		self.dependencies.push(module.clone());
	}

	fn contribute(&mut self, binding: Binding) {
		self.bindings.push(binding);
	}
}

/// Build the application described by `configure`, resolve `E` and run it.
///
/// Every wiring error aborts the launch and is returned as is.
pub async fn launch<E, F>(configure: F) -> DiResult<E::Output>
where
	E: EntryPoint + Any,
	F: FnOnce(&mut AppBuilder),
{
	let mut app = AppBuilder::new(format!("trellis::launch<{}>", std::any::type_name::<E>()));
	configure(&mut app);

	let context = app.build_context().inspect_err(|err| {
		tracing::error!(error = %err, "Failed to build application context");
	})?;
	let entry = context.required::<E>().await.inspect_err(|err| {
		tracing::error!(error = %err, "Failed to resolve entry point");
	})?;

	tracing::info!(
		entry_point = std::any::type_name::<E>(),
		bindings = context.table().len(),
		"Launching entry point"
	);
	Ok(entry.run().await)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::Arc;

	struct Port(i64);

	struct Server {
		port: Arc<Port>,
	}

	#[async_trait]
	impl EntryPoint for Server {
		type Output = i64;

		async fn run(&self) -> i64 {
			self.port.0
		}
	}

	#[rstest]
	#[tokio::test]
	async fn entry_point_reads_runtime_env() {
		// Arrange & Act
		let port = launch::<Server, _>(|app| {
			app.env([("PORT", "8080")]);
			app.provide(|env: Arc<RuntimeEnv>| async move {
				let port = env.int("PORT")?;
				DiResult::Ok(Port(port))
			});
			app.provide(|port: Arc<Port>| async move { DiResult::Ok(Server { port }) });
		})
		.await;

		// Assert
		assert_eq!(port.unwrap(), 8080);
	}

	#[rstest]
	#[tokio::test]
	async fn missing_entry_point_binding_fails() {
		let result = launch::<Server, _>(|_app| {}).await;

		assert!(matches!(result, Err(DiError::NotFound(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn malformed_props_abort_launch() {
		let result = launch::<Server, _>(|app| {
			app.props_toml("[broken");
			app.instance(Port(1));
		})
		.await;

		assert!(matches!(result, Err(DiError::ProviderError(_))));
	}

	#[rstest]
	fn runtime_module_binds_runtime_values() {
		let mut app = AppBuilder::new("test::APP");
		app.root_source("test::CUSTOM");

		let context = app.build_context().unwrap();

		let table = context.table();
		assert_eq!(table.sources(), vec![RUNTIME_MODULE_SOURCE]);
		assert_eq!(table.len(), 3);
	}
}
