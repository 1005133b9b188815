//! Modules, module handles and the binder DSL
//!
//! A module is declared by handing a builder to [`ModuleHandle::new`] (or the
//! [`module!`](crate::module) macro). The builder runs at most once, the first
//! time the handle is evaluated, and records dependency handles and bindings
//! through a [`Binder`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use trellis_di::{module, Binder, DiResult};
//!
//! pub struct Greeting(String);
//! pub struct Length(usize);
//!
//! module!(pub GREETING => |binder| {
//!     binder.factory(|| async { DiResult::Ok(Greeting("hello".to_string())) });
//! });
//!
//! module!(pub LENGTH => |binder| {
//!     binder.dependency(&GREETING);
//!     binder.provide(|greeting: Arc<Greeting>| async move {
//!         DiResult::Ok(Length(greeting.0.chars().count()))
//!     });
//! });
//!
//! assert!(LENGTH.source().ends_with("::LENGTH"));
//! assert_eq!(LENGTH.module().bindings().len(), 1);
//! ```

use crate::binding::Binding;
use crate::factory::Constructor;
use crate::DiResult;
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// An evaluated module: its source id, dependency handles and bindings.
pub struct Module {
	source: String,
	dependencies: Vec<ModuleHandle>,
	bindings: Vec<Binding>,
}

impl Module {
	pub fn source(&self) -> &str {
		&self.source
	}

	pub fn dependencies(&self) -> &[ModuleHandle] {
		&self.dependencies
	}

	pub fn bindings(&self) -> &[Binding] {
		&self.bindings
	}
}

impl fmt::Debug for Module {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Module")
			.field("source", &self.source)
			.field(
				"dependencies",
				&self
					.dependencies
					.iter()
					.map(ModuleHandle::source)
					.collect::<Vec<_>>(),
			)
			.field("bindings", &self.bindings)
			.finish()
	}
}

type ModuleBuilder = Box<dyn Fn(&mut ModuleBinder) + Send + Sync>;

struct HandleInner {
	source: String,
	builder: ModuleBuilder,
	module: OnceLock<Arc<Module>>,
}

/// Lazily evaluated, identity-stable reference to a [`Module`].
///
/// Clones share the same identity and the same evaluated module. Two handles
/// created separately are different modules even if their sources match.
#[derive(Clone)]
pub struct ModuleHandle {
	inner: Arc<HandleInner>,
}

impl ModuleHandle {
	pub fn new<F>(source: impl Into<String>, builder: F) -> Self
	where
		F: Fn(&mut ModuleBinder) + Send + Sync + 'static,
	{
		Self {
			inner: Arc::new(HandleInner {
				source: source.into(),
				builder: Box::new(builder),
				module: OnceLock::new(),
			}),
		}
	}

	pub fn source(&self) -> &str {
		&self.inner.source
	}

	/// Evaluate the module, running its builder on first access only.
	pub fn module(&self) -> Arc<Module> {
		let module = self.inner.module.get_or_init(|| {
			tracing::debug!(module = %self.inner.source, "Evaluating module");
			let mut binder = ModuleBinder::new(self.inner.source.clone());
			(self.inner.builder)(&mut binder);
			Arc::new(binder.into_module())
		});
		Arc::clone(module)
	}

	pub fn is_evaluated(&self) -> bool {
		self.inner.module.get().is_some()
	}
}

impl PartialEq for ModuleHandle {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl Eq for ModuleHandle {}

impl Hash for ModuleHandle {
	fn hash<H: Hasher>(&self, state: &mut H) {
		std::ptr::hash(Arc::as_ptr(&self.inner), state);
	}
}

impl fmt::Debug for ModuleHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ModuleHandle").field(&self.inner.source).finish()
	}
}

/// Collector handed to module builders.
///
/// Only [`Binder::dependency`] and [`Binder::contribute`] are required; the
/// remaining methods build a [`Binding`] and contribute it.
pub trait Binder {
	/// Source id bindings contributed through this binder are attributed to.
	fn source(&self) -> &str;

	fn dependency(&mut self, module: &ModuleHandle);

	fn contribute(&mut self, binding: Binding);

	fn instance<T>(&mut self, value: T)
	where
		T: Any + Send + Sync,
	{
		self.contribute(Binding::instance(value));
	}

	fn instance_with<T>(&mut self, value: T, transform: impl FnOnce(Binding) -> Binding)
	where
		T: Any + Send + Sync,
	{
		self.contribute(transform(Binding::instance(value)));
	}

	fn factory<T, F, Fut>(&mut self, factory: F)
	where
		T: Any + Send + Sync,
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = DiResult<T>> + Send + 'static,
	{
		self.contribute(Binding::factory(factory));
	}

	fn factory_with<T, F, Fut>(&mut self, factory: F, transform: impl FnOnce(Binding) -> Binding)
	where
		T: Any + Send + Sync,
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = DiResult<T>> + Send + 'static,
	{
		self.contribute(transform(Binding::factory(factory)));
	}

	/// Bind the output of a constructor whose parameters are injected.
	fn provide<T, Args, C>(&mut self, constructor: C)
	where
		T: Any + Send + Sync,
		C: Constructor<Args, T>,
	{
		self.contribute(Binding::constructor(constructor));
	}

	fn provide_with<T, Args, C>(&mut self, constructor: C, transform: impl FnOnce(Binding) -> Binding)
	where
		T: Any + Send + Sync,
		C: Constructor<Args, T>,
	{
		self.contribute(transform(Binding::constructor(constructor)));
	}

	/// Contribute `binding` as one element of the multibinding for its type.
	fn list(&mut self, binding: Binding) {
		self.contribute(binding.into_list());
	}

	fn alias<T, S, F>(&mut self, convert: F)
	where
		T: Any + Send + Sync,
		S: Any + Send + Sync,
		F: Fn(Arc<S>) -> T + Send + Sync + 'static,
	{
		self.contribute(Binding::alias(convert));
	}

	/// Make `Option<Arc<T>>` parameters see the binding of `T`.
	fn optional_alias<T>(&mut self)
	where
		T: Any + Send + Sync,
	{
		self.contribute(Binding::optional_alias::<T>());
	}
}

/// [`Binder`] used while a module builder runs
pub struct ModuleBinder {
	source: String,
	dependencies: Vec<ModuleHandle>,
	bindings: Vec<Binding>,
}

impl ModuleBinder {
	pub fn new(source: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			dependencies: Vec::new(),
			bindings: Vec::new(),
		}
	}

	pub fn into_module(self) -> Module {
		Module {
			source: self.source,
			dependencies: self.dependencies,
			bindings: self.bindings,
		}
	}
}

impl Binder for ModuleBinder {
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

/// Every module reachable from a root, each evaluated exactly once.
///
/// Modules are kept in the order the depth-first walk first reached them,
/// root first.
#[derive(Debug)]
pub struct ModuleGraph {
	modules: IndexMap<ModuleHandle, Arc<Module>>,
	revisits: usize,
}

impl ModuleGraph {
	pub fn walk(root: &ModuleHandle) -> Self {
		let mut graph = Self {
			modules: IndexMap::new(),
			revisits: 0,
		};
		graph.visit(root);
		tracing::debug!(
			root = %root.source(),
			modules = graph.modules.len(),
			revisits = graph.revisits,
			"Walked module graph"
		);
		graph
	}

	fn visit(&mut self, handle: &ModuleHandle) {
		let module = handle.module();
		self.modules.insert(handle.clone(), Arc::clone(&module));
		for dependency in module.dependencies() {
			if self.modules.contains_key(dependency) {
				// Diamond: already evaluated through another path.
				self.revisits += 1;
				tracing::debug!(
					module = %dependency.source(),
					via = %module.source(),
					"Module already processed"
				);
				continue;
			}
			self.visit(dependency);
		}
	}

	pub fn modules(&self) -> impl Iterator<Item = &Arc<Module>> {
		self.modules.values()
	}

	pub fn contains(&self, handle: &ModuleHandle) -> bool {
		self.modules.contains_key(handle)
	}

	pub fn len(&self) -> usize {
		self.modules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.modules.is_empty()
	}

	/// Number of times an already processed module was reached again.
	pub fn revisits(&self) -> usize {
		self.revisits
	}
}

/// Declare a module as a lazily initialized static [`ModuleHandle`].
///
/// The source id is the declaring module path followed by the static's name.
#[macro_export]
macro_rules! module {
	($(#[$meta:meta])* $vis:vis $name:ident => |$binder:ident| $body:block) => {
		$(#[$meta])*
		$vis static $name: ::std::sync::LazyLock<$crate::ModuleHandle> =
			::std::sync::LazyLock::new(|| {
				$crate::ModuleHandle::new(
					concat!(module_path!(), "::", stringify!($name)),
					|$binder: &mut $crate::ModuleBinder| $body,
				)
			});
	};
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::binding::BindingVariant;
	use rstest::rstest;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct Marker;

	fn leaf(source: &str) -> ModuleHandle {
		ModuleHandle::new(source, |binder| binder.instance(Marker))
	}

	#[rstest]
	fn builder_runs_once() {
		// Arrange
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&calls);
		let handle = ModuleHandle::new("test::ONCE", move |_binder| {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		// Act
		assert!(!handle.is_evaluated());
		let first = handle.module();
		let second = handle.clone().module();

		// Assert
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(Arc::ptr_eq(&first, &second));
	}

	#[rstest]
	fn handles_compare_by_identity() {
		let a = leaf("test::SAME");
		let b = leaf("test::SAME");

		assert_eq!(a, a.clone());
		assert_ne!(a, b);
	}

	#[rstest]
	fn binder_records_dependencies_and_bindings() {
		let dep = leaf("test::DEP");
		let handle = ModuleHandle::new("test::ROOT", move |binder| {
			binder.dependency(&dep);
			binder.instance(5u32);
			binder.instance_with("label", |b| b.described("label"));
		});

		let module = handle.module();

		assert_eq!(module.source(), "test::ROOT");
		assert_eq!(module.dependencies().len(), 1);
		assert_eq!(module.bindings().len(), 2);
		assert_eq!(module.bindings()[1].description(), "label");
	}

	#[rstest]
	fn list_contributes_list_binding() {
		let handle = ModuleHandle::new("test::LIST", |binder| {
			binder.list(Binding::instance(Marker));
		});

		let module = handle.module();

		assert_eq!(module.bindings()[0].variant(), BindingVariant::List);
	}

	#[rstest]
	fn walk_is_depth_first_pre_order() {
		// Arrange
		let c = leaf("test::C");
		let b = ModuleHandle::new("test::B", {
			let c = c.clone();
			move |binder| binder.dependency(&c)
		});
		let d = leaf("test::D");
		let root = ModuleHandle::new("test::ROOT", move |binder| {
			binder.dependency(&b);
			binder.dependency(&d);
		});

		// Act
		let graph = ModuleGraph::walk(&root);

		// Assert
		let order: Vec<_> = graph.modules().map(|m| m.source().to_string()).collect();
		assert_eq!(order, vec!["test::ROOT", "test::B", "test::C", "test::D"]);
		assert_eq!(graph.revisits(), 0);
	}

	#[rstest]
	fn walk_terminates_on_module_cycle() {
		// Arrange
		let slot: Arc<OnceLock<ModuleHandle>> = Arc::new(OnceLock::new());
		let back = Arc::clone(&slot);
		let a = ModuleHandle::new("test::A", move |binder| {
			if let Some(b) = back.get() {
				binder.dependency(b);
			}
		});
		let b = ModuleHandle::new("test::B", {
			let a = a.clone();
			move |binder| binder.dependency(&a)
		});
		slot.set(b).ok();

		// Act
		let graph = ModuleGraph::walk(&a);

		// Assert
		assert_eq!(graph.len(), 2);
		assert_eq!(graph.revisits(), 1);
	}
}
