//! Resolution context
//!
//! A [`Context`] owns the flattened [`BindingTable`] and resolves keys against
//! it. Every resolution call starts with an empty resolution stack and
//! recomputes everything reachable from the requested key; no value is cached
//! between or within calls.

use crate::binding::{Binding, BindingKind, BindingVariant};
use crate::cycle_detection::ResolutionStack;
use crate::factory::{BoxFuture, Instance};
use crate::injectable::{Injectable, ListValues};
use crate::key::{Classifier, TypeKey};
use crate::module::{ModuleGraph, ModuleHandle};
use crate::provider::{Provider, ProviderHandle};
use crate::table::BindingTable;
use crate::{DiError, DiResult};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Context {
	table: Arc<BindingTable>,
}

impl Context {
	/// Walk the module graph from `root` and flatten it into a context.
	pub fn build(root: &ModuleHandle) -> DiResult<Self> {
		let graph = ModuleGraph::walk(root);
		let table = BindingTable::flatten(&graph)?;
		Ok(Self::from_table(table))
	}

	pub fn from_table(table: BindingTable) -> Self {
		Self {
			table: Arc::new(table),
		}
	}

	pub fn table(&self) -> &BindingTable {
		&self.table
	}

	/// Resolve any [`Injectable`] type.
	///
	/// ```
	/// use std::sync::Arc;
	/// use trellis_di::{Binder, Context, DiResult, ModuleHandle};
	///
	/// struct Count(u32);
	/// struct Config;
	///
	/// # #[tokio::main(flavor = "current_thread")]
	/// # async fn main() -> DiResult<()> {
	/// let module = ModuleHandle::new("docs::count", |binder| binder.instance(Count(5)));
	/// let ctx = Context::build(&module)?;
	///
	/// let count = ctx.get::<Arc<Count>>().await?;
	/// assert_eq!(count.0, 5);
	///
	/// let config = ctx.get::<Option<Arc<Config>>>().await?;
	/// assert!(config.is_none());
	/// # Ok(())
	/// # }
	/// ```
	pub async fn get<R: Injectable>(&self) -> DiResult<R> {
		let resolved = self.resolve_key(R::key()).await?;
		R::from_resolved(resolved)
	}

	pub async fn required<T>(&self) -> DiResult<Arc<T>>
	where
		T: Any + Send + Sync,
	{
		self.get::<Arc<T>>().await
	}

	pub async fn optional<T>(&self) -> DiResult<Option<Arc<T>>>
	where
		T: Any + Send + Sync,
	{
		self.get::<Option<Arc<T>>>().await
	}

	pub async fn provider<T>(&self) -> DiResult<Provider<T>>
	where
		T: Any + Send + Sync,
	{
		self.get::<Provider<T>>().await
	}

	/// Resolve an erased key from a fresh resolution stack.
	///
	/// `Ok(None)` only for optional keys with no binding.
	pub async fn resolve_key(&self, key: TypeKey) -> DiResult<Option<Instance>> {
		let mut stack = ResolutionStack::new();
		self.resolve(key, &mut stack).await
	}

	fn resolve<'a>(
		&'a self,
		key: TypeKey,
		stack: &'a mut ResolutionStack,
	) -> BoxFuture<'a, DiResult<Option<Instance>>> {
		Box::pin(async move {
			stack.check(&key, &self.table)?;
			tracing::trace!(key = %key, depth = stack.depth(), "Resolving");

			match key.classifier() {
				Classifier::Global => return Err(DiError::GlobalInstance(key.to_string())),
				Classifier::Provider => {
					let handle = ProviderHandle {
						context: self.clone(),
						key: key.required(),
					};
					return Ok(Some(Arc::new(handle) as Instance));
				}
				Classifier::Type | Classifier::List => {}
			}

			let Some(entry) = self.table.get(&key) else {
				if key.classifier() == Classifier::List {
					return Ok(Some(Arc::new(ListValues(Vec::new())) as Instance));
				}
				if key.is_optional() {
					return Ok(None);
				}
				return Err(DiError::not_found(&key));
			};

			stack.enter(key);
			let result = self.invoke(&entry.binding, stack).await;
			stack.exit(&key);
			result
		})
	}

	fn invoke<'a>(
		&'a self,
		binding: &'a Binding,
		stack: &'a mut ResolutionStack,
	) -> BoxFuture<'a, DiResult<Option<Instance>>> {
		Box::pin(async move {
			let value = match &binding.kind {
				BindingKind::Instance(value) => Arc::clone(value),
				BindingKind::Factory(factory) => factory.call().into_inner().await?,
				BindingKind::Constructor {
					dependencies,
					construct,
				} => {
					// Declared order; each argument fully resolved before the next.
					let mut args = Vec::with_capacity(dependencies.len());
					for dependency in dependencies {
						args.push(self.resolve(*dependency, stack).await?);
					}
					construct.call(args).into_inner().await?
				}
				BindingKind::List(elements) => {
					let mut values = Vec::with_capacity(elements.len());
					for element in elements {
						if element.binding.variant() == BindingVariant::List {
							return Err(DiError::UnsupportedBinding {
								key: binding.key().to_string(),
								variant: BindingVariant::List.to_string(),
							});
						}
						if let Some(value) = self.invoke(&element.binding, stack).await? {
							values.push(value);
						}
					}
					Arc::new(ListValues(values)) as Instance
				}
				BindingKind::Alias { target, convert } => {
					if binding.key().is_optional() && !self.table.contains(target) {
						return Ok(None);
					}
					let resolved = self
						.resolve(*target, stack)
						.await?
						.ok_or_else(|| DiError::not_found(target))?;
					match convert {
						Some(convert) => convert(resolved)?,
						None => resolved,
					}
				}
			};
			let value = binding
				.decorators
				.iter()
				.try_fold(value, |value, decorate| decorate(value))?;
			Ok(Some(value))
		})
	}

	/// Check that `key` could be resolved, without invoking any producer.
	///
	/// Reports the first missing required binding, circular dependency or
	/// global key with the same error resolution would raise. Dependencies
	/// behind a [`Provider`] are checked once, from a fresh path.
	pub fn validate(&self, key: TypeKey) -> DiResult<()> {
		let mut stack = ResolutionStack::new();
		let mut validated = HashSet::new();
		self.validate_key(key, &mut stack, &mut validated)
	}

	pub fn validate_for<R: Injectable>(&self) -> DiResult<()> {
		self.validate(R::key())
	}

	fn validate_key(
		&self,
		key: TypeKey,
		stack: &mut ResolutionStack,
		validated: &mut HashSet<TypeKey>,
	) -> DiResult<()> {
		stack.check(&key, &self.table)?;
		if validated.contains(&key) {
			return Ok(());
		}

		match key.classifier() {
			Classifier::Global => return Err(DiError::GlobalInstance(key.to_string())),
			Classifier::Provider => {
				validated.insert(key);
				return self.validate_key(key.required(), &mut ResolutionStack::new(), validated);
			}
			Classifier::Type | Classifier::List => {}
		}

		let Some(entry) = self.table.get(&key) else {
			if key.classifier() == Classifier::List || key.is_optional() {
				return Ok(());
			}
			return Err(DiError::not_found(&key));
		};

		let dependencies = entry.binding.dependencies();
		let dangling_optional_alias = key.is_optional()
			&& entry.binding.variant() == BindingVariant::Alias
			&& dependencies.iter().all(|target| !self.table.contains(target));
		if !dangling_optional_alias {
			stack.enter(key);
			let mut result = Ok(());
			for dependency in dependencies {
				result = self.validate_key(dependency, stack, validated);
				if result.is_err() {
					break;
				}
			}
			stack.exit(&key);
			result?;
		}

		validated.insert(key);
		Ok(())
	}

	/// Static dependency graph of every binding in the table.
	#[cfg(feature = "dev-tools")]
	pub fn dependency_graph(&self) -> crate::visualization::DependencyGraph {
		crate::visualization::DependencyGraph::from_table(&self.table)
	}
}

impl fmt::Debug for Context {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context")
			.field("bindings", &self.table.len())
			.field("sources", &self.table.sources())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::module::Binder;
	use rstest::rstest;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[derive(Debug, PartialEq)]
	struct Count(u32);
	struct Greeting(String);
	struct Length(usize);
	#[derive(Debug)]
	struct Config;
	#[derive(Debug)]
	struct Selfish;

	fn context(builder: impl Fn(&mut crate::module::ModuleBinder) + Send + Sync + 'static) -> Context {
		Context::build(&ModuleHandle::new("test::ROOT", builder)).unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn instance_resolves_to_stored_value() {
		let ctx = context(|binder| binder.instance(Count(5)));

		let count = ctx.required::<Count>().await.unwrap();

		assert_eq!(*count, Count(5));
	}

	#[rstest]
	#[tokio::test]
	async fn constructor_receives_resolved_parameters() {
		// Arrange
		let ctx = context(|binder| {
			binder.factory(|| async { DiResult::Ok(Greeting("hello".to_string())) });
			binder.provide(|greeting: Arc<Greeting>| async move {
				DiResult::Ok(Length(greeting.0.chars().count()))
			});
		});

		// Act
		let length = ctx.required::<Length>().await.unwrap();

		// Assert
		assert_eq!(length.0, 5);
	}

	#[rstest]
	#[tokio::test]
	async fn missing_required_is_not_found() {
		let ctx = context(|_binder| {});

		let err = ctx.required::<Config>().await.unwrap_err();

		assert_eq!(
			err.to_string(),
			format!("Required {} not found in context.", std::any::type_name::<Config>())
		);
	}

	#[rstest]
	#[tokio::test]
	async fn missing_optional_is_none() {
		let ctx = context(|_binder| {});

		let config = ctx.optional::<Config>().await.unwrap();

		assert!(config.is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn self_dependency_is_circular() {
		// Arrange
		let ctx = context(|binder| {
			binder.provide(|_me: Arc<Selfish>| async move { DiResult::Ok(Selfish) });
		});

		// Act
		let err = ctx.required::<Selfish>().await.unwrap_err();

		// Assert
		let name = std::any::type_name::<Selfish>();
		assert!(err.to_string().contains(&format!("{name} -> {name}")));
		assert!(err.to_string().contains("<-- Circular dependency starts here"));
	}

	#[rstest]
	#[tokio::test]
	async fn global_key_is_rejected_before_lookup() {
		let ctx = context(|binder| binder.instance(Count(1)));

		let err = ctx.get::<&'static Count>().await.unwrap_err();

		assert!(matches!(err, DiError::GlobalInstance(_)));
	}

	#[rstest]
	#[tokio::test]
	async fn factory_runs_on_every_resolution() {
		// Arrange
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&calls);
		let ctx = context(move |binder| {
			let counter = Arc::clone(&counter);
			binder.factory(move || {
				counter.fetch_add(1, Ordering::SeqCst);
				async { DiResult::Ok(Count(0)) }
			});
		});

		// Act
		ctx.required::<Count>().await.unwrap();
		ctx.required::<Count>().await.unwrap();

		// Assert
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn decorators_wrap_produced_value() {
		let ctx = context(|binder| {
			binder.instance_with(Count(1), |binding| {
				binding
					.decorate(|count: Arc<Count>| Arc::new(Count(count.0 + 1)))
					.decorate(|count: Arc<Count>| Arc::new(Count(count.0 * 10)))
			});
		});

		let count = ctx.required::<Count>().await.unwrap();

		assert_eq!(*count, Count(20));
	}

	#[rstest]
	fn validate_reports_missing_dependency_without_invoking() {
		// Arrange
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&calls);
		let ctx = context(move |binder| {
			let counter = Arc::clone(&counter);
			binder.provide(move |_config: Arc<Config>| {
				counter.fetch_add(1, Ordering::SeqCst);
				async { DiResult::Ok(Count(0)) }
			});
		});

		// Act
		let result = ctx.validate_for::<Arc<Count>>();

		// Assert
		assert!(matches!(result, Err(DiError::NotFound(_))));
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[rstest]
	fn validate_detects_cycle() {
		let ctx = context(|binder| {
			binder.provide(|_me: Arc<Selfish>| async move { DiResult::Ok(Selfish) });
		});

		let result = ctx.validate(TypeKey::of::<Selfish>());

		assert!(matches!(result, Err(DiError::CircularDependency { .. })));
	}

	#[rstest]
	fn validate_accepts_provider_cycle() {
		let ctx = context(|binder| {
			binder.provide(|_me: crate::Provider<Selfish>| async move { DiResult::Ok(Selfish) });
		});

		assert!(ctx.validate_for::<Arc<Selfish>>().is_ok());
	}
}
