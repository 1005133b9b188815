//! Bindings
//!
//! A [`Binding`] is a recipe for producing the value of one [`TypeKey`].
//! Bindings are immutable once contributed; transforms such as
//! [`Binding::described`], [`Binding::decorate`] and [`Binding::into_list`]
//! consume a binding and return a new one, so they can be passed to the
//! `*_with` methods of [`Binder`](crate::Binder).

use crate::factory::{ConstructFn, Constructor, FactoryFn, Instance};
use crate::injectable::downcast;
use crate::key::{Classifier, TypeKey};
use crate::DiResult;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Tag of a binding variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingVariant {
	Instance,
	Factory,
	Constructor,
	List,
	Alias,
}

impl fmt::Display for BindingVariant {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			BindingVariant::Instance => "instance",
			BindingVariant::Factory => "factory",
			BindingVariant::Constructor => "constructor",
			BindingVariant::List => "list",
			BindingVariant::Alias => "alias",
		};
		f.write_str(name)
	}
}

type ConvertFn = Arc<dyn Fn(Instance) -> DiResult<Instance> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum BindingKind {
	Instance(Instance),
	Factory(FactoryFn),
	Constructor {
		dependencies: Vec<TypeKey>,
		construct: ConstructFn,
	},
	List(Vec<ListElement>),
	Alias {
		target: TypeKey,
		convert: Option<ConvertFn>,
	},
}

/// One contribution to a multibinding
#[derive(Clone)]
pub(crate) struct ListElement {
	pub(crate) binding: Binding,
	/// Module that contributed the element, filled in while flattening
	pub(crate) source: Option<String>,
}

#[derive(Clone)]
pub struct Binding {
	key: TypeKey,
	pub(crate) kind: BindingKind,
	description: String,
	pub(crate) decorators: Vec<ConvertFn>,
}

impl Binding {
	fn new(key: TypeKey, kind: BindingKind, description: String) -> Self {
		Self {
			key,
			kind,
			description,
			decorators: Vec::new(),
		}
	}

	/// Bind `T` to a value fixed at declaration time.
	pub fn instance<T>(value: T) -> Self
	where
		T: Any + Send + Sync,
	{
		Self::new(
			TypeKey::of::<T>(),
			BindingKind::Instance(Arc::new(value)),
			format!("instance [{}]", std::any::type_name::<T>()),
		)
	}

	/// Bind `T` to a parameterless async factory, invoked on every resolution.
	pub fn factory<T, F, Fut>(factory: F) -> Self
	where
		T: Any + Send + Sync,
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = DiResult<T>> + Send + 'static,
	{
		Self::new(
			TypeKey::of::<T>(),
			BindingKind::Factory(FactoryFn::new(factory)),
			format!("factory [{}]", std::any::type_name::<F>()),
		)
	}

	/// Bind `T` to a callable whose parameters are resolved by the container.
	pub fn constructor<T, Args, C>(constructor: C) -> Self
	where
		T: Any + Send + Sync,
		C: Constructor<Args, T>,
	{
		Self::new(
			TypeKey::of::<T>(),
			BindingKind::Constructor {
				dependencies: C::dependencies(),
				construct: ConstructFn::new(constructor),
			},
			format!("constructor [{}]", std::any::type_name::<C>()),
		)
	}

	/// Bind `T` by forwarding to the binding of `S` and converting its value.
	pub fn alias<T, S, F>(convert: F) -> Self
	where
		T: Any + Send + Sync,
		S: Any + Send + Sync,
		F: Fn(Arc<S>) -> T + Send + Sync + 'static,
	{
		let target = TypeKey::of::<S>();
		let convert: ConvertFn = Arc::new(move |instance| {
			let source = downcast::<S>(instance, &target)?;
			Ok(Arc::new(convert(source)) as Instance)
		});
		Self::new(
			TypeKey::of::<T>(),
			BindingKind::Alias {
				target,
				convert: Some(convert),
			},
			format!("alias [-> {}]", target),
		)
	}

	/// Bind the optional key of `T` to the required binding of `T`.
	pub fn optional_alias<T>() -> Self
	where
		T: Any + Send + Sync,
	{
		let target = TypeKey::of::<T>();
		Self::new(
			TypeKey::optional::<T>(),
			BindingKind::Alias {
				target,
				convert: None,
			},
			format!("alias [-> {}]", target),
		)
	}

	/// Turn this binding into one element of the multibinding for its type.
	///
	/// Elements contributed by any module under the same type are collected,
	/// in module traversal order, and injected as `Vec<Arc<T>>`.
	pub fn into_list(self) -> Self {
		if self.key.classifier() == Classifier::List {
			return self;
		}
		let key = self.key.as_list();
		let mut list = Self::new(
			key,
			BindingKind::List(vec![ListElement {
				binding: self,
				source: None,
			}]),
			String::new(),
		);
		list.refresh_list_description();
		list
	}

	/// Replace the description printed in diagnostics.
	///
	/// On a list binding the description goes to its elements, since list
	/// contributions from different modules are merged element by element.
	pub fn described(mut self, description: impl Into<String>) -> Self {
		let description = description.into();
		if let BindingKind::List(elements) = &mut self.kind {
			for element in elements.iter_mut() {
				element.binding.description = description.clone();
			}
			self.refresh_list_description();
			return self;
		}
		self.description = description;
		self
	}

	/// Wrap every value this binding produces.
	///
	/// Decorators run after the value is produced, in the order they were
	/// added. `T` must be the type the binding produces, otherwise resolution
	/// fails with [`DiError::TypeMismatch`](crate::DiError::TypeMismatch).
	/// On a list binding `T` is the element type and the decorator wraps
	/// each element.
	pub fn decorate<T, F>(mut self, decorator: F) -> Self
	where
		T: Any + Send + Sync,
		F: Fn(Arc<T>) -> Arc<T> + Send + Sync + 'static,
	{
		let key = self.key;
		let decorator: ConvertFn = Arc::new(move |instance| {
			let value = downcast::<T>(instance, &key)?;
			Ok(decorator(value) as Instance)
		});
		match &mut self.kind {
			BindingKind::List(elements) => {
				for element in elements.iter_mut() {
					element.binding.decorators.push(Arc::clone(&decorator));
				}
			}
			_ => self.decorators.push(decorator),
		}
		self
	}

	pub fn key(&self) -> TypeKey {
		self.key
	}

	pub fn variant(&self) -> BindingVariant {
		match self.kind {
			BindingKind::Instance(_) => BindingVariant::Instance,
			BindingKind::Factory(_) => BindingVariant::Factory,
			BindingKind::Constructor { .. } => BindingVariant::Constructor,
			BindingKind::List(_) => BindingVariant::List,
			BindingKind::Alias { .. } => BindingVariant::Alias,
		}
	}

	pub fn description(&self) -> &str {
		&self.description
	}

	/// Keys this binding needs resolved before it can produce a value.
	///
	/// Constructor parameters, alias targets, and the dependencies of every
	/// list element.
	pub fn dependencies(&self) -> Vec<TypeKey> {
		match &self.kind {
			BindingKind::Instance(_) | BindingKind::Factory(_) => Vec::new(),
			BindingKind::Constructor { dependencies, .. } => dependencies.clone(),
			BindingKind::List(elements) => elements
				.iter()
				.flat_map(|element| element.binding.dependencies())
				.collect(),
			BindingKind::Alias { target, .. } => vec![*target],
		}
	}

	/// Number of elements of a list binding, zero for every other variant.
	pub fn element_count(&self) -> usize {
		match &self.kind {
			BindingKind::List(elements) => elements.len(),
			_ => 0,
		}
	}

	/// Recompute a list description from its elements, after a merge.
	pub(crate) fn refresh_list_description(&mut self) {
		if let BindingKind::List(elements) = &self.kind {
			let parts: Vec<&str> = elements
				.iter()
				.map(|element| element.binding.description())
				.collect();
			self.description = format!("list [{}]", parts.join(", "));
		}
	}

	pub(crate) fn list_elements_mut(&mut self) -> Option<&mut Vec<ListElement>> {
		match &mut self.kind {
			BindingKind::List(elements) => Some(elements),
			_ => None,
		}
	}
}

impl fmt::Debug for Binding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Binding")
			.field("key", &self.key)
			.field("variant", &self.variant())
			.field("description", &self.description)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	struct Greeting;
	struct Length;
	#[derive(Debug)]
	struct Plugin;

	#[rstest]
	fn instance_is_keyed_by_value_type() {
		let binding = Binding::instance(Greeting);

		assert_eq!(binding.key(), TypeKey::of::<Greeting>());
		assert_eq!(binding.variant(), BindingVariant::Instance);
		assert!(binding.dependencies().is_empty());
	}

	#[rstest]
	fn constructor_records_parameter_keys() {
		let binding =
			Binding::constructor(|_greeting: Arc<Greeting>| async move { DiResult::Ok(Length) });

		assert_eq!(binding.key(), TypeKey::of::<Length>());
		assert_eq!(binding.variant(), BindingVariant::Constructor);
		assert_eq!(binding.dependencies(), vec![TypeKey::of::<Greeting>()]);
	}

	#[rstest]
	fn alias_depends_on_target() {
		let binding = Binding::alias(|_greeting: Arc<Greeting>| Length);

		assert_eq!(binding.key(), TypeKey::of::<Length>());
		assert_eq!(binding.dependencies(), vec![TypeKey::of::<Greeting>()]);
	}

	#[rstest]
	fn optional_alias_targets_required_key() {
		let binding = Binding::optional_alias::<Greeting>();

		assert_eq!(binding.key(), TypeKey::optional::<Greeting>());
		assert_eq!(binding.dependencies(), vec![TypeKey::of::<Greeting>()]);
	}

	#[rstest]
	fn into_list_rekeys_as_list_element() {
		// Act
		let binding = Binding::instance(Plugin).into_list();

		// Assert
		assert_eq!(binding.key(), TypeKey::list::<Plugin>());
		assert_eq!(binding.variant(), BindingVariant::List);
		assert_eq!(binding.element_count(), 1);
	}

	#[rstest]
	fn described_overrides_description() {
		let binding = Binding::instance(Plugin).described("the plugin");

		assert_eq!(binding.description(), "the plugin");
	}

	#[rstest]
	fn factory_description_names_closure() {
		let binding = Binding::factory(|| async { DiResult::Ok(Plugin) });

		assert!(binding.description().starts_with("factory ["));
	}

	#[rstest]
	fn list_transforms_apply_to_elements() {
		// Act
		let binding = Binding::instance(Plugin)
			.into_list()
			.described("first plugin")
			.decorate::<Plugin, _>(|plugin| plugin);

		// Assert
		assert_eq!(binding.description(), "list [first plugin]");
		assert!(binding.decorators.is_empty());
		let BindingKind::List(elements) = &binding.kind else {
			panic!("expected a list binding");
		};
		assert_eq!(elements[0].binding.description(), "first plugin");
		assert_eq!(elements[0].binding.decorators.len(), 1);
	}
}
