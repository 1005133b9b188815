//! Erased factories and typed constructors
//!
//! Bindings store their producers type-erased so the table can hold every
//! binding in one map. The typed surface is [`Constructor`], implemented for
//! plain async closures whose parameters are [`Injectable`].

use crate::injectable::Injectable;
use crate::key::TypeKey;
use crate::{DiError, DiResult};
use std::any::Any;
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;

/// A resolved value, shared and type-erased.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Boxed future used wherever the container recurses or erases a producer.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type InstanceFutureInner = BoxFuture<'static, DiResult<Instance>>;

/// Future produced by an erased factory or constructor
pub struct InstanceFuture(InstanceFutureInner);

impl InstanceFuture {
	pub fn new(future: InstanceFutureInner) -> Self {
		Self(future)
	}

	/// Wrap a typed future, erasing its output.
	pub fn from_typed<Fut, T>(future: Fut) -> Self
	where
		Fut: Future<Output = DiResult<T>> + Send + 'static,
		T: Any + Send + Sync,
	{
		Self(Box::pin(async move {
			let value = future.await?;
			Ok(Arc::new(value) as Instance)
		}))
	}

	pub fn ready(result: DiResult<Instance>) -> Self {
		Self(Box::pin(async move { result }))
	}

	pub fn into_inner(self) -> InstanceFutureInner {
		self.0
	}
}

/// Parameterless producer behind a factory binding.
#[derive(Clone)]
pub struct FactoryFn(Arc<dyn Fn() -> InstanceFuture + Send + Sync>);

impl FactoryFn {
	pub fn new<F, Fut, T>(factory: F) -> Self
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = DiResult<T>> + Send + 'static,
		T: Any + Send + Sync,
	{
		Self(Arc::new(move || InstanceFuture::from_typed(factory())))
	}

	pub fn call(&self) -> InstanceFuture {
		(self.0)()
	}
}

impl Deref for FactoryFn {
	type Target = Arc<dyn Fn() -> InstanceFuture + Send + Sync>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Producer behind a constructor binding; receives one resolved argument per
/// declared dependency, in declaration order.
#[derive(Clone)]
pub struct ConstructFn(Arc<dyn Fn(Vec<Option<Instance>>) -> InstanceFuture + Send + Sync>);

impl ConstructFn {
	pub fn new<C, Args, T>(constructor: C) -> Self
	where
		C: Constructor<Args, T>,
		T: Any + Send + Sync,
	{
		Self(Arc::new(move |args| constructor.construct(args)))
	}

	pub fn call(&self, args: Vec<Option<Instance>>) -> InstanceFuture {
		(self.0)(args)
	}
}

/// A callable whose parameters are resolved by the container.
///
/// Implemented for every `Fn(A1, .., An) -> Fut` with up to eight
/// [`Injectable`] parameters and an async `DiResult<T>` output.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trellis_di::{Constructor, DiResult, TypeKey};
///
/// struct Greeting(String);
/// struct Length(usize);
///
/// fn dependencies_of<C: Constructor<Args, T>, Args, T>(_: &C) -> Vec<TypeKey> {
///     C::dependencies()
/// }
///
/// let length = |greeting: Arc<Greeting>| async move { DiResult::Ok(Length(greeting.0.len())) };
/// assert_eq!(dependencies_of(&length), vec![TypeKey::of::<Greeting>()]);
/// ```
pub trait Constructor<Args, T>: Send + Sync + 'static {
	/// Keys of the parameters, in declaration order.
	fn dependencies() -> Vec<TypeKey>;

	/// Invoke the callable with the resolved arguments.
	fn construct(&self, args: Vec<Option<Instance>>) -> InstanceFuture;
}

macro_rules! impl_constructor {
	($($arg:ident),*) => {
		impl<F, Fut, T, $($arg,)*> Constructor<($($arg,)*), T> for F
		where
			F: Fn($($arg),*) -> Fut + Send + Sync + 'static,
			Fut: Future<Output = DiResult<T>> + Send + 'static,
			T: Any + Send + Sync,
			$($arg: Injectable,)*
		{
			fn dependencies() -> Vec<TypeKey> {
				vec![$($arg::key()),*]
			}

			#[allow(non_snake_case, unused_mut, unused_variables)]
			fn construct(&self, args: Vec<Option<Instance>>) -> InstanceFuture {
				let expected = Self::dependencies().len();
				if args.len() != expected {
					return InstanceFuture::ready(Err(DiError::Internal {
						message: format!(
							"constructor expects {} arguments, got {}",
							expected,
							args.len()
						),
					}));
				}
				let mut args = args.into_iter();
				$(
					let $arg = match $arg::from_resolved(args.next().flatten()) {
						Ok(value) => value,
						Err(err) => return InstanceFuture::ready(Err(err)),
					};
				)*
				InstanceFuture::from_typed((self)($($arg),*))
			}
		}
	};
}

impl_constructor!();
impl_constructor!(A1);
impl_constructor!(A1, A2);
impl_constructor!(A1, A2, A3);
impl_constructor!(A1, A2, A3, A4);
impl_constructor!(A1, A2, A3, A4, A5);
impl_constructor!(A1, A2, A3, A4, A5, A6);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7, A8);
