//! Injectable trait for constructor parameters

use crate::factory::Instance;
use crate::key::TypeKey;
use crate::{DiError, DiResult};
use std::any::Any;
use std::sync::Arc;

/// Injectable trait for constructor parameters.
///
/// A parameter type declares the [`TypeKey`] it is resolved by and how it is
/// rebuilt from the erased resolution result. The container resolves the key,
/// then hands the result to [`Injectable::from_resolved`]; `None` means the
/// key was optional and unbound.
///
/// | Parameter          | Key                        |
/// |--------------------|----------------------------|
/// | `Arc<T>`           | [`TypeKey::of`]            |
/// | `Option<Arc<T>>`   | [`TypeKey::optional`]      |
/// | `Vec<Arc<T>>`      | [`TypeKey::list`]          |
/// | `&'static T`       | [`TypeKey::global`]        |
///
/// [`Injected`](crate::Injected) and [`Provider`](crate::Provider) implement
/// it as well.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use trellis_di::{Injectable, TypeKey};
///
/// struct Config;
///
/// assert_eq!(<Arc<Config>>::key(), TypeKey::of::<Config>());
/// assert_eq!(<Option<Arc<Config>>>::key(), TypeKey::optional::<Config>());
/// ```
pub trait Injectable: Sized + Send + 'static {
	fn key() -> TypeKey;

	fn from_resolved(resolved: Option<Instance>) -> DiResult<Self>;
}

/// Values of a resolved multibinding, in contribution order
pub(crate) struct ListValues(pub(crate) Vec<Instance>);

pub(crate) fn downcast<T: Any + Send + Sync>(instance: Instance, key: &TypeKey) -> DiResult<Arc<T>> {
	instance
		.downcast::<T>()
		.map_err(|_| DiError::type_mismatch::<T>(key))
}

impl<T> Injectable for Arc<T>
where
	T: Any + Send + Sync,
{
	fn key() -> TypeKey {
		TypeKey::of::<T>()
	}

	fn from_resolved(resolved: Option<Instance>) -> DiResult<Self> {
		let key = Self::key();
		let instance = resolved.ok_or_else(|| DiError::not_found(&key))?;
		downcast::<T>(instance, &key)
	}
}

impl<T> Injectable for Option<Arc<T>>
where
	T: Any + Send + Sync,
{
	fn key() -> TypeKey {
		TypeKey::optional::<T>()
	}

	fn from_resolved(resolved: Option<Instance>) -> DiResult<Self> {
		resolved
			.map(|instance| downcast::<T>(instance, &Self::key()))
			.transpose()
	}
}

impl<T> Injectable for Vec<Arc<T>>
where
	T: Any + Send + Sync,
{
	fn key() -> TypeKey {
		TypeKey::list::<T>()
	}

	fn from_resolved(resolved: Option<Instance>) -> DiResult<Self> {
		let key = Self::key();
		let Some(instance) = resolved else {
			return Ok(Vec::new());
		};
		let values = downcast::<ListValues>(instance, &key)?;
		values
			.0
			.iter()
			.map(|element| downcast::<T>(Arc::clone(element), &key))
			.collect()
	}
}

/// Globals are never handed out by the container; resolution of their key
/// fails before reaching this point.
impl<T> Injectable for &'static T
where
	T: Any + Sync,
{
	fn key() -> TypeKey {
		TypeKey::global::<T>()
	}

	fn from_resolved(_resolved: Option<Instance>) -> DiResult<Self> {
		Err(DiError::GlobalInstance(Self::key().to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[derive(Debug, PartialEq)]
	struct Plugin(&'static str);

	#[rstest]
	fn required_arc_downcasts() {
		let instance: Instance = Arc::new(Plugin("auth"));

		let plugin = <Arc<Plugin>>::from_resolved(Some(instance)).unwrap();

		assert_eq!(*plugin, Plugin("auth"));
	}

	#[rstest]
	fn required_arc_missing_is_not_found() {
		let result = <Arc<Plugin>>::from_resolved(None);

		assert!(matches!(result, Err(DiError::NotFound(_))));
	}

	#[rstest]
	fn required_arc_wrong_type_is_mismatch() {
		let instance: Instance = Arc::new(42u8);

		let result = <Arc<Plugin>>::from_resolved(Some(instance));

		assert!(matches!(result, Err(DiError::TypeMismatch { .. })));
	}

	#[rstest]
	fn optional_arc_missing_is_none() {
		let result = <Option<Arc<Plugin>>>::from_resolved(None).unwrap();

		assert!(result.is_none());
	}

	#[rstest]
	fn list_rebuilds_each_element() {
		// Arrange
		let values = ListValues(vec![Arc::new(Plugin("a")), Arc::new(Plugin("b"))]);
		let instance: Instance = Arc::new(values);

		// Act
		let plugins = <Vec<Arc<Plugin>>>::from_resolved(Some(instance)).unwrap();

		// Assert
		let names: Vec<_> = plugins.iter().map(|p| p.0).collect();
		assert_eq!(names, vec!["a", "b"]);
	}

	#[rstest]
	fn global_reference_is_always_rejected() {
		let result = <&'static Plugin>::from_resolved(Some(Arc::new(Plugin("static"))));

		assert!(matches!(result, Err(DiError::GlobalInstance(_))));
	}
}
