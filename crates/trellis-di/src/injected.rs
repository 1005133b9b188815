//! Injected wrapper for constructor parameters
//!
//! [`Injected<T>`] is a thin `Arc<T>` wrapper for constructors that prefer a
//! named dependency type over a bare `Arc`.
//!
//! # Examples
//!
//! ```
//! use trellis_di::{DiResult, Injected, OptionalInjected};
//!
//! struct Database;
//! struct Cache;
//! struct Repository;
//!
//! async fn repository(
//!     _db: Injected<Database>,
//!     _cache: OptionalInjected<Cache>,
//! ) -> DiResult<Repository> {
//!     // db is always available, cache may be unbound
//!     Ok(Repository)
//! }
//! ```

use crate::factory::Instance;
use crate::injectable::Injectable;
use crate::key::TypeKey;
use crate::DiResult;
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Injected dependency wrapper
///
/// Wraps an `Arc<T>` and gives transparent access via `Deref`.
pub struct Injected<T> {
	inner: Arc<T>,
}

impl<T> Injected<T> {
	/// Create from value for testing
	///
	/// # Examples
	///
	/// ```
	/// use trellis_di::Injected;
	///
	/// struct Database {
	///     connection_count: usize,
	/// }
	///
	/// let injected = Injected::from_value(Database { connection_count: 10 });
	/// assert_eq!(injected.connection_count, 10);
	/// ```
	pub fn from_value(value: T) -> Self {
		Self {
			inner: Arc::new(value),
		}
	}

	pub fn from_arc(inner: Arc<T>) -> Self {
		Self { inner }
	}

	pub fn as_arc(&self) -> &Arc<T> {
		&self.inner
	}

	pub fn into_arc(self) -> Arc<T> {
		self.inner
	}
}

impl<T: Clone> Injected<T> {
	/// Extract inner value, cloning when the value is still shared
	pub fn into_inner(self) -> T {
		Arc::try_unwrap(self.inner).unwrap_or_else(|arc| (*arc).clone())
	}
}

impl<T> Deref for Injected<T> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		&self.inner
	}
}

impl<T> Clone for Injected<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> AsRef<T> for Injected<T> {
	fn as_ref(&self) -> &T {
		&self.inner
	}
}

impl<T: fmt::Debug> fmt::Debug for Injected<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Injected").field(&self.inner).finish()
	}
}

impl<T> Injectable for Injected<T>
where
	T: Any + Send + Sync,
{
	fn key() -> TypeKey {
		TypeKey::of::<T>()
	}

	fn from_resolved(resolved: Option<Instance>) -> DiResult<Self> {
		<Arc<T>>::from_resolved(resolved).map(Self::from_arc)
	}
}

/// Optional injected dependency
///
/// Resolved by the optional key of `T`; `None` when nothing binds it.
pub type OptionalInjected<T> = Option<Injected<T>>;

impl<T> Injectable for Option<Injected<T>>
where
	T: Any + Send + Sync,
{
	fn key() -> TypeKey {
		TypeKey::optional::<T>()
	}

	fn from_resolved(resolved: Option<Instance>) -> DiResult<Self> {
		<Option<Arc<T>>>::from_resolved(resolved).map(|value| value.map(Injected::from_arc))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::DiError;
	use rstest::rstest;

	#[derive(Clone, Debug)]
	struct TestConfig {
		value: String,
	}

	#[rstest]
	fn injected_deref() {
		let injected = Injected::from_value(TestConfig {
			value: "test".to_string(),
		});

		assert_eq!(injected.value, "test");
	}

	#[rstest]
	fn injected_clone_shares_arc() {
		let injected1 = Injected::from_value(TestConfig {
			value: "shared".to_string(),
		});
		let injected2 = injected1.clone();

		assert_eq!(Arc::strong_count(injected1.as_arc()), 2);
		assert!(Arc::ptr_eq(injected1.as_arc(), injected2.as_arc()));
	}

	#[rstest]
	fn into_inner_with_multiple_references_clones() {
		let injected1 = Injected::from_value(TestConfig {
			value: "multiple".to_string(),
		});
		let _injected2 = injected1.clone();

		let inner = injected1.into_inner();

		assert_eq!(inner.value, "multiple");
	}

	#[rstest]
	fn keys_match_arc_parameters() {
		assert_eq!(<Injected<TestConfig>>::key(), <Arc<TestConfig>>::key());
		assert_eq!(
			<OptionalInjected<TestConfig>>::key(),
			<Option<Arc<TestConfig>>>::key()
		);
	}

	#[rstest]
	fn from_resolved_wraps_instance() {
		let instance: Instance = Arc::new(TestConfig {
			value: "resolved".to_string(),
		});

		let injected = <Injected<TestConfig>>::from_resolved(Some(instance)).unwrap();

		assert_eq!(injected.value, "resolved");
	}

	#[rstest]
	fn optional_from_nothing_is_none() {
		let injected = <OptionalInjected<TestConfig>>::from_resolved(None).unwrap();

		assert!(injected.is_none());
	}

	#[rstest]
	fn required_from_nothing_is_not_found() {
		let result = <Injected<TestConfig>>::from_resolved(None);

		assert!(matches!(result, Err(DiError::NotFound(_))));
	}
}
