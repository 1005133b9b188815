//! Deferred providers
//!
//! Requesting [`Provider<T>`] instead of `Arc<T>` defers construction of `T`
//! until [`Provider::get`] is called. Every call is an independent resolution
//! starting from an empty resolution stack; nothing is memoized between calls.

use crate::context::Context;
use crate::factory::Instance;
use crate::injectable::{Injectable, downcast};
use crate::key::TypeKey;
use crate::{DiError, DiResult};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Erased provider produced by the resolution engine for provider keys
#[derive(Clone)]
pub(crate) struct ProviderHandle {
	pub(crate) context: Context,
	pub(crate) key: TypeKey,
}

/// Injectable deferred-construction handle for `T`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use trellis_di::{Binder, Context, DiResult, ModuleHandle, Provider};
///
/// struct Connection(usize);
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> DiResult<()> {
/// let opened = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&opened);
/// let module = ModuleHandle::new("docs::connections", move |binder| {
///     let counter = Arc::clone(&counter);
///     binder.factory(move || {
///         let n = counter.fetch_add(1, Ordering::SeqCst);
///         async move { Ok(Connection(n)) }
///     });
/// });
///
/// let ctx = Context::build(&module)?;
/// let provider = ctx.provider::<Connection>().await?;
/// assert_eq!(opened.load(Ordering::SeqCst), 0);
///
/// assert_eq!(provider.get().await?.0, 0);
/// assert_eq!(provider.get().await?.0, 1);
/// # Ok(())
/// # }
/// ```
pub struct Provider<T> {
	handle: ProviderHandle,
	_marker: PhantomData<fn() -> T>,
}

impl<T> Provider<T>
where
	T: Any + Send + Sync,
{
	/// Resolve a fresh `T`.
	pub async fn get(&self) -> DiResult<Arc<T>> {
		let key = self.handle.key;
		let instance = self
			.handle
			.context
			.resolve_key(key)
			.await?
			.ok_or_else(|| DiError::not_found(&key))?;
		downcast::<T>(instance, &key)
	}

	/// Key this provider resolves on every call.
	pub fn target_key(&self) -> TypeKey {
		self.handle.key
	}
}

impl<T> Clone for Provider<T> {
	fn clone(&self) -> Self {
		Self {
			handle: self.handle.clone(),
			_marker: PhantomData,
		}
	}
}

impl<T> fmt::Debug for Provider<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Provider")
			.field("key", &self.handle.key)
			.finish()
	}
}

impl<T> Injectable for Provider<T>
where
	T: Any + Send + Sync,
{
	fn key() -> TypeKey {
		TypeKey::provider::<T>()
	}

	fn from_resolved(resolved: Option<Instance>) -> DiResult<Self> {
		let key = Self::key();
		let instance = resolved.ok_or_else(|| DiError::not_found(&key))?;
		let handle = downcast::<ProviderHandle>(instance, &key)?;
		Ok(Self {
			handle: (*handle).clone(),
			_marker: PhantomData,
		})
	}
}
