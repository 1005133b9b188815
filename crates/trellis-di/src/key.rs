//! Type keys
//!
//! A [`TypeKey`] is the only thing bindings are addressed by. It combines the
//! [`TypeId`] of the produced value type with an optional flag and a
//! [`Classifier`] describing how the key is meant to be resolved.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// How a key is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classifier {
	/// A plain value looked up in the binding table
	Type,
	/// A deferred handle that resolves the plain key on demand
	Provider,
	/// Every list element contributed for the type
	List,
	/// A process-wide static living outside the container
	Global,
}

/// Structural descriptor of a requested type.
///
/// Two keys are equal when they address the same type with the same
/// optionality and classifier. An optional key never matches a binding made
/// for the required key of the same type.
///
/// # Examples
///
/// ```
/// use trellis_di::TypeKey;
///
/// struct Count(u32);
///
/// assert_eq!(TypeKey::of::<Count>(), TypeKey::of::<Count>());
/// assert_ne!(TypeKey::of::<Count>(), TypeKey::optional::<Count>());
/// assert!(TypeKey::optional::<Count>().is_optional());
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
	type_id: TypeId,
	type_name: &'static str,
	optional: bool,
	classifier: Classifier,
}

impl TypeKey {
	fn new<T: ?Sized + 'static>(optional: bool, classifier: Classifier) -> Self {
		Self {
			type_id: TypeId::of::<T>(),
			type_name: std::any::type_name::<T>(),
			optional,
			classifier,
		}
	}

	/// Key of a required value of type `T`.
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self::new::<T>(false, Classifier::Type)
	}

	/// Key of an optional value of type `T`; resolves to nothing when unbound.
	pub fn optional<T: ?Sized + 'static>() -> Self {
		Self::new::<T>(true, Classifier::Type)
	}

	/// Key of a deferred provider for `T`.
	pub fn provider<T: ?Sized + 'static>() -> Self {
		Self::new::<T>(false, Classifier::Provider)
	}

	/// Key of the multibinding collecting every list element of `T`.
	pub fn list<T: ?Sized + 'static>() -> Self {
		Self::new::<T>(false, Classifier::List)
	}

	/// Key of a global `&'static T`, which the container refuses to resolve.
	pub fn global<T: ?Sized + 'static>() -> Self {
		Self::new::<T>(false, Classifier::Global)
	}

	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	pub fn is_optional(&self) -> bool {
		self.optional
	}

	pub fn classifier(&self) -> Classifier {
		self.classifier
	}

	/// The plain required key addressing the same type.
	///
	/// For a provider key this is the key the provider resolves.
	pub fn required(&self) -> Self {
		Self {
			optional: false,
			classifier: Classifier::Type,
			..*self
		}
	}

	/// The list key collecting elements of the same type.
	pub fn as_list(&self) -> Self {
		Self {
			optional: false,
			classifier: Classifier::List,
			..*self
		}
	}
}

impl PartialEq for TypeKey {
	fn eq(&self, other: &Self) -> bool {
		self.type_id == other.type_id
			&& self.optional == other.optional
			&& self.classifier == other.classifier
	}
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.type_id.hash(state);
		self.optional.hash(state);
		self.classifier.hash(state);
	}
}

impl fmt::Display for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.classifier {
			Classifier::Type => f.write_str(self.type_name)?,
			Classifier::Provider => write!(f, "Provider<{}>", self.type_name)?,
			Classifier::List => write!(f, "Vec<{}>", self.type_name)?,
			Classifier::Global => write!(f, "&'static {}", self.type_name)?,
		}
		if self.optional {
			f.write_str("?")?;
		}
		Ok(())
	}
}

impl fmt::Debug for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TypeKey({})", self)
	}
}
