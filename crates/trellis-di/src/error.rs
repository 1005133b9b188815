//! Container errors
//!
//! Every wiring problem surfaces as a [`DiError`]. None of them are retried or
//! downgraded: the container is fail-fast, and the message is meant to be shown
//! verbatim to whoever wired the application.

use crate::key::TypeKey;
use crate::runtime::ConfigError;

/// Result alias used throughout the container.
pub type DiResult<T> = Result<T, DiError>;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DiError {
	/// No binding registered for a required key
	#[error("Required {0} not found in context.")]
	NotFound(String),

	/// A key was requested again while it was still being resolved
	#[error("A circular dependency found: {path}{graph}")]
	CircularDependency {
		/// Key that closes the cycle
		key: String,
		/// Cycle in resolution order (format: A -> B -> A)
		path: String,
		/// Rendered, indented resolution chain
		graph: String,
	},

	/// One module contributed the same key twice
	#[error("Binding [{key}] duplicated in module [{module}].")]
	DuplicateBinding { key: String, module: String },

	/// Two different modules contributed the same key
	#[error("Binding [{key}] already present in module [{existing}]. Conflicting module: [{conflicting}]")]
	ConflictingBinding {
		key: String,
		existing: String,
		conflicting: String,
	},

	/// Globally shared statics are never resolved by the container
	#[error("Global instance {0} is not allowed to be injected. Bind it explicitly instead.")]
	GlobalInstance(String),

	/// A binding variant reached in a position where it has no resolution semantics
	#[error("Binding [{key}] of kind {variant} is not supported here.")]
	UnsupportedBinding { key: String, variant: String },

	/// An erased value did not have the type its key promised
	#[error("Value bound to [{key}] is not a {expected}.")]
	TypeMismatch { key: String, expected: &'static str },

	/// A factory or constructor reported a failure
	#[error("Provider error: {0}")]
	ProviderError(String),

	#[error("Internal error: {message}")]
	Internal { message: String },
}

impl DiError {
	pub(crate) fn not_found(key: &TypeKey) -> Self {
		Self::NotFound(key.to_string())
	}

	pub(crate) fn type_mismatch<T: ?Sized>(key: &TypeKey) -> Self {
		Self::TypeMismatch {
			key: key.to_string(),
			expected: std::any::type_name::<T>(),
		}
	}
}

impl From<ConfigError> for DiError {
	fn from(err: ConfigError) -> Self {
		Self::ProviderError(err.to_string())
	}
}
