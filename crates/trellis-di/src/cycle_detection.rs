//! Circular dependency detection
//!
//! Each resolution call carries its own [`ResolutionStack`]: an O(1)
//! membership set of the keys currently being resolved, plus the ordered path
//! used to render the chain when a key is re-entered.

use crate::key::TypeKey;
use crate::table::BindingTable;
use crate::DiError;
use std::collections::HashSet;
use std::fmt::Write;

#[derive(Debug, Default)]
pub(crate) struct ResolutionStack {
	/// Keys currently being resolved (O(1) circular detection)
	in_progress: HashSet<TypeKey>,
	/// Resolution path, outermost first
	path: Vec<TypeKey>,
}

impl ResolutionStack {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Fail with [`DiError::CircularDependency`] if `key` is already being
	/// resolved on this path.
	pub(crate) fn check(&self, key: &TypeKey, table: &BindingTable) -> Result<(), DiError> {
		if !self.in_progress.contains(key) {
			return Ok(());
		}
		Err(DiError::CircularDependency {
			key: key.to_string(),
			path: self.cycle_path(key),
			graph: render_graph(key, &self.path, table),
		})
	}

	/// Record the start of resolution of `key`.
	pub(crate) fn enter(&mut self, key: TypeKey) {
		self.in_progress.insert(key);
		self.path.push(key);
	}

	/// Remove `key` once its value has been produced (or its resolution failed).
	pub(crate) fn exit(&mut self, key: &TypeKey) {
		self.in_progress.remove(key);
		if let Some(pos) = self.path.iter().rposition(|k| k == key) {
			self.path.remove(pos);
		}
	}

	pub(crate) fn depth(&self) -> usize {
		self.path.len()
	}

	/// Cycle in resolution order (format: A -> B -> A)
	fn cycle_path(&self, key: &TypeKey) -> String {
		let start = self.path.iter().position(|k| k == key).unwrap_or(0);
		let mut names: Vec<String> = self.path[start..].iter().map(ToString::to_string).collect();
		names.push(key.to_string());
		names.join(" -> ")
	}
}

/// Render the whole resolution chain, one key per line, indented by depth.
///
/// Each line names the binding backing the key, and the entry the cycle closes
/// on is marked. The re-entered key is printed last.
pub(crate) fn render_graph(key: &TypeKey, path: &[TypeKey], table: &BindingTable) -> String {
	let mut out = String::from("\n");
	for (idx, entry) in path.iter().enumerate() {
		out.push_str(&" ".repeat(idx * 2));
		let _ = write!(out, "{}", entry);
		if let Some(found) = table.get(entry) {
			let _ = write!(out, " implemented by {}", found.binding.description());
		}
		if entry == key {
			out.push_str(" <-- Circular dependency starts here");
		}
		out.push('\n');
	}
	out.push_str(&" ".repeat(path.len() * 2));
	let _ = write!(out, "{}", key);
	if let Some(found) = table.get(key) {
		let _ = write!(out, " implemented by {}", found.binding.description());
	}
	out
}
