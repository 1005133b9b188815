//! Flattened binding table
//!
//! The table is built once from a [`ModuleGraph`] and is read-only afterwards.
//! Building it is the only place duplicate bindings are detected.

use crate::binding::{Binding, BindingVariant};
use crate::key::TypeKey;
use crate::module::ModuleGraph;
use crate::{DiError, DiResult};
use indexmap::IndexMap;
use indexmap::map::Entry;

/// A binding together with the source id of the module that contributed it
#[derive(Debug, Clone)]
pub struct TableEntry {
	pub binding: Binding,
	pub source: String,
}

#[derive(Debug, Clone, Default)]
pub struct BindingTable {
	entries: IndexMap<TypeKey, TableEntry>,
}

impl BindingTable {
	/// Flatten every module of `graph` into one table.
	///
	/// Modules are processed in walk order. A key contributed twice by the same
	/// module is a [`DiError::DuplicateBinding`]; a key contributed by two
	/// modules is a [`DiError::ConflictingBinding`]. List contributions under
	/// the same key are merged instead, in walk order.
	pub fn flatten(graph: &ModuleGraph) -> DiResult<Self> {
		let mut table = Self::default();
		for module in graph.modules() {
			for binding in module.bindings() {
				table.insert(binding.clone(), module.source())?;
			}
		}
		tracing::debug!(
			modules = graph.len(),
			bindings = table.len(),
			"Built binding table"
		);
		Ok(table)
	}

	fn insert(&mut self, mut binding: Binding, source: &str) -> DiResult<()> {
		let key = binding.key();
		if let Some(elements) = binding.list_elements_mut() {
			for element in elements.iter_mut() {
				element.source.get_or_insert_with(|| source.to_string());
			}
		}
		match self.entries.entry(key) {
			Entry::Vacant(vacant) => {
				vacant.insert(TableEntry {
					binding,
					source: source.to_string(),
				});
				Ok(())
			}
			Entry::Occupied(mut occupied) => {
				let existing = occupied.get_mut();
				let both_lists = existing.binding.variant() == BindingVariant::List
					&& binding.variant() == BindingVariant::List;
				if both_lists {
					if let (Some(merged), Some(added)) = (
						existing.binding.list_elements_mut(),
						binding.list_elements_mut(),
					) {
						merged.append(added);
					}
					existing.binding.refresh_list_description();
					return Ok(());
				}
				if existing.source == source {
					return Err(DiError::DuplicateBinding {
						key: key.to_string(),
						module: source.to_string(),
					});
				}
				Err(DiError::ConflictingBinding {
					key: key.to_string(),
					existing: existing.source.clone(),
					conflicting: source.to_string(),
				})
			}
		}
	}

	pub fn get(&self, key: &TypeKey) -> Option<&TableEntry> {
		self.entries.get(key)
	}

	pub fn contains(&self, key: &TypeKey) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Entries in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&TypeKey, &TableEntry)> {
		self.entries.iter()
	}

	/// Module sources that contributed at least one binding, deduplicated.
	pub fn sources(&self) -> Vec<&str> {
		let mut sources: Vec<&str> = Vec::new();
		for entry in self.entries.values() {
			if !sources.contains(&entry.source.as_str()) {
				sources.push(&entry.source);
			}
		}
		sources
	}
}
