//! Dependency graph visualization for development and debugging
//!
//! [`DependencyGraph`] is a static view of a binding table: one node per
//! bound key, one edge per declared dependency. It can be exported to DOT
//! (rendered with Graphviz) and checked for cycles without resolving anything.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use trellis_di::{Binder, Context, DiResult, ModuleHandle};
//!
//! struct Database;
//! struct UserService;
//!
//! let module = ModuleHandle::new("docs::services", |binder| {
//!     binder.instance(Database);
//!     binder.provide(|_db: Arc<Database>| async move { DiResult::Ok(UserService) });
//! });
//! let graph = Context::build(&module).unwrap().dependency_graph();
//!
//! let dot = graph.to_dot();
//! assert!(dot.contains("digraph"));
//! assert!(dot.contains("UserService"));
//! assert!(graph.detect_cycles().is_empty());
//! ```

use crate::binding::BindingVariant;
use crate::table::BindingTable;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Represents a node in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
	/// Rendered key
	pub name: String,
	/// Variant of the backing binding, `None` for keys nothing binds
	pub variant: Option<BindingVariant>,
	/// Module that contributed the binding
	pub source: Option<String>,
}

/// Dependency graph for visualization
#[derive(Debug, Default)]
pub struct DependencyGraph {
	nodes: IndexMap<String, GraphNode>,
	edges: Vec<(String, String)>,
}

impl DependencyGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Build the graph of every binding in `table`.
	pub fn from_table(table: &BindingTable) -> Self {
		let mut graph = Self::new();
		for (key, entry) in table.iter() {
			graph.nodes.insert(
				key.to_string(),
				GraphNode {
					name: key.to_string(),
					variant: Some(entry.binding.variant()),
					source: Some(entry.source.clone()),
				},
			);
		}
		for (key, entry) in table.iter() {
			for dependency in entry.binding.dependencies() {
				let name = dependency.to_string();
				graph.nodes.entry(name.clone()).or_insert_with(|| GraphNode {
					name: name.clone(),
					variant: None,
					source: None,
				});
				graph.add_dependency(key.to_string(), name);
			}
		}
		graph
	}

	pub fn add_node(&mut self, node: GraphNode) {
		self.nodes.insert(node.name.clone(), node);
	}

	/// Add a dependency edge from `from` to `to`
	pub fn add_dependency(&mut self, from: impl Into<String>, to: impl Into<String>) {
		self.edges.push((from.into(), to.into()));
	}

	pub fn node(&self, name: &str) -> Option<&GraphNode> {
		self.nodes.get(name)
	}

	pub fn edges(&self) -> &[(String, String)] {
		&self.edges
	}

	/// Generate DOT format output for Graphviz
	pub fn to_dot(&self) -> String {
		let mut output = String::from("digraph DependencyGraph {\n");
		output.push_str("  rankdir=LR;\n");
		output.push_str("  node [shape=box, style=rounded];\n\n");

		for node in self.nodes.values() {
			let color = match node.variant {
				Some(BindingVariant::Instance) => "lightblue",
				Some(BindingVariant::Factory) | Some(BindingVariant::Constructor) => "lightgreen",
				Some(BindingVariant::List) | Some(BindingVariant::Alias) => "lightyellow",
				None => "lightcoral",
			};

			let label = match (&node.variant, &node.source) {
				(Some(variant), Some(source)) => {
					format!("{}\\n({} in {})", node.name, variant, source)
				}
				_ => format!("{}\\n(unbound)", node.name),
			};

			output.push_str(&format!(
				"  \"{}\" [label=\"{}\", fillcolor={}, style=filled];\n",
				node.name, label, color
			));
		}

		output.push('\n');

		for (from, to) in &self.edges {
			output.push_str(&format!("  \"{}\" -> \"{}\";\n", from, to));
		}

		output.push_str("}\n");
		output
	}

	/// Detect circular dependencies in the graph
	///
	/// Returns each cycle found as the list of node names on it.
	pub fn detect_cycles(&self) -> Vec<Vec<String>> {
		let mut cycles = Vec::new();
		let mut visited = HashSet::new();
		let mut rec_stack = HashSet::new();

		for node_name in self.nodes.keys() {
			if !visited.contains(node_name) {
				let mut path = Vec::new();
				self.dfs_detect_cycles(
					node_name,
					&mut visited,
					&mut rec_stack,
					&mut path,
					&mut cycles,
				);
			}
		}

		cycles
	}

	fn dfs_detect_cycles(
		&self,
		node: &str,
		visited: &mut HashSet<String>,
		rec_stack: &mut HashSet<String>,
		path: &mut Vec<String>,
		cycles: &mut Vec<Vec<String>>,
	) {
		visited.insert(node.to_string());
		rec_stack.insert(node.to_string());
		path.push(node.to_string());

		let dependencies: Vec<_> = self
			.edges
			.iter()
			.filter_map(|(from, to)| if from == node { Some(to.as_str()) } else { None })
			.collect();

		for dep in dependencies {
			if !visited.contains(dep) {
				self.dfs_detect_cycles(dep, visited, rec_stack, path, cycles);
			} else if rec_stack.contains(dep) {
				if let Some(cycle_start) = path.iter().position(|p| p == dep) {
					cycles.push(path[cycle_start..].to_vec());
				}
			}
		}

		path.pop();
		rec_stack.remove(node);
	}

	/// Get statistics about the dependency graph
	pub fn statistics(&self) -> GraphStatistics {
		let count = |variant: BindingVariant| {
			self.nodes
				.values()
				.filter(|n| n.variant == Some(variant))
				.count()
		};

		GraphStatistics {
			node_count: self.nodes.len(),
			edge_count: self.edges.len(),
			instance_count: count(BindingVariant::Instance),
			factory_count: count(BindingVariant::Factory),
			constructor_count: count(BindingVariant::Constructor),
			list_count: count(BindingVariant::List),
			alias_count: count(BindingVariant::Alias),
			unbound_count: self.nodes.values().filter(|n| n.variant.is_none()).count(),
		}
	}
}

/// Statistics about a dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStatistics {
	/// Total number of nodes
	pub node_count: usize,
	/// Total number of edges
	pub edge_count: usize,
	pub instance_count: usize,
	pub factory_count: usize,
	pub constructor_count: usize,
	pub list_count: usize,
	pub alias_count: usize,
	/// Dependencies no module binds
	pub unbound_count: usize,
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::module::{Binder, ModuleGraph, ModuleHandle};
	use crate::DiResult;
	use rstest::rstest;
	use std::sync::Arc;

	struct A;
	struct B;
	struct Missing;

	fn table(builder: impl Fn(&mut crate::module::ModuleBinder) + Send + Sync + 'static) -> BindingTable {
		let root = ModuleHandle::new("test::GRAPH", builder);
		BindingTable::flatten(&ModuleGraph::walk(&root)).unwrap()
	}

	#[rstest]
	fn two_node_cycle_is_detected() {
		// Arrange
		let table = table(|binder| {
			binder.provide(|_b: Arc<B>| async move { DiResult::Ok(A) });
			binder.provide(|_a: Arc<A>| async move { DiResult::Ok(B) });
		});

		// Act
		let cycles = DependencyGraph::from_table(&table).detect_cycles();

		// Assert
		assert_eq!(cycles.len(), 1);
		assert_eq!(cycles[0].len(), 2);
	}

	#[rstest]
	fn unbound_dependencies_become_nodes() {
		let table = table(|binder| {
			binder.provide(|_m: Option<Arc<Missing>>| async move { DiResult::Ok(A) });
		});

		let graph = DependencyGraph::from_table(&table);

		let stats = graph.statistics();
		assert_eq!(stats.node_count, 2);
		assert_eq!(stats.constructor_count, 1);
		assert_eq!(stats.unbound_count, 1);
		assert!(graph.to_dot().contains("(unbound)"));
	}

	#[rstest]
	fn statistics_count_variants() {
		let table = table(|binder| {
			binder.instance(A);
			binder.factory(|| async { DiResult::Ok(B) });
		});

		let stats = DependencyGraph::from_table(&table).statistics();

		assert_eq!(stats.instance_count, 1);
		assert_eq!(stats.factory_count, 1);
		assert_eq!(stats.edge_count, 0);
	}
}
