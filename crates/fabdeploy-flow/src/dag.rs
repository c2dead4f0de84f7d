//! Small dependency graph with deterministic topological order.
//!
//! Among nodes whose predecessors are all done, the one inserted first is
//! emitted first, so a graph built in execution order sorts back to that
//! order.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;
use std::hash::Hash;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::{Error, Result};

/// Directed graph of `T` values; an edge `a -> b` means `a` runs before `b`.
#[derive(Debug, Clone)]
pub struct Dag<T>
where
    T: Clone + Eq + Hash + Display,
{
    graph: DiGraph<T, ()>,
    index: HashMap<T, NodeIndex>,
}

impl<T> Dag<T>
where
    T: Clone + Eq + Hash + Display,
{
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns true if `value` is a node.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.index.contains_key(value)
    }

    /// Adds a node, or returns the existing one.
    pub fn add_node(&mut self, value: T) -> NodeIndex {
        if let Some(&idx) = self.index.get(&value) {
            return idx;
        }
        let idx = self.graph.add_node(value.clone());
        self.index.insert(value, idx);
        idx
    }

    /// Adds an edge `from -> to`. Duplicate edges are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if either index is not a node of this graph.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) -> Result<()> {
        for idx in [from, to] {
            if self.graph.node_weight(idx).is_none() {
                return Err(Error::DagNodeNotFound {
                    node: format!("index {}", idx.index()),
                });
            }
        }
        self.graph.update_edge(from, to, ());
        Ok(())
    }

    /// Returns the direct predecessors of `value`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not a node.
    pub fn upstream(&self, value: &T) -> Result<Vec<T>> {
        let idx = self
            .index
            .get(value)
            .copied()
            .ok_or_else(|| Error::DagNodeNotFound {
                node: value.to_string(),
            })?;
        let mut preds: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect();
        preds.sort_unstable();
        Ok(preds
            .into_iter()
            .filter_map(|p| self.graph.node_weight(p).cloned())
            .collect())
    }

    /// Returns every node in dependency order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] if the graph has a cycle.
    pub fn toposort(&self) -> Result<Vec<T>> {
        // Node indices are dense and assigned in insertion order.
        let mut remaining: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .count()
            })
            .collect();
        let mut ready: BTreeSet<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, deg)| **deg == 0)
            .map(|(pos, _)| pos)
            .collect();

        let mut order = Vec::with_capacity(remaining.len());
        while let Some(pos) = ready.pop_first() {
            let idx = NodeIndex::new(pos);
            if let Some(value) = self.graph.node_weight(idx) {
                order.push(value.clone());
            }
            for next in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(deg) = remaining.get_mut(next.index()) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        ready.insert(next.index());
                    }
                }
            }
        }

        if order.len() != remaining.len() {
            let cycle = self
                .graph
                .node_indices()
                .filter(|idx| remaining.get(idx.index()).is_some_and(|deg| *deg > 0))
                .filter_map(|idx| self.graph.node_weight(idx).map(ToString::to_string))
                .collect();
            return Err(Error::CycleDetected { cycle });
        }
        Ok(order)
    }
}

impl<T> Default for Dag<T>
where
    T: Clone + Eq + Hash + Display,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn independent_nodes_keep_insertion_order() {
        let mut dag: Dag<&str> = Dag::new();
        dag.add_node("capacities");
        dag.add_node("lakehouse");
        dag.add_node("workspace");
        assert_eq!(
            dag.toposort().unwrap(),
            vec!["capacities", "lakehouse", "workspace"]
        );
    }

    #[test]
    fn edges_override_insertion_order() {
        let mut dag: Dag<&str> = Dag::new();
        let report = dag.add_node("report");
        let model = dag.add_node("model");
        let workspace = dag.add_node("workspace");
        dag.add_edge(workspace, model).unwrap();
        dag.add_edge(model, report).unwrap();
        assert_eq!(dag.toposort().unwrap(), vec!["workspace", "model", "report"]);
        assert_eq!(dag.upstream(&"report").unwrap(), vec!["model"]);
    }

    #[test]
    fn cycle_is_reported() {
        let mut dag: Dag<&str> = Dag::new();
        let a = dag.add_node("a");
        let b = dag.add_node("b");
        let c = dag.add_node("c");
        dag.add_edge(a, b).unwrap();
        dag.add_edge(b, c).unwrap();
        dag.add_edge(c, b).unwrap();
        match dag.toposort() {
            Err(Error::CycleDetected { cycle }) => assert_eq!(cycle, vec!["b", "c"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_nodes_and_edges_collapse() {
        let mut dag: Dag<&str> = Dag::new();
        let a = dag.add_node("a");
        let again = dag.add_node("a");
        let b = dag.add_node("b");
        assert_eq!(a, again);
        dag.add_edge(a, b).unwrap();
        dag.add_edge(a, b).unwrap();
        assert_eq!(dag.len(), 2);
        assert_eq!(dag.upstream(&"b").unwrap(), vec!["a"]);
    }
}
