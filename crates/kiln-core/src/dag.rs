//! DAG building and topological sorting over models and functions

use crate::error::{CoreError, CoreResult};
use crate::function_name::FunctionName;
use crate::model_name::ModelName;
use crate::registry::ProjectContext;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// A node of the project graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DagNode {
    /// A model, by table name
    Model(ModelName),
    /// A function, by qualified name (all overloads share one node)
    Function(FunctionName),
}

impl DagNode {
    pub fn name(&self) -> &str {
        match self {
            DagNode::Model(name) => name.as_str(),
            DagNode::Function(name) => name.as_str(),
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, DagNode::Function(_))
    }
}

impl fmt::Display for DagNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DagNode::Model(name) => write!(f, "{}", name),
            DagNode::Function(name) => write!(f, "{}()", name),
        }
    }
}

impl Ord for DagNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name()
            .cmp(other.name())
            .then_with(|| self.is_function().cmp(&other.is_function()))
    }
}

impl PartialOrd for DagNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A directed acyclic graph of project dependencies
///
/// Edges run from a dependency to its dependent, so a topological sort yields
/// dependencies first.
#[derive(Debug, Default)]
pub struct ProjectDag {
    graph: DiGraph<DagNode, ()>,
    node_map: HashMap<DagNode, NodeIndex>,
}

impl ProjectDag {
    /// Create a new empty DAG
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning the existing index when already present
    pub fn add_node(&mut self, node: DagNode) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&node) {
            return idx;
        }
        let idx = self.graph.add_node(node.clone());
        self.node_map.insert(node, idx);
        idx
    }

    /// Add a dependency edge (`dependent` depends on `dependency`)
    pub fn add_dependency(&mut self, dependent: &DagNode, dependency: &DagNode) {
        if dependent == dependency {
            log::debug!("Ignoring self-reference of {}", dependent);
            return;
        }
        let from = self.add_node(dependency.clone());
        let to = self.add_node(dependent.clone());
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Build the graph of every registered model and function.
    ///
    /// References are matched against the registries exactly, then by
    /// unqualified name; references to unknown objects are external and add
    /// no edge. Fails on a cycle.
    pub fn build(ctx: &ProjectContext) -> CoreResult<Self> {
        let mut dag = Self::new();

        for model in ctx.models.values() {
            dag.add_node(DagNode::Model(model.name().clone()));
        }
        for function in ctx.functions.values() {
            dag.add_node(DagNode::Function(function.qualified_name()));
        }

        for model in ctx.models.values() {
            let node = DagNode::Model(model.name().clone());
            dag.link(ctx, &node, model.source_tables(), model.source_functions());
        }
        for function in ctx.functions.values() {
            let node = DagNode::Function(function.qualified_name());
            dag.link(
                ctx,
                &node,
                function.source_tables(),
                function.source_functions(),
            );
        }

        dag.validate()?;

        Ok(dag)
    }

    fn link<'a>(
        &mut self,
        ctx: &ProjectContext,
        node: &DagNode,
        tables: impl Iterator<Item = &'a str>,
        functions: impl Iterator<Item = &'a str>,
    ) {
        for table in tables {
            let targets = ctx.models.find(table);
            if targets.is_empty() {
                log::debug!("{} reads external table '{}'", node, table);
            }
            for target in targets {
                self.add_dependency(node, &DagNode::Model(target.name().clone()));
            }
        }
        for function in functions {
            for target in ctx.functions.overloads(function) {
                self.add_dependency(node, &DagNode::Function(target.qualified_name()));
            }
        }
    }

    /// Validate the DAG has no cycles
    pub fn validate(&self) -> CoreResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(CoreError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Walk from a node known to sit on a cycle back to itself for error reporting
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        // DFS for a path leading back to `start`
        let mut stack = vec![(start, vec![start])];
        let mut visited = HashSet::new();
        while let Some((current, path)) = stack.pop() {
            for edge in self.graph.edges(current) {
                let target = edge.target();
                if target == start {
                    let mut names: Vec<String> =
                        path.iter().map(|i| self.graph[*i].to_string()).collect();
                    names.push(self.graph[start].to_string());
                    return names.join(" -> ");
                }
                if visited.insert(target) {
                    let mut next = path.clone();
                    next.push(target);
                    stack.push((target, next));
                }
            }
        }
        self.graph[start].to_string()
    }

    /// Nodes in execution order (dependencies first).
    ///
    /// Kahn's algorithm with a name-ordered ready set, so the order is the
    /// same for the same graph regardless of insertion order.
    pub fn execution_order(&self) -> CoreResult<Vec<DagNode>> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                let degree = self.graph.edges_directed(idx, Direction::Incoming).count();
                (idx, degree)
            })
            .collect();

        let mut ready: BTreeSet<(DagNode, NodeIndex)> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| (self.graph[*idx].clone(), *idx))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some((node, idx)) = ready.pop_first() {
            order.push(node);
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                let target = edge.target();
                if let Some(degree) = in_degree.get_mut(&target) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert((self.graph[target].clone(), target));
                    }
                }
            }
        }

        if order.len() != self.graph.node_count() {
            let stuck = in_degree
                .iter()
                .filter(|(_, degree)| **degree > 0)
                .map(|(idx, _)| *idx)
                .min_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
            let cycle = stuck
                .map(|idx| self.find_cycle_path(idx))
                .unwrap_or_default();
            return Err(CoreError::CircularDependency { cycle });
        }

        Ok(order)
    }

    /// Get direct dependencies of a node
    pub fn dependencies(&self, node: &DagNode) -> Vec<DagNode> {
        self.neighbors(node, Direction::Incoming)
    }

    /// Get direct dependents of a node
    pub fn dependents(&self, node: &DagNode) -> Vec<DagNode> {
        self.neighbors(node, Direction::Outgoing)
    }

    /// Get all ancestors (transitive dependencies) of a node
    pub fn ancestors(&self, node: &DagNode) -> Vec<DagNode> {
        self.collect_reachable(node, Direction::Incoming)
    }

    /// Get all descendants (transitive dependents) of a node
    pub fn descendants(&self, node: &DagNode) -> Vec<DagNode> {
        self.collect_reachable(node, Direction::Outgoing)
    }

    fn neighbors(&self, node: &DagNode, direction: Direction) -> Vec<DagNode> {
        let Some(&idx) = self.node_map.get(node) else {
            return Vec::new();
        };
        let found: BTreeSet<DagNode> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        found.into_iter().collect()
    }

    /// Collect all nodes reachable from `node` by following edges in `direction`.
    fn collect_reachable(&self, node: &DagNode, direction: Direction) -> Vec<DagNode> {
        let Some(&start) = self.node_map.get(node) else {
            return Vec::new();
        };
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        let mut result = BTreeSet::new();
        while let Some(current) = stack.pop() {
            for neighbor in self.graph.neighbors_directed(current, direction) {
                if visited.insert(neighbor) {
                    result.insert(self.graph[neighbor].clone());
                    stack.push(neighbor);
                }
            }
        }
        result.into_iter().collect()
    }

    /// All nodes in the DAG, name-ordered
    pub fn nodes(&self) -> Vec<DagNode> {
        let mut nodes: Vec<DagNode> = self.node_map.keys().cloned().collect();
        nodes.sort();
        nodes
    }

    /// Check if a node exists in the DAG
    pub fn contains(&self, node: &DagNode) -> bool {
        self.node_map.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
