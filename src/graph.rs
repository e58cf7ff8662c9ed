// Module dependency graph
//
//  Copyright (C) 2014-2022 Ryan Specialty Group, LLC.
//
//  This file is part of SYMVIS.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Directed acyclic graph of [`ModuleDescriptor`]s.
//!
//! Graph construction happens in two phases:
//!
//!   1. Modules are declared on a [`DepGraphBuilder`] using
//!        [`DepGraphBuilder::add_module`].
//!      Dependencies may refer to modules that have not yet been declared.
//!   2. [`DepGraphBuilder::resolve_dependencies`] consumes the builder,
//!        verifies that every dependency names a declared module and that
//!        no module transitively depends on itself,
//!        and produces a [`DepGraph`].
//!
//! A [`DepGraph`] is read-only.
//! Since the builder is consumed,
//!   construction can never be interleaved with queries,
//!   and any number of threads may query a [`DepGraph`] at once.
//!
//! Edges point from a module to each of its dependencies.

use crate::{global, module::ModuleDescriptor};
use fixedbitset::FixedBitSet;
use fxhash::FxHashMap;
use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::{Dfs, Reversed},
    Direction,
};
use std::{
    error::Error,
    fmt::{self, Display},
};

mod topo;

pub use topo::TopoOrder;

/// Index size for graph nodes and edges.
type Ix = global::ModIdentSize;

/// A [`Result`] with a hard-coded [`GraphError`] error type.
pub type GraphResult<T> = Result<T, GraphError>;

/// Accumulates module declarations prior to dependency resolution.
///
/// See the [module-level documentation](self) for more information.
#[derive(Debug, Default)]
pub struct DepGraphBuilder {
    /// Declared modules in declaration order.
    modules: Vec<ModuleDescriptor>,

    /// Map of module name to its position in [`Self::modules`].
    index: FxHashMap<String, usize>,
}

impl DepGraphBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Create a builder able to hold `modules` declarations without
    ///   reallocating.
    pub fn with_capacity(modules: usize) -> Self {
        Self {
            modules: Vec::with_capacity(modules),
            index: FxHashMap::with_capacity_and_hasher(
                modules,
                Default::default(),
            ),
        }
    }

    /// Declare a module.
    ///
    /// Fails with [`GraphError::DuplicateModule`] if a module of the same
    ///   name has already been declared;
    ///     the builder is left unchanged in that case.
    pub fn add_module(&mut self, descriptor: ModuleDescriptor) -> GraphResult<()> {
        if self.index.contains_key(descriptor.name()) {
            return Err(GraphError::DuplicateModule(descriptor.name().into()));
        }

        self.index
            .insert(descriptor.name().into(), self.modules.len());
        self.modules.push(descriptor);

        Ok(())
    }

    /// Number of modules declared thus far.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Resolve every dependency edge and verify that the graph is
    ///   acyclic.
    ///
    /// Errors
    /// ======
    /// - [`GraphError::UnknownDependency`] if an edge names a module that
    ///     was never declared;
    ///       this is checked for every module in declaration order before
    ///       any cycle check.
    /// - [`GraphError::CyclicDependency`] with every cycle in the graph,
    ///     including a module that depends directly on itself.
    pub fn resolve_dependencies(self) -> GraphResult<DepGraph> {
        let Self { modules, index: _ } = self;

        let edge_count: usize =
            modules.iter().map(|m| m.dependencies().len()).sum();

        let mut graph: DiGraph<ModuleDescriptor, (), Ix> =
            DiGraph::with_capacity(modules.len(), edge_count);
        let mut index: FxHashMap<String, NodeIndex<Ix>> =
            FxHashMap::with_capacity_and_hasher(
                modules.len(),
                Default::default(),
            );

        for module in modules {
            let name = module.name().to_string();
            let node = graph.add_node(module);

            index.insert(name, node);
        }

        let mut edges = Vec::with_capacity(edge_count);

        for node in graph.node_indices() {
            let module: &ModuleDescriptor = &graph[node];

            for dep in module.dependencies() {
                match index.get(dep) {
                    Some(&depi) => edges.push((node, depi)),
                    None => {
                        return Err(GraphError::UnknownDependency {
                            module: module.name().into(),
                            dependency: dep.clone(),
                        })
                    }
                }
            }
        }

        for (from, to) in edges {
            graph.add_edge(from, to, ());
        }

        let depgraph = DepGraph { graph, index };
        depgraph.check_cycles()?;

        Ok(depgraph)
    }
}

/// Resolved, acyclic dependency graph.
///
/// This implementation is currently based on [`petgraph`].
/// Modules are indexed by name for `O(1)` lookup.
#[derive(Debug)]
pub struct DepGraph {
    graph: DiGraph<ModuleDescriptor, (), Ix>,
    index: FxHashMap<String, NodeIndex<Ix>>,
}

impl DepGraph {
    /// Look up a module by name.
    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.index.get(name).map(|&node| &self.graph[node])
    }

    /// Look up a module by name,
    ///   failing with [`GraphError::UnknownModule`] if it does not exist.
    pub fn lookup(&self, name: &str) -> GraphResult<&ModuleDescriptor> {
        self.get(name)
            .ok_or_else(|| GraphError::UnknownModule(name.into()))
    }

    /// Every module in declaration order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.graph.raw_nodes().iter().map(|node| &node.weight)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Whether `name` depends on `dep`,
    ///   directly or indirectly.
    pub fn depends_on(&self, name: &str, dep: &str) -> GraphResult<bool> {
        let from = self.node(name)?;
        let to = self.node(dep)?;

        Ok(from != to
            && self
                .reachable(from, Direction::Outgoing)
                .contains(to.index()))
    }

    /// Every module that depends on `name`,
    ///   directly or indirectly,
    ///   in declaration order.
    ///
    /// This is the set of consumer contexts that must receive a
    ///   visibility decision for `name`.
    pub fn transitive_dependents(
        &self,
        name: &str,
    ) -> GraphResult<Vec<&ModuleDescriptor>> {
        let node = self.node(name)?;

        Ok(self.collect_set(self.reachable(node, Direction::Incoming), node))
    }

    /// Every module that `name` depends on,
    ///   directly or indirectly,
    ///   in declaration order.
    pub fn transitive_dependencies(
        &self,
        name: &str,
    ) -> GraphResult<Vec<&ModuleDescriptor>> {
        let node = self.node(name)?;

        Ok(self.collect_set(self.reachable(node, Direction::Outgoing), node))
    }

    /// Lazily produce every module such that each appears after all of the
    ///   modules it depends on.
    ///
    /// The ordering is deterministic for a given graph:
    ///   roots are considered in declaration order and dependencies in the
    ///   order they were declared on each module.
    /// This ordering exists for deterministic output and has no bearing
    ///   on resolution.
    pub fn topological_order(&self) -> TopoOrder {
        TopoOrder::new(self)
    }

    fn node(&self, name: &str) -> GraphResult<NodeIndex<Ix>> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownModule(name.into()))
    }

    /// Set of nodes reachable from `start` following edges in `dir`,
    ///   including `start` itself.
    fn reachable(&self, start: NodeIndex<Ix>, dir: Direction) -> FixedBitSet {
        let mut set = FixedBitSet::with_capacity(self.graph.node_count());

        match dir {
            Direction::Outgoing => {
                let mut dfs = Dfs::new(&self.graph, start);
                while let Some(node) = dfs.next(&self.graph) {
                    set.insert(node.index());
                }
            }
            Direction::Incoming => {
                let rev = Reversed(&self.graph);
                let mut dfs = Dfs::new(rev, start);
                while let Some(node) = dfs.next(rev) {
                    set.insert(node.index());
                }
            }
        }

        set
    }

    fn collect_set(
        &self,
        set: FixedBitSet,
        exclude: NodeIndex<Ix>,
    ) -> Vec<&ModuleDescriptor> {
        set.ones()
            .filter(|&i| i != exclude.index())
            .map(|i| &self.graph[NodeIndex::new(i)])
            .collect()
    }

    /// Check graph for cycles.
    ///
    /// Every strongly connected component with more than one node
    ///   contains a cycle,
    ///     as does a single node with an edge to itself.
    /// One cycle is reported per component,
    ///   beginning with its earliest-declared module and following
    ///   dependency edges from there;
    ///     see [`Self::cycle_path`].
    fn check_cycles(&self) -> GraphResult<()> {
        let mut cycles: Vec<Vec<String>> =
            petgraph::algo::tarjan_scc(&self.graph)
                .into_iter()
                .filter(|scc| {
                    scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0])
                })
                .map(|scc| {
                    self.cycle_path(&scc)
                        .into_iter()
                        .map(|node| self.graph[node].name().to_string())
                        .collect()
                })
                .collect();

        if cycles.is_empty() {
            return Ok(());
        }

        cycles.sort_by_key(|cycle| {
            cycle
                .first()
                .and_then(|name| self.index.get(name))
                .map(|node| node.index())
        });

        Err(GraphError::CyclicDependency(cycles))
    }

    /// A cycle through the earliest-declared node of `scc`,
    ///   in dependency order.
    ///
    /// Dependencies are tried in the order they were declared on each
    ///   module,
    ///     so the path is deterministic.
    /// The path does not repeat its first node at the end.
    fn cycle_path(&self, scc: &[NodeIndex<Ix>]) -> Vec<NodeIndex<Ix>> {
        let mut members = FixedBitSet::with_capacity(self.graph.node_count());
        scc.iter().for_each(|node| members.insert(node.index()));

        let start = match scc.iter().min() {
            Some(&start) => start,
            None => return vec![],
        };

        let mut seen = FixedBitSet::with_capacity(self.graph.node_count());
        seen.insert(start.index());

        let mut path = Vec::with_capacity(scc.len());
        self.walk_cycle(start, start, &members, &mut seen, &mut path);

        path
    }

    /// Depth-first search within `members` for an edge back to `start`,
    ///   leaving the nodes of the path found in `path`.
    fn walk_cycle(
        &self,
        node: NodeIndex<Ix>,
        start: NodeIndex<Ix>,
        members: &FixedBitSet,
        seen: &mut FixedBitSet,
        path: &mut Vec<NodeIndex<Ix>>,
    ) -> bool {
        path.push(node);

        let deps = self.graph[node]
            .dependencies()
            .iter()
            .filter_map(|dep| self.index.get(dep).copied())
            .filter(|dep| members.contains(dep.index()));

        for dep in deps {
            if dep == start {
                return true;
            }

            if !seen.put(dep.index())
                && self.walk_cycle(dep, start, members, seen, path)
            {
                return true;
            }
        }

        path.pop();
        false
    }
}

/// Error during graph construction or lookup.
///
/// Construction errors are fatal:
///   the build cannot proceed and nothing may be emitted.
#[derive(Debug, PartialEq, Eq)]
pub enum GraphError {
    /// A module of this name was already declared.
    DuplicateModule(String),

    /// A module names a dependency that was never declared.
    UnknownDependency { module: String, dependency: String },

    /// One or more modules transitively depend on themselves.
    ///
    /// Each inner vector holds the modules of one cycle in dependency
    ///   order,
    ///     each depending on the next and the last on the first.
    CyclicDependency(Vec<Vec<String>>),

    /// A query named a module that is not in the graph.
    UnknownModule(String),
}

impl Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use GraphError::*;

        match self {
            DuplicateModule(name) => {
                write!(f, "module `{}` is already defined", name)
            }
            UnknownDependency { module, dependency } => write!(
                f,
                "module `{}` depends on undefined module `{}`",
                module, dependency,
            ),
            CyclicDependency(cycles) => {
                write!(f, "cyclic dependencies")?;

                for cycle in cycles {
                    let mut path = cycle.clone();
                    if let Some(first) = cycle.first() {
                        path.push(first.clone());
                    }

                    write!(f, "\n  cycle: {}", path.join(" -> "))?;
                }

                Ok(())
            }
            UnknownModule(name) => write!(f, "unknown module `{}`", name),
        }
    }
}

impl Error for GraphError {}

#[cfg(test)]
mod test;
