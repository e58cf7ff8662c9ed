// Topological ordering of the module dependency graph
//
//  Copyright (C) 2014-2023 Ryan Specialty Group, LLC.
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

//! Topological sort of [`DepGraph`].
//!
//! This topological sort is a depth-first search (DFS) that emits modules
//!   in post-order,
//!     so that every module is emitted after each of its dependencies.
//!
//! The ordering is deterministic between runs on the same graph,
//!   but it is only one of potentially many orderings.
//! Roots are taken in declaration order;
//!   a module not reachable from any previously visited module becomes
//!   the next root once the stack empties.
//!
//! A [`DepGraph`] is acyclic by construction,
//!   so unlike a sort over an arbitrary graph,
//!   this traversal never has to report a cycle.

use super::{DepGraph, Ix};
use crate::module::ModuleDescriptor;
use fixedbitset::FixedBitSet;
use petgraph::graph::NodeIndex;

/// Initial capacity of the [`TopoOrder`] stack.
///
/// The current number is arbitrary and only intended to reduce initial
///   small re-allocations.
const INIT_STACK_CAP: usize = 32;

/// Topological sort implemented as a post-order depth-first search (DFS).
///
/// See the [module-level documentation](self) for more information.
pub struct TopoOrder<'a> {
    depgraph: &'a DepGraph,

    /// DFS stack.
    ///
    /// As modules are visited,
    ///   their dependencies are pushed onto the stack.
    stack: Vec<NodeIndex<Ix>>,

    /// Modules that have already been visited.
    ///
    /// A visited module is only present in [`Self::stack`] until it is
    ///   finished,
    ///     after which it appears in [`Self::finished`].
    visited: FixedBitSet,

    /// Modules that have been emitted and popped from [`Self::stack`].
    finished: FixedBitSet,

    /// Next candidate root in declaration order.
    next_root: usize,
}

impl<'a> TopoOrder<'a> {
    pub(super) fn new(depgraph: &'a DepGraph) -> Self {
        let set_cap = depgraph.graph.node_count();

        Self {
            depgraph,
            stack: Vec::with_capacity(INIT_STACK_CAP),
            visited: FixedBitSet::with_capacity(set_cap),
            finished: FixedBitSet::with_capacity(set_cap),
            next_root: 0,
        }
    }

    /// Push the next module that has not yet been emitted,
    ///   returning `false` if every module has been emitted.
    fn push_root(&mut self) -> bool {
        let count = self.depgraph.graph.node_count();

        while self.next_root < count {
            let i = self.next_root;
            self.next_root += 1;

            if !self.finished.contains(i) {
                self.stack.push(NodeIndex::new(i));
                return true;
            }
        }

        false
    }
}

impl<'a> Iterator for TopoOrder<'a> {
    type Item = &'a ModuleDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        let depgraph: &'a DepGraph = self.depgraph;
        let graph = &depgraph.graph;

        loop {
            let next = match self.stack.last().copied() {
                Some(next) => next,
                None if self.push_root() => continue,
                None => return None,
            };

            if self.visited.put(next.index()) {
                self.stack.pop(); // next

                if !self.finished.put(next.index()) {
                    break Some(&graph[next]);
                } else {
                    // Must have been reached by another path.
                    continue;
                }
            }

            // Neighbors are produced in reverse order of declaration,
            //   so the first declared dependency ends up on top.
            let finished = &self.finished;
            self.stack.extend(
                graph
                    .neighbors(next)
                    .filter(|dep| !finished.contains(dep.index())),
            );
        }
    }
}
