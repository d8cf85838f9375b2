//! Dependency graph over step indices.

use std::collections::{HashSet, VecDeque};

use crate::error::{DrakeError, Result};

/// Dependency relationships between steps, keyed by step index.
///
/// Step *p* depends on step *q* when one of *p*'s inputs is produced by *q*,
/// either as a file or as a tag.
#[derive(Debug, Clone, Default)]
pub struct StepGraph {
    /// Direct dependencies per step.
    dependencies: Vec<Vec<usize>>,
    /// Steps that depend on each step.
    dependents: Vec<Vec<usize>>,
}

impl StepGraph {
    /// Build a graph for `len` steps from (dependent, dependency) edges.
    ///
    /// Returns an error if the edges contain a cycle.
    pub fn new(len: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut dependencies = vec![Vec::new(); len];
        let mut dependents = vec![Vec::new(); len];

        for &(step, dep) in edges {
            if !dependencies[step].contains(&dep) {
                dependencies[step].push(dep);
                dependents[dep].push(step);
            }
        }

        let graph = Self {
            dependencies,
            dependents,
        };

        if let Some(cycle) = graph.find_cycle() {
            let cycle = cycle
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(DrakeError::CircularDependency { cycle });
        }

        Ok(graph)
    }

    /// Number of steps in the graph.
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Direct dependencies of a step.
    pub fn dependencies_of(&self, step: usize) -> &[usize] {
        &self.dependencies[step]
    }

    /// Steps that directly depend on the given step.
    pub fn dependents_of(&self, step: usize) -> &[usize] {
        &self.dependents[step]
    }

    /// All transitive dependencies (ancestors) of a step.
    pub fn ancestors_of(&self, step: usize) -> HashSet<usize> {
        let mut result = HashSet::new();
        let mut to_visit = vec![step];

        while let Some(current) = to_visit.pop() {
            for &dep in &self.dependencies[current] {
                if result.insert(dep) {
                    to_visit.push(dep);
                }
            }
        }

        result
    }

    /// Steps in topological order: dependencies before dependents.
    ///
    /// Ties break on step index so the order is deterministic.
    pub fn topological_order(&self) -> Vec<usize> {
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();

        let mut queue: VecDeque<usize> = (0..self.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut result = Vec::with_capacity(self.len());

        while let Some(step) = queue.pop_front() {
            result.push(step);

            for &dependent in &self.dependents[step] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        result
    }

    /// Rank of each step in the topological order, indexed by step.
    pub fn topological_ranks(&self) -> Vec<usize> {
        let mut ranks = vec![0; self.len()];
        for (rank, step) in self.topological_order().into_iter().enumerate() {
            ranks[step] = rank;
        }
        ranks
    }

    /// Find a cycle, returning its path if one exists.
    fn find_cycle(&self) -> Option<Vec<usize>> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            Visiting,
            Visited,
        }

        fn dfs(
            node: usize,
            graph: &StepGraph,
            state: &mut [State],
            path: &mut Vec<usize>,
        ) -> Option<Vec<usize>> {
            state[node] = State::Visiting;
            path.push(node);

            for &dep in &graph.dependencies[node] {
                match state[dep] {
                    State::Visiting => {
                        let start = path.iter().position(|&s| s == dep).unwrap();
                        let mut cycle = path[start..].to_vec();
                        cycle.push(dep);
                        return Some(cycle);
                    }
                    State::Unvisited => {
                        if let Some(cycle) = dfs(dep, graph, state, path) {
                            return Some(cycle);
                        }
                    }
                    State::Visited => {}
                }
            }

            path.pop();
            state[node] = State::Visited;
            None
        }

        let mut state = vec![State::Unvisited; self.len()];
        let mut path = Vec::new();

        for step in 0..self.len() {
            if state[step] == State::Unvisited {
                if let Some(cycle) = dfs(step, self, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph() {
        let graph = StepGraph::new(0, &[]).unwrap();
        assert!(graph.is_empty());
        assert!(graph.topological_order().is_empty());
    }

    #[test]
    fn duplicate_edges_collapse() {
        let graph = StepGraph::new(2, &[(1, 0), (1, 0)]).unwrap();
        assert_eq!(graph.dependencies_of(1), &[0]);
    }

    #[test]
    fn topo_order_linear_chain() {
        let graph = StepGraph::new(3, &[(1, 0), (2, 1)]).unwrap();
        assert_eq!(graph.topological_order(), vec![0, 1, 2]);
    }

    #[test]
    fn topo_order_diamond() {
        let graph = StepGraph::new(4, &[(1, 0), (2, 0), (3, 1), (3, 2)]).unwrap();
        let order = graph.topological_order();

        let pos = |i: usize| order.iter().position(|&s| s == i).unwrap();
        assert!(pos(0) < pos(1));
        assert!(pos(0) < pos(2));
        assert!(pos(1) < pos(3));
        assert!(pos(2) < pos(3));
    }

    #[test]
    fn cycle_is_rejected_at_construction() {
        let result = StepGraph::new(2, &[(0, 1), (1, 0)]);
        assert!(matches!(result, Err(DrakeError::CircularDependency { .. })));
    }

    #[test]
    fn self_cycle_is_rejected() {
        let result = StepGraph::new(1, &[(0, 0)]);
        assert!(result.is_err());
    }

    #[test]
    fn ancestors_none_for_root() {
        let graph = StepGraph::new(2, &[(1, 0)]).unwrap();
        assert!(graph.ancestors_of(0).is_empty());
    }

    #[test]
    fn ancestors_are_transitive() {
        let graph = StepGraph::new(3, &[(1, 0), (2, 1)]).unwrap();
        let ancestors = graph.ancestors_of(2);
        assert!(ancestors.contains(&0));
        assert!(ancestors.contains(&1));
        assert_eq!(ancestors.len(), 2);
    }

    #[test]
    fn dependents_are_tracked() {
        let graph = StepGraph::new(3, &[(1, 0), (2, 0)]).unwrap();
        let mut dependents = graph.dependents_of(0).to_vec();
        dependents.sort_unstable();
        assert_eq!(dependents, vec![1, 2]);
    }

    #[test]
    fn ranks_respect_dependencies() {
        let graph = StepGraph::new(3, &[(0, 2)]).unwrap();
        let ranks = graph.topological_ranks();
        assert!(ranks[2] < ranks[0]);
    }
}
