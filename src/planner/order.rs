//! Dependency ordering for planned actions.
//!
//! Views and materializations reference tables and views by name inside
//! their expressions. A resource being created or replaced must come after
//! every created or replaced resource it references; a deleted resource must
//! come before every deleted resource it references. Ties are broken by
//! `(kind, name)`, so the order never depends on declaration order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use tracing::debug;

use super::plan::{ActionKind, PlannedAction};
use crate::error::PlanError;
use crate::resource::{ResourceKind, ResourceRef};

/// Topological sort of planned actions (Kahn's algorithm over a min-heap).
#[derive(Debug, Default)]
pub struct DependencyOrderer;

impl DependencyOrderer {
    /// Creates a new orderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Orders `actions` so that dependencies are respected.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Cycle`] if the created or replaced resources
    /// reference each other in a loop. A resource referencing itself is a
    /// cycle of one.
    pub fn order(&self, actions: Vec<PlannedAction>) -> Result<Vec<PlannedAction>, PlanError> {
        let graph = Graph::build(&actions);
        let mut in_degree: Vec<usize> = graph.predecessors.iter().map(BTreeSet::len).collect();

        let mut heap = BinaryHeap::new();
        for (index, degree) in in_degree.iter().enumerate() {
            if *degree == 0 {
                heap.push(Reverse((actions[index].reference.clone(), index)));
            }
        }

        let mut sorted = Vec::with_capacity(actions.len());
        while let Some(Reverse((_, index))) = heap.pop() {
            sorted.push(index);
            for &next in &graph.successors[index] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    heap.push(Reverse((actions[next].reference.clone(), next)));
                }
            }
        }

        if sorted.len() < actions.len() {
            let members = find_cycle(&actions, &graph, &in_degree);
            return Err(PlanError::Cycle { members });
        }

        debug!(actions = sorted.len(), "Dependency order computed");

        let mut slots: Vec<Option<PlannedAction>> = actions.into_iter().map(Some).collect();
        Ok(sorted
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect())
    }
}

/// Edges between action indices; an edge `a -> b` means `a` runs before `b`.
struct Graph {
    successors: Vec<BTreeSet<usize>>,
    predecessors: Vec<BTreeSet<usize>>,
}

impl Graph {
    fn build(actions: &[PlannedAction]) -> Self {
        // Expressions can name tables and views, never materializations.
        let mut by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, action) in actions.iter().enumerate() {
            if action.reference.kind != ResourceKind::Materialization {
                by_name
                    .entry(action.reference.name.as_str())
                    .or_default()
                    .push(index);
            }
        }

        let mut graph = Self {
            successors: vec![BTreeSet::new(); actions.len()],
            predecessors: vec![BTreeSet::new(); actions.len()],
        };

        for (dependent, action) in actions.iter().enumerate() {
            let Some(definition) = action.definition() else {
                continue;
            };
            for name in definition.referenced_names() {
                let Some(targets) = by_name.get(name.as_str()) else {
                    continue;
                };
                for &dependency in targets {
                    // A view reading the table it shares a name with.
                    if dependency == dependent && targets.len() > 1 {
                        continue;
                    }
                    let target = actions[dependency].kind;
                    if action.kind.writes() && target.writes() {
                        graph.add_edge(dependency, dependent);
                    } else if action.kind == ActionKind::Delete
                        && target == ActionKind::Delete
                        && dependency != dependent
                    {
                        graph.add_edge(dependent, dependency);
                    }
                }
            }
        }
        graph
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        self.successors[from].insert(to);
        self.predecessors[to].insert(from);
    }
}

/// Extracts one cycle from the actions left unsorted.
///
/// Every unsorted action still has an unsorted predecessor, so walking
/// predecessors from any of them must revisit an action. Members are listed
/// in reference order starting from the smallest `(kind, name)`.
fn find_cycle(actions: &[PlannedAction], graph: &Graph, in_degree: &[usize]) -> Vec<ResourceRef> {
    let remaining = |index: &usize| in_degree[*index] > 0;
    let reference = |index: &usize| &actions[*index].reference;

    let Some(start) = (0..actions.len()).filter(remaining).min_by_key(reference) else {
        return Vec::new();
    };

    let mut path: Vec<usize> = Vec::new();
    let mut position: BTreeMap<usize, usize> = BTreeMap::new();
    let mut current = start;
    let mut cycle = loop {
        if let Some(&at) = position.get(&current) {
            break path.split_off(at);
        }
        position.insert(current, path.len());
        path.push(current);

        let Some(&next) = graph.predecessors[current]
            .iter()
            .filter(|index| remaining(*index))
            .min_by_key(|index| reference(*index))
        else {
            break path;
        };
        current = next;
    };

    if let Some(smallest) = (0..cycle.len()).min_by_key(|&i| reference(&cycle[i])) {
        cycle.rotate_left(smallest);
    }
    cycle.iter().map(|index| reference(index).clone()).collect()
}
