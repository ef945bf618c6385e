//! The resolved target graph and batch resolution.
//!
//! Targets enter the graph only once fully resolved, so readers never see
//! a partially filled target. Labels are unique: a second insert under the
//! same label is an internal invariant breach, not a user error, and
//! panics at the insertion site.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use rayon::prelude::*;
use thiserror::Error;
use tracing::info;

use crate::core::context::BuildContext;
use crate::core::label::Label;
use crate::core::target::{ResolutionState, Target};
use crate::core::value::Scope;
use crate::generator::{generate_target, Declaration, GenerateError, GenerateOutcome};

/// The flavor of a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepKind {
    Private,
    Public,
    Data,
}

/// Error produced while ordering the resolved graph.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("dependency cycle through {label}")]
    Cycle { label: Label },
}

/// All fully resolved targets, keyed by label.
#[derive(Debug, Default)]
pub struct ResolvedGraph {
    targets: Mutex<HashMap<Label, Arc<Target>>>,
}

impl ResolvedGraph {
    pub fn new() -> Self {
        ResolvedGraph::default()
    }

    /// Insert a resolved target and return the shared handle.
    ///
    /// The target must be in the `Resolved` state, and its label must be
    /// unused; both violations are generator bugs and panic.
    pub fn insert(&self, target: Target) -> Arc<Target> {
        assert!(
            target.state() == ResolutionState::Resolved,
            "inserting {} in state {:?}",
            target.label(),
            target.state()
        );
        let label = target.label();
        let shared = Arc::new(target);

        let mut targets = self.targets.lock().unwrap();
        if targets.insert(label, Arc::clone(&shared)).is_some() {
            panic!("two targets resolved for {label}");
        }
        shared
    }

    pub fn get(&self, label: Label) -> Option<Arc<Target>> {
        self.targets.lock().unwrap().get(&label).cloned()
    }

    pub fn len(&self) -> usize {
        self.targets.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.lock().unwrap().is_empty()
    }

    /// Every resolved target, in stable label order.
    pub fn targets(&self) -> Vec<Arc<Target>> {
        let targets = self.targets.lock().unwrap();
        let mut all: Vec<Arc<Target>> = targets.values().cloned().collect();
        all.sort_by_key(|t| t.label());
        all
    }

    /// Build the dependency graph over the resolved targets.
    ///
    /// Labels of dependencies that never resolved still get nodes, so
    /// callers can report them instead of silently dropping edges.
    pub fn dependency_graph(&self) -> DiGraph<Label, DepKind> {
        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();

        let all = self.targets();
        for target in &all {
            indices
                .entry(target.label())
                .or_insert_with(|| graph.add_node(target.label()));
        }

        for target in &all {
            let from = indices[&target.label()];
            let mut add_edges = |labels: &[Label], kind: DepKind| {
                for dep in labels {
                    let to = *indices
                        .entry(*dep)
                        .or_insert_with(|| graph.add_node(*dep));
                    graph.add_edge(from, to, kind);
                }
            };
            add_edges(target.private_deps(), DepKind::Private);
            add_edges(target.public_deps(), DepKind::Public);
            add_edges(target.data_deps(), DepKind::Data);
        }
        graph
    }

    /// A dependencies-first ordering of every resolved target.
    pub fn resolution_order(&self) -> Result<Vec<Label>, ResolveError> {
        let graph = self.dependency_graph();
        let mut order = toposort(&graph, None).map_err(|cycle| ResolveError::Cycle {
            label: graph[cycle.node_id()],
        })?;
        // Toposort puts dependents before their dependencies (edges point at
        // deps); the build wants the reverse.
        order.reverse();
        Ok(order.into_iter().map(|idx| graph[idx]).collect())
    }
}

/// Evaluate a batch of declarations in parallel.
///
/// Outcomes come back in input order; resolved targets additionally land
/// in the context's graph. Deferral is per-declaration, so one deferred
/// target never blocks the rest of the batch.
pub fn generate_all(
    ctx: &BuildContext,
    declarations: Vec<(Scope, Declaration)>,
) -> Vec<Result<GenerateOutcome, GenerateError>> {
    info!(count = declarations.len(), "generating targets");
    declarations
        .into_par_iter()
        .map(|(mut scope, decl)| generate_target(ctx, &mut scope, &decl))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::OutputType;

    fn resolved(label: Label, deps: Vec<Label>) -> Target {
        let mut target = Target::new(label, OutputType::Group);
        target.private_deps = deps;
        target.set_state(ResolutionState::Resolved);
        target
    }

    fn label(dir: &str, name: &str) -> Label {
        Label::new(dir, name, "//tc/", "gcc")
    }

    #[test]
    fn test_insert_and_get() {
        let graph = ResolvedGraph::new();
        let a = label("//a/", "a");

        assert!(graph.get(a).is_none());
        graph.insert(resolved(a, vec![]));
        assert_eq!(graph.get(a).unwrap().label(), a);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    #[should_panic(expected = "two targets resolved")]
    fn test_duplicate_label_panics() {
        let graph = ResolvedGraph::new();
        let a = label("//a/", "a");
        graph.insert(resolved(a, vec![]));
        graph.insert(resolved(a, vec![]));
    }

    #[test]
    #[should_panic(expected = "in state")]
    fn test_unresolved_insert_panics() {
        let graph = ResolvedGraph::new();
        graph.insert(Target::new(label("//a/", "a"), OutputType::Group));
    }

    #[test]
    fn test_resolution_order_is_deps_first() {
        let graph = ResolvedGraph::new();
        let (a, b, c) = (label("//a/", "a"), label("//b/", "b"), label("//c/", "c"));
        graph.insert(resolved(a, vec![b]));
        graph.insert(resolved(b, vec![c]));
        graph.insert(resolved(c, vec![]));

        let order = graph.resolution_order().unwrap();
        let pos = |l: Label| order.iter().position(|x| *x == l).unwrap();
        assert!(pos(c) < pos(b));
        assert!(pos(b) < pos(a));
    }

    #[test]
    fn test_cycle_is_reported() {
        let graph = ResolvedGraph::new();
        let (a, b) = (label("//a/", "a"), label("//b/", "b"));
        graph.insert(resolved(a, vec![b]));
        graph.insert(resolved(b, vec![a]));

        assert!(matches!(
            graph.resolution_order(),
            Err(ResolveError::Cycle { .. })
        ));
    }

    #[test]
    fn test_dangling_dep_gets_a_node() {
        let graph = ResolvedGraph::new();
        let a = label("//a/", "a");
        let missing = label("//missing/", "missing");
        graph.insert(resolved(a, vec![missing]));

        let dep_graph = graph.dependency_graph();
        assert_eq!(dep_graph.node_count(), 2);
        assert_eq!(dep_graph.edge_count(), 1);
    }
}
