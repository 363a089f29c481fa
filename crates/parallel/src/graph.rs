//! Explicit task graphs
//!
//! A [`TaskGraph`] is built node by node; a node may only depend on nodes
//! already in the graph, so every graph is acyclic by construction and the
//! insertion order is a valid topological order. Evaluation groups nodes
//! into waves, where wave `k` holds the nodes whose longest dependency
//! chain has length `k`, and runs each wave with a [`ProcessingMode`].
//! Nodes of one wave never depend on each other.

use std::collections::HashMap;

use crate::error::GraphError;
use crate::strategy::{ParallelStrategy, ProcessingMode};

/// Index of a node in its graph
pub type NodeId = usize;

type TaskFn<'a, T, E> = Box<dyn Fn(&[&T]) -> Result<T, E> + Send + Sync + 'a>;

struct Node<'a, T, E> {
    name: String,
    deps: Vec<NodeId>,
    task: TaskFn<'a, T, E>,
}

/// DAG of pure tasks producing values of type `T`.
///
/// Tasks may borrow data living for `'a`.
pub struct TaskGraph<'a, T, E> {
    nodes: Vec<Node<'a, T, E>>,
    by_name: HashMap<String, NodeId>,
}

impl<T, E> Default for TaskGraph<'_, T, E> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<T, E> std::fmt::Debug for TaskGraph<'_, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.nodes.iter().map(|n| (&n.name, &n.deps)))
            .finish()
    }
}

impl<'a, T, E> TaskGraph<'a, T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node computing its value from the outputs of `deps`.
    ///
    /// The task receives the dependency outputs in the order of `deps`.
    pub fn add_node<F>(&mut self, name: impl Into<String>, deps: &[NodeId], task: F) -> Result<NodeId, GraphError>
    where
        F: Fn(&[&T]) -> Result<T, E> + Send + Sync + 'a,
    {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }
        if let Some(&dependency) = deps.iter().find(|&&d| d >= self.nodes.len()) {
            return Err(GraphError::UnknownDependency { node: name, dependency });
        }
        let id = self.nodes.len();
        self.by_name.insert(name.clone(), id);
        self.nodes.push(Node {
            name,
            deps: deps.to_vec(),
            task: Box::new(task),
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id).map(|n| n.name.as_str())
    }

    /// Nodes grouped by dependency level, each wave in insertion order
    pub fn waves(&self) -> Vec<Vec<NodeId>> {
        let mut level = vec![0usize; self.nodes.len()];
        let mut waves: Vec<Vec<NodeId>> = Vec::new();
        for (id, node) in self.nodes.iter().enumerate() {
            // Dependencies precede their dependents, so their level is final
            let l = node.deps.iter().map(|&d| level[d] + 1).max().unwrap_or(0);
            level[id] = l;
            if waves.len() <= l {
                waves.resize_with(l + 1, Vec::new);
            }
            waves[l].push(id);
        }
        waves
    }

    /// Run every node, wave by wave.
    ///
    /// The first task error aborts evaluation; tasks of the failing wave
    /// may still have run.
    pub fn evaluate(&self, mode: ProcessingMode) -> Result<Evaluation<T>, E>
    where
        T: Send + Sync,
        E: Send + From<GraphError>,
    {
        let mut outputs: Vec<Option<T>> = (0..self.nodes.len()).map(|_| None).collect();
        let waves = self.waves();
        for wave in &waves {
            let results = {
                let done = &outputs;
                mode.par_map(0..wave.len(), |i| {
                    let node = &self.nodes[wave[i]];
                    let inputs = node
                        .deps
                        .iter()
                        .map(|&d| done[d].as_ref())
                        .collect::<Option<Vec<&T>>>()
                        .ok_or_else(|| GraphError::MissingOutput(node.name.clone()))?;
                    (node.task)(&inputs)
                })?
            };
            for (&id, result) in wave.iter().zip(results) {
                outputs[id] = Some(result?);
            }
        }
        Ok(Evaluation {
            outputs,
            wave_count: waves.len(),
        })
    }
}

/// Outputs of an evaluated graph
#[derive(Debug)]
pub struct Evaluation<T> {
    outputs: Vec<Option<T>>,
    wave_count: usize,
}

impl<T> Evaluation<T> {
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.outputs.get(id).and_then(Option::as_ref)
    }

    /// Move the output of `id` out of the evaluation
    pub fn take(&mut self, id: NodeId) -> Option<T> {
        self.outputs.get_mut(id).and_then(Option::take)
    }

    /// Number of sequential waves the evaluation needed
    pub fn wave_count(&self) -> usize {
        self.wave_count
    }
}
