// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::dag::task::{Task, TaskState};
use crate::engine::TaskName;
use crate::errors::{PolldagError, Result};
use crate::exec::RetryPolicy;
use crate::types::TriggerRule;

/// In-memory DAG of tasks keyed by name.
///
/// Edge direction is upstream -> task: for `B` depending on `A` the graph
/// holds `A -> B`. Every mutation keeps the graph acyclic, so a built graph
/// never needs to be re-validated at run time.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    graph: DiGraph<Task, ()>,
    index: HashMap<TaskName, NodeIndex>,
}

impl DagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task that depends on the already-registered `upstream` tasks.
    ///
    /// Nothing is inserted when an error is returned.
    pub fn add_task(
        &mut self,
        task: Task,
        upstream: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<()> {
        if self.index.contains_key(task.name()) {
            return Err(PolldagError::DuplicateTask(task.name().to_string()));
        }

        let mut upstream_idx = Vec::new();
        for up in upstream {
            let up = up.as_ref();
            if up == task.name() {
                return Err(PolldagError::DagCycle(format!(
                    "task '{}' cannot depend on itself",
                    up
                )));
            }
            let idx = self.node(up)?;
            if !upstream_idx.contains(&idx) {
                upstream_idx.push(idx);
            }
        }

        let name = task.name().to_string();
        let idx = self.graph.add_node(task);
        for up in upstream_idx {
            self.graph.add_edge(up, idx, ());
        }
        self.index.insert(name.clone(), idx);

        debug!(task = %name, "task added to graph");
        Ok(())
    }

    /// Make `task` depend on `upstream`.
    pub fn add_dependency(&mut self, task: &str, upstream: &str) -> Result<()> {
        let task_idx = self.node(task)?;
        let up_idx = self.node(upstream)?;

        // upstream -> task closes a cycle iff task already reaches upstream.
        if has_path_connecting(&self.graph, task_idx, up_idx, None) {
            return Err(PolldagError::DagCycle(format!(
                "cycle detected in task DAG: '{}' -> '{}'",
                upstream, task
            )));
        }

        self.graph.update_edge(up_idx, task_idx, ());
        Ok(())
    }

    pub fn set_trigger_rule(&mut self, task: &str, rule: TriggerRule) -> Result<()> {
        let idx = self.node(task)?;
        self.graph[idx].set_trigger_rule(rule);
        Ok(())
    }

    pub fn set_retry_policy(&mut self, task: &str, policy: RetryPolicy) -> Result<()> {
        let idx = self.node(task)?;
        self.graph[idx].set_retry_policy(policy);
        Ok(())
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|idx| &self.graph[*idx])
    }

    /// Return all task names.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|t| t.name())
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Immediate upstream tasks of `name`.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Immediate downstream tasks of `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Tasks nothing depends on.
    pub fn leaves(&self) -> Vec<&str> {
        self.graph
            .externals(Direction::Outgoing)
            .map(|idx| self.graph[idx].name())
            .collect()
    }

    /// Task names ordered so that every task comes after its upstreams.
    pub fn topological_order(&self) -> Vec<&str> {
        match toposort(&self.graph, None) {
            Ok(order) => order.into_iter().map(|idx| self.graph[idx].name()).collect(),
            // Unreachable: mutations never admit a cycle.
            Err(_) => self.tasks().collect(),
        }
    }

    /// Tasks that are `Pending` and whose upstreams are all terminal.
    ///
    /// The iterator is lazy and borrows `states`; call again for a fresh scan.
    pub fn ready_tasks<'a>(
        &'a self,
        states: &'a HashMap<TaskName, TaskState>,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.graph
            .node_indices()
            .filter(move |&idx| {
                let pending = states.get(self.graph[idx].name()) == Some(&TaskState::Pending);
                pending
                    && self
                        .graph
                        .neighbors_directed(idx, Direction::Incoming)
                        .all(|up| {
                            states
                                .get(self.graph[up].name())
                                .is_some_and(|s| s.is_terminal())
                        })
            })
            .map(move |idx| self.graph[idx].name())
    }

    fn node(&self, name: &str) -> Result<NodeIndex> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| PolldagError::UnknownTask(name.to_string()))
    }

    fn neighbors(&self, name: &str, dir: Direction) -> Vec<&str> {
        match self.index.get(name) {
            Some(idx) => self
                .graph
                .neighbors_directed(*idx, dir)
                .map(|n| self.graph[n].name())
                .collect(),
            None => Vec::new(),
        }
    }
}
