// tests/scheduler_property.rs

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use polldag::dag::{DagGraph, Scheduler, TaskState};
use polldag::engine::TaskOutcome;
use polldag::types::TriggerRule;
use polldag_test_utils::scripted::ScriptedOperator;
use proptest::prelude::*;

fn rule_from(i: u8) -> TriggerRule {
    match i % 3 {
        0 => TriggerRule::AllSuccess,
        1 => TriggerRule::AllFailed,
        _ => TriggerRule::OneSuccess,
    }
}

// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = DagGraph> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        );
        let rules = proptest::collection::vec(any::<u8>(), num_tasks);

        (deps, rules).prop_map(|(raw_deps, rules)| {
            let mut graph = DagGraph::new();
            for (i, potential) in raw_deps.into_iter().enumerate() {
                let upstream: HashSet<String> = if i == 0 {
                    HashSet::new()
                } else {
                    potential.into_iter().map(|d| format!("task_{}", d % i)).collect()
                };
                let task = polldag::dag::Task::new(
                    format!("task_{}", i),
                    Arc::new(ScriptedOperator::succeeding()),
                )
                .with_trigger_rule(rule_from(rules[i]));
                graph.add_task(task, upstream).unwrap();
            }
            graph
        })
    })
}

proptest! {
    #[test]
    fn every_run_terminates_with_all_tasks_terminal(
        graph in dag_strategy(10),
        failing in proptest::collection::vec(0..10usize, 0..5),
        runs in 1usize..3,
    ) {
        let failing: HashSet<String> = failing.iter().map(|i| format!("task_{}", i)).collect();
        let task_count = graph.len();
        let mut scheduler = Scheduler::new(Arc::new(graph));

        for run in 0..runs {
            let step = scheduler.start_new_run(Utc::now()).unwrap();
            prop_assert_eq!(scheduler.last_run_id(), run as u64 + 1);

            let mut executing: Vec<String> =
                step.newly_scheduled.into_iter().map(|t| t.name).collect();
            let mut executed: HashSet<String> = HashSet::new();
            let mut steps = 0;

            while let Some(task) = executing.pop() {
                steps += 1;
                prop_assert!(steps <= task_count, "a task was scheduled twice");
                prop_assert!(executed.insert(task.clone()), "task {} ran twice", task);

                let outcome = if failing.contains(&task) {
                    TaskOutcome::Failed
                } else {
                    TaskOutcome::Success
                };
                let step = scheduler.handle_completion(&task, outcome).unwrap();
                executing.extend(step.newly_scheduled.into_iter().map(|t| t.name));
            }

            prop_assert!(scheduler.is_idle());
            let report = scheduler.report();
            prop_assert_eq!(report.outcomes.len(), task_count);
            for name in report.outcomes.keys() {
                let state = scheduler.state_of(name).unwrap();
                prop_assert!(state.is_terminal());
                prop_assert_eq!(executed.contains(name), matches!(state, TaskState::Success | TaskState::Failed));
            }
        }
    }
}
