//! Property-based invariant tests for the dependency tracker.
//!
//! A random bipartite graph of variables and readers is built, then mutated
//! with arbitrary writes and flushes:
//!
//! 1. After a flush every reader has observed the current values of the
//!    variables it reads.
//! 2. A reader runs at most once per flush, however many of its variables
//!    were written.
//! 3. A reader re-runs iff one of its variables changed since its last run.
//! 4. The queue is empty after every successful flush.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use rrx_tracker::{Computation, Tracker, Var};

const VARS: usize = 6;

#[derive(Debug, Clone)]
enum Op {
    Set { var: usize, value: i32 },
    Flush,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..VARS, -3i32..3).prop_map(|(var, value)| Op::Set { var, value }),
        1 => Just(Op::Flush),
    ]
}

/// Each reader reads a non-empty subset of the variables.
fn arb_readers() -> impl Strategy<Value = Vec<Vec<usize>>> {
    proptest::collection::vec(
        proptest::collection::btree_set(0..VARS, 1..=3)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>()),
        1..=5,
    )
}

struct Reader {
    reads: Vec<usize>,
    seen: Rc<Cell<i32>>,
    runs: Rc<Cell<u64>>,
    computation: Computation,
}

fn spawn_reader(tracker: &Tracker, vars: &[Var<i32>], reads: Vec<usize>) -> Reader {
    let seen = Rc::new(Cell::new(0));
    let runs = Rc::new(Cell::new(0u64));
    let inputs: Vec<Var<i32>> = reads.iter().map(|&i| vars[i].clone()).collect();
    let (seen_in, runs_in) = (Rc::clone(&seen), Rc::clone(&runs));
    let computation = tracker.autorun(move |_| {
        seen_in.set(inputs.iter().map(Var::get).sum());
        runs_in.set(runs_in.get() + 1);
    });
    Reader {
        reads,
        seen,
        runs,
        computation,
    }
}

proptest! {
    #[test]
    fn readers_converge_after_flush(
        readers in arb_readers(),
        ops in proptest::collection::vec(arb_op(), 0..=50),
    ) {
        let tracker = Tracker::new();
        let vars: Vec<Var<i32>> = (0..VARS).map(|_| Var::new(&tracker, 0)).collect();
        let readers: Vec<Reader> = readers
            .into_iter()
            .map(|reads| spawn_reader(&tracker, &vars, reads))
            .collect();

        let mut dirty = vec![false; VARS];
        for op in ops {
            match op {
                Op::Set { var, value } => {
                    if vars[var].set(value) {
                        dirty[var] = true;
                    }
                }
                Op::Flush => {
                    let before: Vec<u64> = readers.iter().map(|r| r.runs.get()).collect();
                    tracker.flush().unwrap();
                    prop_assert!(!tracker.has_pending());

                    for (reader, before) in readers.iter().zip(before) {
                        let expected: i32 = reader.reads.iter().map(|&i| vars[i].get_untracked()).sum();
                        prop_assert_eq!(reader.seen.get(), expected);

                        let delta = reader.runs.get() - before;
                        let touched = reader.reads.iter().any(|&i| dirty[i]);
                        prop_assert_eq!(delta, u64::from(touched));
                        prop_assert_eq!(reader.computation.run_count(), reader.runs.get());
                    }
                    dirty.fill(false);
                }
            }
        }
    }

    #[test]
    fn stopped_readers_never_run(
        readers in arb_readers(),
        writes in proptest::collection::vec((0..VARS, -3i32..3), 1..=20),
    ) {
        let tracker = Tracker::new();
        let vars: Vec<Var<i32>> = (0..VARS).map(|_| Var::new(&tracker, 0)).collect();
        let readers: Vec<Reader> = readers
            .into_iter()
            .map(|reads| spawn_reader(&tracker, &vars, reads))
            .collect();
        for reader in &readers {
            reader.computation.stop();
        }

        for (var, value) in writes {
            vars[var].set_force(value);
        }
        let stats = tracker.flush().unwrap();

        prop_assert_eq!(stats.recomputations, 0);
        for reader in &readers {
            prop_assert_eq!(reader.runs.get(), 1);
            prop_assert!(reader.computation.is_stopped());
        }
        for var in &vars {
            prop_assert!(!var.dependency().has_dependents());
        }
    }
}
