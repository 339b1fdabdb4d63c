#![forbid(unsafe_code)]

//! Observer registry linking readers of a value to its change notifications.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::computation::{ComputationId, ComputationInner};
use crate::tracker::Tracker;

pub(crate) struct DependencyInner {
    tracker: Tracker,
    /// Keyed by id so notification order is creation order. Strong: a
    /// subscribed computation stays alive without an outside handle.
    dependents: RefCell<BTreeMap<ComputationId, Rc<ComputationInner>>>,
}

impl DependencyInner {
    pub(crate) fn remove_dependent(&self, id: ComputationId) {
        self.dependents.borrow_mut().remove(&id);
    }
}

/// A set of computations interested in one value.
///
/// Readers call [`depend()`](Dependency::depend) while a computation is
/// running; writers call [`changed()`](Dependency::changed) after mutating
/// the value. Cloning yields another handle to the same set.
#[derive(Clone)]
pub struct Dependency {
    inner: Rc<DependencyInner>,
}

impl Dependency {
    /// Create an empty dependency bound to `tracker`.
    #[must_use]
    pub fn new(tracker: &Tracker) -> Self {
        Self {
            inner: Rc::new(DependencyInner {
                tracker: tracker.clone(),
                dependents: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    /// Register the tracker's current computation, if any.
    ///
    /// Returns `true` if a computation was newly registered. Outside a
    /// computation (or inside [`Tracker::nonreactive`]) this is a no-op.
    pub fn depend(&self) -> bool {
        let Some(current) = self.inner.tracker.current_inner() else {
            return false;
        };
        if current.is_stopped() {
            return false;
        }
        let mut dependents = self.inner.dependents.borrow_mut();
        if dependents.contains_key(&current.id) {
            return false;
        }
        dependents.insert(current.id, Rc::clone(&current));
        drop(dependents);
        current.add_source(Rc::downgrade(&self.inner));
        true
    }

    /// Invalidate every registered computation and clear the set.
    pub fn changed(&self) {
        let dependents = std::mem::take(&mut *self.inner.dependents.borrow_mut());
        if dependents.is_empty() {
            return;
        }
        tracing::trace!(message = "dependency.changed", dependents = dependents.len());
        for computation in dependents.into_values() {
            computation.invalidate();
        }
    }

    /// Whether any computation is currently registered.
    #[must_use]
    pub fn has_dependents(&self) -> bool {
        !self.inner.dependents.borrow().is_empty()
    }

    /// Number of registered computations.
    #[must_use]
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.borrow().len()
    }

    /// The tracker this dependency reports to.
    #[must_use]
    pub fn tracker(&self) -> &Tracker {
        &self.inner.tracker
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("dependents", &self.dependent_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Computation;
    use std::cell::Cell;

    #[test]
    fn depend_outside_computation_is_noop() {
        let tracker = Tracker::new();
        let dep = Dependency::new(&tracker);
        assert!(!dep.depend());
        assert!(!dep.has_dependents());
    }

    #[test]
    fn depend_registers_once_per_run() {
        let tracker = Tracker::new();
        let dep = Dependency::new(&tracker);
        let dep_in = dep.clone();
        let registered = Rc::new(RefCell::new(Vec::new()));
        let registered_in = Rc::clone(&registered);
        let _comp = tracker.autorun(move |_| {
            registered_in.borrow_mut().push(dep_in.depend());
            registered_in.borrow_mut().push(dep_in.depend());
        });

        assert_eq!(*registered.borrow(), vec![true, false]);
        assert_eq!(dep.dependent_count(), 1);
    }

    #[test]
    fn changed_clears_dependents_and_queues() {
        let tracker = Tracker::new();
        let dep = Dependency::new(&tracker);
        let runs = Rc::new(Cell::new(0u32));

        let comps: Vec<_> = (0..3)
            .map(|_| {
                let dep_in = dep.clone();
                let runs_in = Rc::clone(&runs);
                tracker.autorun(move |_| {
                    dep_in.depend();
                    runs_in.set(runs_in.get() + 1);
                })
            })
            .collect();
        assert_eq!(dep.dependent_count(), 3);

        dep.changed();
        assert!(!dep.has_dependents());
        assert!(comps.iter().all(Computation::is_invalidated));
        assert_eq!(tracker.pending_count(), 3);

        tracker.flush().unwrap();
        assert_eq!(runs.get(), 6);
        assert_eq!(dep.dependent_count(), 3);
    }

    #[test]
    fn changed_without_dependents_is_noop() {
        let tracker = Tracker::new();
        let dep = Dependency::new(&tracker);
        dep.changed();
        assert!(!tracker.has_pending());
    }

    #[test]
    fn nonreactive_read_does_not_register() {
        let tracker = Tracker::new();
        let dep = Dependency::new(&tracker);
        let dep_in = dep.clone();
        let tracker_in = tracker.clone();
        let _comp = tracker.autorun(move |_| {
            tracker_in.nonreactive(|| dep_in.depend());
        });
        assert!(!dep.has_dependents());
    }
}
