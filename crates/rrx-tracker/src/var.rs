#![forbid(unsafe_code)]

//! Reactive cell: a value plus the [`Dependency`] that guards it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::dependency::Dependency;
use crate::tracker::Tracker;

struct VarInner<T> {
    value: RefCell<T>,
    dependency: Dependency,
}

/// A reactive value.
///
/// [`get()`](Var::get) registers the current computation; [`set()`](Var::set)
/// notifies registered computations when the value actually changes.
/// Cloning yields another handle to the same cell.
pub struct Var<T> {
    inner: Rc<VarInner<T>>,
}

impl<T> Clone for Var<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Var<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("value", &*self.inner.value.borrow())
            .field("dependents", &self.inner.dependency.dependent_count())
            .finish()
    }
}

impl<T> Var<T> {
    #[must_use]
    pub fn new(tracker: &Tracker, value: T) -> Self {
        Self {
            inner: Rc::new(VarInner {
                value: RefCell::new(value),
                dependency: Dependency::new(tracker),
            }),
        }
    }

    /// Borrow the value, registering the current computation.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.dependency.depend();
        f(&self.inner.value.borrow())
    }

    /// Replace the value and notify dependents unconditionally.
    pub fn set_force(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.inner.dependency.changed();
    }

    /// The dependency guarding this cell.
    #[must_use]
    pub fn dependency(&self) -> &Dependency {
        &self.inner.dependency
    }
}

impl<T: Clone> Var<T> {
    /// Clone the value out, registering the current computation.
    #[must_use]
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Clone the value out without registering anything.
    #[must_use]
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// A zero-argument reactive accessor over this cell.
    pub fn accessor(&self) -> impl Fn() -> T + 'static
    where
        T: 'static,
    {
        let var = self.clone();
        move || var.get()
    }
}

impl<T: PartialEq> Var<T> {
    /// Replace the value. Dependents are notified only if it differs.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.inner.dependency.changed();
        true
    }
}
