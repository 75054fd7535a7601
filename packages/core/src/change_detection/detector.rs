use super::{ChangeDetectionStrategy, DetectorState, Listener, WatchId};
use crate::error::{EvalError, EvalResult};
use crate::expression::{EvalContext, Expression, Value};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::trace;

struct Watch {
    id: WatchId,
    expression: Rc<Expression>,
    /// `None` until the first evaluation
    last: Option<Value>,
    listener: Listener,
}

/// Dirty-checker for the watches of one template, with child detectors
/// mirroring the template tree.
pub struct ChangeDetector {
    context: Weak<dyn EvalContext>,
    strategy: ChangeDetectionStrategy,
    state: Cell<DetectorState>,
    watches: RefCell<Vec<Watch>>,
    next_id: Cell<usize>,
    children: RefCell<Vec<Rc<ChangeDetector>>>,
    parent: RefCell<Weak<ChangeDetector>>,
}

impl ChangeDetector {
    pub fn new(context: Weak<dyn EvalContext>, strategy: ChangeDetectionStrategy) -> Rc<Self> {
        Rc::new(ChangeDetector {
            context,
            strategy,
            state: Cell::new(DetectorState::Active),
            watches: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
        })
    }

    /// Register `child` to be swept after this detector's own watches
    pub fn add_child(self: &Rc<Self>, child: &Rc<ChangeDetector>) {
        *child.parent.borrow_mut() = Rc::downgrade(self);
        self.children.borrow_mut().push(Rc::clone(child));
    }

    pub fn parent(&self) -> Option<Rc<ChangeDetector>> {
        self.parent.borrow().upgrade()
    }

    pub fn strategy(&self) -> ChangeDetectionStrategy {
        self.strategy
    }

    pub fn state(&self) -> DetectorState {
        self.state.get()
    }

    pub fn is_active(&self) -> bool {
        self.state.get() == DetectorState::Active
    }

    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn watch_count(&self) -> usize {
        self.watches.borrow().len()
    }

    /// Start watching `expression`. With `evaluate_immediately` the current
    /// value is recorded without notifying the listener.
    pub fn watch(
        &self,
        expression: Rc<Expression>,
        evaluate_immediately: bool,
        listener: Listener,
    ) -> EvalResult<WatchId> {
        let id = WatchId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        if !self.is_active() {
            trace!(expression = %expression.source, "watch on disabled detector ignored");
            return Ok(id);
        }

        let last = if evaluate_immediately {
            let context = self.context.upgrade().ok_or_else(|| EvalError::Detached {
                expression: expression.source.clone(),
            })?;
            Some(expression.evaluate(&*context)?)
        } else {
            None
        };

        self.watches.borrow_mut().push(Watch {
            id,
            expression,
            last,
            listener,
        });
        Ok(id)
    }

    pub fn unwatch(&self, id: WatchId) -> bool {
        let mut watches = self.watches.borrow_mut();
        let before = watches.len();
        watches.retain(|w| w.id != id);
        watches.len() != before
    }

    /// Value recorded by the last evaluation of a watch
    pub fn last_value(&self, id: WatchId) -> Option<Value> {
        self.watches
            .borrow()
            .iter()
            .find(|w| w.id == id)
            .and_then(|w| w.last.clone())
    }

    /// Run one sweep over this detector and its automatically checked
    /// descendants. Returns the number of listeners fired. The first
    /// evaluation error aborts the sweep.
    pub fn check(&self) -> EvalResult<usize> {
        if !self.is_active() {
            return Ok(0);
        }

        let mut fired = self.check_own()?;

        let children: Vec<Rc<ChangeDetector>> = self.children.borrow().clone();
        for child in children {
            if child.strategy == ChangeDetectionStrategy::Manual {
                trace!("skipping manually checked detector");
                continue;
            }
            fired += child.check()?;
        }
        Ok(fired)
    }

    fn check_own(&self) -> EvalResult<usize> {
        let Some(context) = self.context.upgrade() else {
            trace!("detector context dropped, nothing to check");
            return Ok(0);
        };

        let ids: Vec<WatchId> = self.watches.borrow().iter().map(|w| w.id).collect();
        let mut fired = 0;

        for id in ids {
            // A listener may have disabled this detector or removed later watches
            if !self.is_active() {
                break;
            }
            let Some((expression, last)) = self.snapshot(id) else {
                continue;
            };

            let value = expression.evaluate(&*context)?;
            if last.as_ref().map_or(false, |last| last.same_value(&value)) {
                continue;
            }

            let listener = {
                let mut watches = self.watches.borrow_mut();
                match watches.iter_mut().find(|w| w.id == id) {
                    Some(watch) => {
                        watch.last = Some(value.clone());
                        Rc::clone(&watch.listener)
                    }
                    None => continue,
                }
            };
            listener(&value, &last.unwrap_or_default())?;
            fired += 1;
        }

        trace!(fired, "detector pass");
        Ok(fired)
    }

    fn snapshot(&self, id: WatchId) -> Option<(Rc<Expression>, Option<Value>)> {
        self.watches
            .borrow()
            .iter()
            .find(|w| w.id == id)
            .map(|w| (Rc::clone(&w.expression), w.last.clone()))
    }

    /// Permanently stop this detector and its subtree, and detach it from its
    /// parent.
    pub fn disable(&self) {
        if let Some(parent) = self.parent() {
            parent
                .children
                .borrow_mut()
                .retain(|c| !std::ptr::eq(Rc::as_ptr(c), self));
        }
        *self.parent.borrow_mut() = Weak::new();
        self.shut_down();
    }

    fn shut_down(&self) {
        if !self.is_active() {
            return;
        }
        self.state.set(DetectorState::Disabled);
        self.watches.borrow_mut().clear();
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children {
            *child.parent.borrow_mut() = Weak::new();
            child.shut_down();
        }
    }
}

impl std::fmt::Debug for ChangeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeDetector")
            .field("strategy", &self.strategy)
            .field("state", &self.state.get())
            .field("watches", &self.watches.borrow().len())
            .field("children", &self.children.borrow().len())
            .finish()
    }
}
