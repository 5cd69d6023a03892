use std::rc::Rc;

use derive_ex::derive_ex;

use crate::{core::ActionContext, SignalContext, State};


/// Late-bound, observable handle to a live platform object.
///
/// A `NodeRef` starts unbound; the owning context binds it once the underlying
/// element exists and unbinds it when the element goes away. Reading it
/// through a tracking [`SignalContext`] adds a dependency, so bindings built
/// on top re-evaluate exactly when the handle's identity changes.
#[derive_ex(Clone, bound())]
pub struct NodeRef<T: ?Sized + 'static>(State<Option<Rc<T>>>);

impl<T: ?Sized + 'static> Default for NodeRef<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + 'static> NodeRef<T> {
    pub fn new() -> Self {
        Self(State::new(None))
    }

    /// Point the handle at `node`. No-op if it already points at the same node.
    pub fn bind(&self, node: Rc<T>, ac: &mut ActionContext) {
        let mut current = self.0.borrow_mut(ac);
        if let Some(prev) = &*current {
            if Rc::ptr_eq(prev, &node) {
                return;
            }
        }
        *current = Some(node);
    }

    /// Clear the handle. No-op if it is already unbound.
    pub fn unbind(&self, ac: &mut ActionContext) {
        let mut current = self.0.borrow_mut(ac);
        if current.is_some() {
            *current = None;
        }
    }

    /// The node currently bound, adding a dependency on this handle to `sc`.
    pub fn get(&self, sc: &mut SignalContext) -> Option<Rc<T>> {
        self.0.borrow(sc).clone()
    }
}
