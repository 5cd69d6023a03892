use std::{cell::RefCell, rc::Rc};

use crate::{
    effect,
    platform::{DomEvent, EventTarget},
    NodeRef, Subscription,
};

#[cfg(test)]
mod tests;

/// Attach `handler` for `event` to every bound target in `targets`.
///
/// Unbound targets are skipped silently. Whenever any handle's identity
/// changes, every listener is released before the handler is re-attached to
/// the then-current set of elements. Dropping the returned [`Subscription`]
/// detaches everything.
///
/// The event name and handler are fixed per binding; listening for a
/// different event, or with a different handler, is a new `bind_event` call.
/// No ordering is guaranteed across elements; each element delivers its own
/// events in platform order.
pub fn bind_event<T>(
    targets: &[NodeRef<T>],
    event: &str,
    handler: Rc<dyn Fn(&DomEvent)>,
) -> Subscription
where
    T: EventTarget + ?Sized + 'static,
{
    let targets = targets.to_vec();
    let event = event.to_string();
    let guards: RefCell<Vec<Subscription>> = RefCell::new(Vec::new());
    effect(move |sc| {
        // Release before re-acquiring so no element holds two listeners.
        guards.borrow_mut().clear();
        let mut attached = Vec::new();
        for target in &targets {
            if let Some(element) = target.get(sc) {
                attached.push(element.add_listener(&event, handler.clone()));
            }
        }
        *guards.borrow_mut() = attached;
    })
}
