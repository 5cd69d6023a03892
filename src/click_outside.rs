use std::rc::Rc;

use crate::{
    core::{spawn_action, ActionContext},
    platform::{PointerHit, PointerHost, Region},
    NodeRef, SignalContext, State, Subscription,
};


/// Detects pointer-down events outside a target region and manages an
/// open/closed flag, e.g. for dismissing a popup or dropdown.
///
/// A hit inside the optional trigger region (typically the button that opens
/// the popup) is ignored entirely. A hit outside the target region invokes
/// the callback and forces the flag closed. While the target is unbound,
/// every hit is treated as inside and nothing happens.
///
/// Exactly one document-level listener is registered per detector; it is
/// released when the detector drops.
pub struct ClickOutside {
    open: State<bool>,
    target: NodeRef<dyn Region>,
    trigger: NodeRef<dyn Region>,
    _listener: Subscription,
}

impl ClickOutside {
    /// The callback's identity is fixed for the lifetime of the detector;
    /// exchanging it means dropping this detector and building a new one.
    pub fn new<D>(doc: &Rc<D>, on_outside: impl Fn(&mut ActionContext) + 'static) -> Self
    where
        D: PointerHost + ?Sized,
    {
        let open = State::new(false);
        let target = NodeRef::<dyn Region>::new();
        let trigger = NodeRef::<dyn Region>::new();
        let on_outside: Rc<dyn Fn(&mut ActionContext)> = Rc::new(on_outside);
        let listener = {
            let open = open.clone();
            let target = target.clone();
            let trigger = trigger.clone();
            doc.on_pointer_down(Rc::new(move |hit: &PointerHit| {
                let hit = hit.target;
                let open = open.clone();
                let target = target.clone();
                let trigger = trigger.clone();
                let on_outside = on_outside.clone();
                spawn_action(move |ac| {
                    let outside = {
                        let sc = &mut ac.sc();
                        if trigger.get(sc).is_some_and(|t| t.contains(hit)) {
                            return;
                        }
                        target.get(sc).is_some_and(|t| !t.contains(hit))
                    };
                    if outside {
                        on_outside(ac);
                        open.set(false, ac);
                    }
                });
            }))
        };
        Self {
            open,
            target,
            trigger,
            _listener: listener,
        }
    }

    /// The region hits are tested against.
    pub fn target(&self) -> &NodeRef<dyn Region> {
        &self.target
    }

    /// The exempt region whose hits are ignored. Leave unbound if there is none.
    pub fn trigger(&self) -> &NodeRef<dyn Region> {
        &self.trigger
    }

    pub fn is_open(&self, sc: &mut SignalContext) -> bool {
        self.open.get(sc)
    }

    pub fn toggle(&self, ac: &mut ActionContext) {
        let mut open = self.open.borrow_mut(ac);
        *open = !*open;
    }

    pub fn set_open(&self, open: bool, ac: &mut ActionContext) {
        self.open.set_dedup(open, ac);
    }
}
