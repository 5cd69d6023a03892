use std::{
    cell::RefCell,
    rc::Rc,
    time::{Duration, SystemTime},
};

use crate::{
    core::spawn_action,
    platform::ConnectivityHost,
    timer::{timer, Timer},
    SignalContext, State, Subscription,
};

#[cfg(test)]
mod tests;

/// How long [`OnlineWatcher::just_reconnected`] stays set after the host
/// comes back online.
pub const RECONNECT_WINDOW: Duration = Duration::from_millis(4000);

/// Reflects the host's connectivity into observable state.
///
/// Status starts from a synchronous read of the connectivity flag, so it is
/// only ever unknown where the flag itself cannot be read (non-browser
/// context). Going offline records the transition time; coming back online
/// raises a transient "just reconnected" flag that clears itself after
/// [`RECONNECT_WINDOW`]. The clearing timer is re-armed on every re-entry to
/// online and cancelled when the watcher drops.
pub struct OnlineWatcher {
    online: State<Option<bool>>,
    last_disconnect: State<Option<SystemTime>>,
    just_reconnected: State<bool>,
    _reset: Rc<RefCell<Option<Timer>>>,
    _listener: Subscription,
}

impl OnlineWatcher {
    pub fn new<H>(host: &Rc<H>) -> Self
    where
        H: ConnectivityHost + ?Sized,
    {
        let online = State::new(host.is_online());
        let last_disconnect = State::new(None);
        let just_reconnected = State::new(false);
        let reset: Rc<RefCell<Option<Timer>>> = Rc::new(RefCell::new(None));
        let listener = {
            let online = online.clone();
            let last_disconnect = last_disconnect.clone();
            let just_reconnected = just_reconnected.clone();
            let reset = reset.clone();
            host.on_change(Rc::new(move |is_online| {
                let online = online.clone();
                let last_disconnect = last_disconnect.clone();
                let just_reconnected = just_reconnected.clone();
                let reset = reset.clone();
                spawn_action(move |ac| {
                    if is_online {
                        online.set(Some(true), ac);
                        just_reconnected.set(true, ac);
                        let flag = just_reconnected.clone();
                        *reset.borrow_mut() = Some(timer(RECONNECT_WINDOW, move |ac| {
                            flag.set(false, ac);
                        }));
                    } else {
                        online.set(Some(false), ac);
                        last_disconnect.set(Some(SystemTime::now()), ac);
                    }
                });
            }))
        };
        Self {
            online,
            last_disconnect,
            just_reconnected,
            _reset: reset,
            _listener: listener,
        }
    }

    /// `Some(true)`/`Some(false)` once known, `None` while undeterminable.
    pub fn is_online(&self, sc: &mut SignalContext) -> Option<bool> {
        self.online.get(sc)
    }

    /// True exactly while the status is still unknown.
    pub fn is_determining(&self, sc: &mut SignalContext) -> bool {
        self.online.get(sc).is_none()
    }

    /// When the connection was last lost, if it ever was.
    pub fn last_disconnect(&self, sc: &mut SignalContext) -> Option<SystemTime> {
        self.last_disconnect.get(sc)
    }

    /// True for [`RECONNECT_WINDOW`] after the host comes back online.
    pub fn just_reconnected(&self, sc: &mut SignalContext) -> bool {
        self.just_reconnected.get(sc)
    }
}
