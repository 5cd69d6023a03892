use std::{
    cell::RefCell,
    collections::BTreeMap,
    time::{Duration, Instant},
};

use slabmap::SlabMap;

use crate::core::ActionContext;


thread_local! {
    static QUEUE: RefCell<TimerQueue> = RefCell::new(TimerQueue::new());
}

type TimerAction = Box<dyn FnOnce(&mut ActionContext)>;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Key {
    at: Instant,
    seq: usize,
}

struct Entry {
    action: TimerAction,
    key: Key,
}

struct TimerQueue {
    next_seq: usize,
    due: BTreeMap<Key, usize>,
    entries: SlabMap<Option<Entry>>,
}

impl TimerQueue {
    fn new() -> Self {
        Self {
            next_seq: 0,
            due: BTreeMap::new(),
            entries: SlabMap::new(),
        }
    }

    fn insert(&mut self, at: Instant, action: TimerAction) -> usize {
        let key = Key {
            at,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        let id = self.entries.insert(Some(Entry { action, key }));
        self.due.insert(key, id);
        id
    }

    fn remove(&mut self, id: usize) {
        if let Some(Some(e)) = self.entries.remove(id) {
            self.due.remove(&e.key);
        }
    }

    fn take_due(&mut self, now: Instant) -> Vec<TimerAction> {
        let mut fired = Vec::new();
        loop {
            let Some((&key, &id)) = self.due.first_key_value() else {
                break;
            };
            if key.at > now {
                break;
            }
            self.due.remove(&key);
            // The slot stays reserved until the `Timer` handle drops, so a
            // reused id can never cancel someone else's entry.
            if let Some(e) = self.entries[id].take() {
                fired.push(e.action);
            }
        }
        fired
    }
}

/// Cancellable handle to a scheduled [`timer`].
///
/// Dropping the handle cancels the timer if it has not fired yet.
#[must_use]
pub struct Timer {
    id: Option<usize>,
}

impl Timer {
    fn schedule(at: Instant, action: TimerAction) -> Self {
        Self {
            id: Some(QUEUE.with(|q| q.borrow_mut().insert(at, action))),
        }
    }
}
impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            let _ = QUEUE.try_with(|q| q.borrow_mut().remove(id));
        }
    }
}

/// Schedule `f` to run as an action once `duration` has elapsed.
///
/// The timer fires when [`Runtime::run_timers`](crate::core::Runtime::run_timers)
/// (or [`update_at`](crate::core::Runtime::update_at)) is called with an
/// instant at or past the deadline. Timers scheduled for the same instant fire
/// in scheduling order.
pub fn timer(duration: Duration, f: impl FnOnce(&mut ActionContext) + 'static) -> Timer {
    timer_at(Instant::now() + duration, f)
}

/// Schedule `f` to run as an action at `at`.
pub fn timer_at(at: Instant, f: impl FnOnce(&mut ActionContext) + 'static) -> Timer {
    Timer::schedule(at, Box::new(f))
}

pub(crate) fn take_due(now: Instant) -> Vec<TimerAction> {
    QUEUE.with(|q| q.borrow_mut().take_due(now))
}
