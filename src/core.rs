use std::{
    any::Any,
    cell::{Ref, RefCell},
    mem::{replace, swap, take, transmute},
    ops::Deref,
    rc::{Rc, Weak},
    thread::AccessError,
    time::Instant,
};

use derive_ex::derive_ex;
use slabmap::SlabMap;

use crate::timer;


thread_local! {
    static GLOBALS: RefCell<Globals> = RefCell::new(Globals::new());
}

struct Globals {
    is_runtime_exists: bool,
    unbinds: Vec<Vec<SourceBinding>>,
    actions: Vec<Action>,
    notifys: Vec<NotifyTask>,
    tasks: Vec<Task>,
}
impl Globals {
    fn new() -> Self {
        Self {
            is_runtime_exists: false,
            unbinds: Vec::new(),
            actions: Vec::new(),
            notifys: Vec::new(),
            tasks: Vec::new(),
        }
    }
    fn with<T>(f: impl FnOnce(&mut Self) -> T) -> T {
        GLOBALS.with(|g| f(&mut g.borrow_mut()))
    }
    fn try_with<T>(f: impl FnOnce(&mut Self) -> T) -> Result<T, AccessError> {
        GLOBALS.try_with(|g| f(&mut g.borrow_mut()))
    }
    fn swap_vec<T>(f: impl FnOnce(&mut Self) -> &mut Vec<T>, values: &mut Vec<T>) -> bool {
        Self::with(|g| swap(f(g), values));
        !values.is_empty()
    }
    fn assert_exists(&self) {
        if !self.is_runtime_exists {
            panic!("`Runtime` is not created.");
        }
    }
    fn push_action(&mut self, action: Action) {
        self.assert_exists();
        self.actions.push(action);
    }
    fn push_notify(&mut self, sink: Weak<dyn BindSink>, slot: Slot) {
        self.notifys.push(NotifyTask { sink, slot });
    }
    fn finish_runtime(&mut self) {
        self.is_runtime_exists = false;
    }
}

/// Reactive runtime.
///
/// Drives every scheduled action, invalidation notification, task and timer
/// on the current thread. Only one `Runtime` can exist per thread at a time.
#[derive_ex(Default)]
#[default(Self::new())]
pub struct Runtime {
    notifys_buffer: Vec<NotifyTask>,
    actions_buffer: Vec<Action>,
    tasks_buffer: Vec<Task>,
    unbinds_buffer: Vec<Vec<SourceBinding>>,
}
impl Runtime {
    pub fn new() -> Self {
        if Globals::with(|g| replace(&mut g.is_runtime_exists, true)) {
            panic!("Only one `Runtime` can exist in the same thread at the same time.");
        }
        Self {
            notifys_buffer: Vec::new(),
            actions_buffer: Vec::new(),
            tasks_buffer: Vec::new(),
            unbinds_buffer: Vec::new(),
        }
    }

    pub fn ac(&mut self) -> &mut ActionContext {
        ActionContext::new(self)
    }
    fn nc(&mut self) -> &mut NotifyContext {
        self.ac().nc()
    }
    fn uc(&mut self) -> UpdateContext<'_> {
        UpdateContext(SignalContext { sink: None })
    }
    pub fn sc(&mut self) -> SignalContext<'_> {
        self.apply_notify();
        SignalContext { sink: None }
    }

    /// Perform scheduled actions.
    ///
    /// Returns `true` if any action was performed.
    pub fn run_actions(&mut self) -> bool {
        let mut handled = false;
        let mut actions = take(&mut self.actions_buffer);
        while Globals::swap_vec(|g| &mut g.actions, &mut actions) {
            for action in actions.drain(..) {
                action.call(self.ac());
                handled = true;
            }
        }
        self.actions_buffer = actions;
        handled
    }

    /// Perform scheduled tasks.
    ///
    /// Returns `true` if any task was performed.
    pub fn run_tasks(&mut self) -> bool {
        self.apply_notify();
        let mut tasks = take(&mut self.tasks_buffer);
        Globals::swap_vec(|g| &mut g.tasks, &mut tasks);
        let handled = !tasks.is_empty();
        for task in tasks.drain(..) {
            task.run(&mut self.uc());
        }
        self.tasks_buffer = tasks;
        handled
    }

    /// Fire every timer whose deadline is at or before `now`.
    ///
    /// Returns `true` if any timer fired.
    pub fn run_timers(&mut self, now: Instant) -> bool {
        let due = timer::take_due(now);
        let handled = !due.is_empty();
        for f in due {
            f(self.ac());
        }
        handled
    }

    fn apply_unbind(&mut self) -> bool {
        let mut handled = false;
        let mut unbinds = take(&mut self.unbinds_buffer);
        while Globals::swap_vec(|g| &mut g.unbinds, &mut unbinds) {
            for unbind in unbinds.drain(..) {
                for sb in unbind {
                    sb.unbind(&mut self.uc());
                }
                handled = true;
            }
        }
        self.unbinds_buffer = unbinds;
        handled
    }
    fn apply_notify(&mut self) -> bool {
        let mut handled = self.apply_unbind();
        let mut notifys = take(&mut self.notifys_buffer);
        while Globals::swap_vec(|g| &mut g.notifys, &mut notifys) {
            for notify in notifys.drain(..) {
                notify.call_notify(self.nc());
                handled = true;
            }
        }
        self.notifys_buffer = notifys;
        handled
    }

    /// Repeat [`run_actions`](Self::run_actions) and [`run_tasks`](Self::run_tasks)
    /// until there are no more processes to do. Timers are not consulted;
    /// use [`update_at`](Self::update_at) to also fire due timers.
    pub fn update(&mut self) {
        loop {
            if self.run_actions() {
                continue;
            }
            if self.run_tasks() {
                continue;
            }
            break;
        }
    }

    /// Like [`update`](Self::update), but additionally fires every timer
    /// whose deadline is at or before `now`.
    pub fn update_at(&mut self, now: Instant) {
        loop {
            if self.run_actions() {
                continue;
            }
            if self.run_tasks() {
                continue;
            }
            if self.run_timers(now) {
                continue;
            }
            break;
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        Globals::with(|g| g.finish_runtime());
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Slot(pub usize);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BindKey(usize);

pub(crate) struct SourceBinding {
    source: Rc<dyn BindSource>,
    slot: Slot,
    key: BindKey,
}
impl SourceBinding {
    fn is_same(&self, node: &Rc<dyn BindSource>, slot: Slot) -> bool {
        Rc::ptr_eq(&self.source, node) && self.slot == slot
    }
    fn unbind(self, uc: &mut UpdateContext) {
        self.source.unbind(self.slot, self.key, uc);
    }
}

/// Dependencies of one sink, in the order they were observed.
#[derive(Default)]
pub struct SourceBindings(Vec<SourceBinding>);

impl SourceBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-evaluate `f`, diffing the dependencies it observes against the
    /// previous evaluation: a source re-observed at the same position is
    /// reused, everything else is unbound after the new set is in place.
    pub fn update<T>(
        &mut self,
        sink: Weak<dyn BindSink>,
        slot: Slot,
        f: impl FnOnce(&mut SignalContext) -> T,
        uc: &mut UpdateContext,
    ) -> T {
        let mut sink = Sink {
            sink,
            slot,
            sources: take(self),
            sources_len: 0,
        };
        let mut sc = SignalContext {
            sink: Some(&mut sink),
        };
        let ret = f(&mut sc);
        drop(sc);
        *self = sink.sources;
        for b in self.0.drain(sink.sources_len..) {
            b.unbind(uc);
        }
        ret
    }
    pub fn clear(&mut self, uc: &mut UpdateContext) {
        for b in self.0.drain(..) {
            b.unbind(uc)
        }
    }
}
impl Drop for SourceBindings {
    fn drop(&mut self) {
        if !self.0.is_empty() {
            let _ = Globals::try_with(|g| g.unbinds.push(take(&mut self.0)));
        }
    }
}

struct SinkBinding {
    sink: Weak<dyn BindSink>,
    slot: Slot,
    dirty: bool,
}

impl SinkBinding {
    fn notify(&self, nc: &mut NotifyContext) {
        if let Some(node) = self.sink.upgrade() {
            node.notify(self.slot, nc)
        }
    }
}

/// Sinks observing one source.
#[derive(Default)]
pub struct SinkBindings(SlabMap<SinkBinding>);

impl SinkBindings {
    pub fn new() -> Self {
        Self(SlabMap::new())
    }

    /// Add the sink currently being evaluated in `sc` as an observer of `this`.
    ///
    /// If the sink observed `this` through the same slot in its previous
    /// evaluation, the existing binding is reused instead of a new one being
    /// inserted, so a dependency is never attached twice for the same identity.
    pub fn bind(&mut self, this: Rc<dyn BindSource>, this_slot: Slot, sc: &mut SignalContext) {
        let Some(sink) = &mut sc.sink else {
            return;
        };
        let sources_index = sink.sources_len;
        if let Some(source_old) = sink.sources.0.get(sources_index) {
            if source_old.is_same(&this, this_slot) {
                sink.sources_len += 1;
                self.0[source_old.key.0].dirty = false;
                return;
            }
        }
        let key = BindKey(self.0.insert(SinkBinding {
            sink: sink.sink.clone(),
            slot: sink.slot,
            dirty: false,
        }));
        if let Some(old) = sink.push(SourceBinding {
            source: this,
            slot: this_slot,
            key,
        }) {
            old.unbind(sc.uc());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unbinds the dependency identified by the given `key`.
    pub fn unbind(&mut self, key: BindKey, _uc: &mut UpdateContext) {
        self.0.remove(key.0);
    }

    /// Notify every observer that is not already pending re-evaluation.
    pub fn notify(&mut self, nc: &mut NotifyContext) {
        self.0.optimize();
        for binding in self.0.values_mut() {
            if !binding.dirty {
                binding.notify(nc);
            }
            binding.dirty = true;
        }
    }
}

struct Sink {
    sink: Weak<dyn BindSink>,
    slot: Slot,
    sources: SourceBindings,
    sources_len: usize,
}
impl Sink {
    #[must_use]
    fn push(&mut self, binding: SourceBinding) -> Option<SourceBinding> {
        let index = self.sources_len;
        self.sources_len += 1;
        if index < self.sources.0.len() {
            Some(replace(&mut self.sources.0[index], binding))
        } else {
            self.sources.0.push(binding);
            None
        }
    }
}

/// Tracks the sources observed by one sink and whether any of them changed
/// since the sink last ran.
pub struct SourceBinder {
    sources: SourceBindings,
    dirty: bool,
    sink: Weak<dyn BindSink>,
    slot: Slot,
}
impl SourceBinder {
    pub fn new(sink: &Weak<impl BindSink>, slot: Slot) -> Self {
        Self {
            sources: SourceBindings::new(),
            dirty: true,
            sink: sink.clone(),
            slot,
        }
    }
    pub fn is_clean(&self) -> bool {
        !self.dirty
    }
    pub fn check(&mut self, _uc: &mut UpdateContext) -> bool {
        self.dirty
    }
    pub fn update<T>(
        &mut self,
        f: impl FnOnce(&mut SignalContext) -> T,
        uc: &mut UpdateContext,
    ) -> T {
        self.dirty = false;
        self.sources.update(self.sink.clone(), self.slot, f, uc)
    }
    pub fn clear(&mut self, uc: &mut UpdateContext) {
        self.sources.clear(uc);
        self.dirty = true;
    }
    /// Returns `true` if the sink needs to be scheduled.
    pub fn on_notify(&mut self, slot: Slot) -> bool {
        let mut need_schedule = false;
        if slot == self.slot {
            need_schedule = !self.dirty;
            self.dirty = true;
        }
        need_schedule
    }
}

/// Context for updating sinks.
#[repr(transparent)]
pub struct UpdateContext<'s>(SignalContext<'s>);

impl<'s> UpdateContext<'s> {
    fn new<'a>(sc: &'a mut SignalContext<'s>) -> &'a mut Self {
        unsafe { transmute(sc) }
    }
}

/// Context for state invalidation notification.
#[repr(transparent)]
pub struct NotifyContext(ActionContext);

impl NotifyContext {
    fn new(ac: &mut ActionContext) -> &mut Self {
        unsafe { transmute(ac) }
    }
}

/// Schedules state invalidation notifications.
///
/// If [`NotifyContext`] is available, this function should not be called and
/// update notification should be done directly.
pub fn schedule_notify(node: Weak<dyn BindSink>, slot: Slot) {
    let _ = Globals::try_with(|g| g.push_notify(node, slot));
}

/// Context for retrieving state and tracking dependencies.
pub struct SignalContext<'s> {
    sink: Option<&'s mut Sink>,
}

impl<'s> SignalContext<'s> {
    pub fn uc(&mut self) -> &mut UpdateContext<'s> {
        UpdateContext::new(self)
    }

    /// Call a function with a [`SignalContext`] that does not track dependencies.
    pub fn untrack<T>(&mut self, f: impl FnOnce(&mut SignalContext<'s>) -> T) -> T {
        struct UntrackGuard<'s, 'a> {
            sc: &'a mut SignalContext<'s>,
            sink: Option<&'s mut Sink>,
        }
        impl Drop for UntrackGuard<'_, '_> {
            fn drop(&mut self) {
                self.sc.sink = self.sink.take();
            }
        }
        f(UntrackGuard {
            sink: self.sink.take(),
            sc: self,
        }
        .sc)
    }
}

pub trait BindSink: 'static {
    fn notify(self: Rc<Self>, slot: Slot, nc: &mut NotifyContext);
}

pub trait BindSource: 'static {
    fn unbind(self: Rc<Self>, slot: Slot, key: BindKey, uc: &mut UpdateContext);
}

struct NotifyTask {
    sink: Weak<dyn BindSink>,
    slot: Slot,
}
impl NotifyTask {
    fn call_notify(&self, nc: &mut NotifyContext) {
        if let Some(sink) = self.sink.upgrade() {
            sink.notify(self.slot, nc)
        }
    }
}

/// Context for changing state.
#[repr(transparent)]
pub struct ActionContext(Runtime);

impl ActionContext {
    fn new(rt: &mut Runtime) -> &mut Self {
        unsafe { transmute(rt) }
    }
    pub fn nc(&mut self) -> &mut NotifyContext {
        NotifyContext::new(self)
    }
    pub fn sc(&mut self) -> SignalContext<'_> {
        self.0.sc()
    }
}

/// Spawns a new action.
///
/// Actions are performed when [`Runtime::run_actions`] is called. Platform
/// event handlers use this to reflect an observation into state from outside
/// the runtime.
pub fn spawn_action(f: impl FnOnce(&mut ActionContext) + 'static) {
    Action(Box::new(f)).schedule()
}

struct Action(Box<dyn FnOnce(&mut ActionContext)>);

impl Action {
    fn call(self, ac: &mut ActionContext) {
        (self.0)(ac)
    }
    fn schedule(self) {
        let _ = Globals::try_with(|g| g.push_action(self));
    }
}

pub struct Task(RawTask);

impl Task {
    pub fn new(f: impl FnOnce(&mut UpdateContext) + 'static) -> Self {
        Task(RawTask::Box(Box::new(f)))
    }
    pub fn from_weak_fn<T: Any>(
        this: Weak<T>,
        f: impl Fn(Rc<T>, &mut UpdateContext) + Copy + 'static,
    ) -> Self {
        Task(RawTask::Weak {
            this,
            f: Box::new(move |this, uc| {
                if let Some(this) = this.upgrade() {
                    f(this.downcast().unwrap(), uc)
                }
            }),
        })
    }

    pub fn schedule(self) {
        let _ = Globals::try_with(|g| g.tasks.push(self));
    }
    fn run(self, uc: &mut UpdateContext) {
        match self.0 {
            RawTask::Box(f) => f(uc),
            RawTask::Weak { this, f } => f(this, uc),
        }
    }
}

enum RawTask {
    Box(Box<dyn FnOnce(&mut UpdateContext)>),
    Weak {
        this: Weak<dyn Any>,
        #[allow(clippy::type_complexity)]
        f: Box<dyn Fn(Weak<dyn Any>, &mut UpdateContext)>,
    },
}

/// Shared reference to a value obtained from a [`State`](crate::State).
pub struct StateRef<'a, T: ?Sized>(Ref<'a, T>);

impl<'a, T: ?Sized> StateRef<'a, T> {
    pub fn map<U: ?Sized>(this: Self, f: impl FnOnce(&T) -> &U) -> StateRef<'a, U> {
        StateRef(Ref::map(this.0, f))
    }
}
impl<'a, T: ?Sized> From<Ref<'a, T>> for StateRef<'a, T> {
    fn from(value: Ref<'a, T>) -> Self {
        Self(value)
    }
}
impl<T: ?Sized> Deref for StateRef<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
