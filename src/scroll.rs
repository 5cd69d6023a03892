use std::{cell::RefCell, rc::Rc};

use parse_display::{Display, FromStr};

use crate::{
    core::{spawn_action, ActionContext},
    effect,
    platform::{DomEvent, EventTarget, ScrollArea, ScrollBehavior, ScrollMetrics},
    NodeRef, SignalContext, State, Subscription,
};


/// Scroll offset of a container, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollOffset {
    pub x: f64,
    pub y: f64,
}

/// An edge of the scrollable extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromStr)]
#[display(style = "lowercase")]
pub enum ScrollEdge {
    Top,
    Bottom,
    Left,
    Right,
}

/// Where to scroll: explicit coordinates or an edge resolved against the
/// container's current extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollTarget {
    At { x: f64, y: f64 },
    Edge(ScrollEdge),
}

/// Tracks the scroll position of a container.
///
/// While the container handle is bound, a scroll listener keeps the reported
/// offset and at-bottom flag current; binding a container also applies the
/// initial offset, if one was given, with a smooth scroll. When the handle
/// unbinds (or the tracker drops), the offset resets to `{0, 0}`, at-bottom
/// to `false`, and the listener is released.
///
/// At-bottom is exact: `scroll_height - scroll_top == client_height`.
pub struct ScrollTracker<A: ScrollArea + EventTarget + ?Sized> {
    container: NodeRef<A>,
    offset: State<ScrollOffset>,
    at_bottom: State<bool>,
    _binding: Subscription,
}

impl<A: ScrollArea + EventTarget + ?Sized> ScrollTracker<A> {
    pub fn new(initial: Option<ScrollOffset>) -> Self {
        let container = NodeRef::<A>::new();
        let offset = State::new(ScrollOffset::default());
        let at_bottom = State::new(false);
        let guard: RefCell<Option<Subscription>> = RefCell::new(None);
        let binding = {
            let container = container.clone();
            let offset = offset.clone();
            let at_bottom = at_bottom.clone();
            effect(move |sc| match container.get(sc) {
                Some(element) => {
                    let handler = {
                        let element = Rc::downgrade(&element);
                        let offset = offset.clone();
                        let at_bottom = at_bottom.clone();
                        Rc::new(move |_: &DomEvent| {
                            let Some(element) = element.upgrade() else {
                                return;
                            };
                            let metrics = element.scroll_metrics();
                            let offset = offset.clone();
                            let at_bottom = at_bottom.clone();
                            spawn_action(move |ac| {
                                offset.set_dedup(
                                    ScrollOffset {
                                        x: metrics.scroll_left,
                                        y: metrics.scroll_top,
                                    },
                                    ac,
                                );
                                at_bottom.set_dedup(is_at_bottom(&metrics), ac);
                            });
                        })
                    };
                    // Release before re-acquiring, as with any identity change.
                    guard.borrow_mut().take();
                    *guard.borrow_mut() = Some(element.add_listener("scroll", handler));
                    if let Some(initial) = initial {
                        element.scroll_to(initial.x, initial.y, ScrollBehavior::Smooth);
                    }
                }
                None => {
                    guard.borrow_mut().take();
                    let offset = offset.clone();
                    let at_bottom = at_bottom.clone();
                    spawn_action(move |ac| {
                        offset.set_dedup(ScrollOffset::default(), ac);
                        at_bottom.set_dedup(false, ac);
                    });
                }
            })
        };
        Self {
            container,
            offset,
            at_bottom,
            _binding: binding,
        }
    }

    /// The container handle to bind to the scrollable element.
    pub fn container(&self) -> &NodeRef<A> {
        &self.container
    }

    pub fn offset(&self, sc: &mut SignalContext) -> ScrollOffset {
        self.offset.get(sc)
    }

    pub fn is_at_bottom(&self, sc: &mut SignalContext) -> bool {
        self.at_bottom.get(sc)
    }

    /// Smooth-scroll the container to `target`. No-op while unbound.
    pub fn scroll_to(&self, target: ScrollTarget, ac: &mut ActionContext) {
        let element = self.container.get(&mut ac.sc());
        let Some(element) = element else {
            return;
        };
        let m = element.scroll_metrics();
        let (x, y) = match target {
            ScrollTarget::At { x, y } => (x, y),
            ScrollTarget::Edge(ScrollEdge::Top) => (m.scroll_left, 0.0),
            ScrollTarget::Edge(ScrollEdge::Bottom) => {
                (m.scroll_left, (m.scroll_height - m.client_height).max(0.0))
            }
            ScrollTarget::Edge(ScrollEdge::Left) => (0.0, m.scroll_top),
            ScrollTarget::Edge(ScrollEdge::Right) => {
                ((m.scroll_width - m.client_width).max(0.0), m.scroll_top)
            }
        };
        element.scroll_to(x, y, ScrollBehavior::Smooth);
    }
}

fn is_at_bottom(m: &ScrollMetrics) -> bool {
    m.scroll_height - m.scroll_top == m.client_height
}
