use std::rc::Rc;

use assert_call::{call, CallRecorder};

use crate::{
    bind_event,
    core::Runtime,
    platform::{
        memory::{MemoryDocument, MemoryElement},
        DomEvent,
    },
    NodeRef,
};

#[test]
fn attaches_to_every_bound_target() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let doc = MemoryDocument::new();
    let e1 = doc.create_element();
    let e2 = doc.create_element();
    let r1 = NodeRef::<MemoryElement>::new();
    let r2 = NodeRef::<MemoryElement>::new();
    r1.bind(e1.clone(), rt.ac());
    r2.bind(e2.clone(), rt.ac());

    let _s = bind_event(
        &[r1, r2],
        "click",
        Rc::new(|ev: &DomEvent| call!("click {}", ev.target.0)),
    );
    e1.emit("click");
    cr.verify(()); // not yet attached; the binding takes effect on update

    rt.update();
    e1.emit("click");
    e2.emit("click");
    cr.verify(["click 0", "click 1"]);
}

#[test]
fn unbound_targets_are_skipped() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let doc = MemoryDocument::new();
    let e1 = doc.create_element();
    let r1 = NodeRef::<MemoryElement>::new();
    let r2 = NodeRef::<MemoryElement>::new();
    r1.bind(e1.clone(), rt.ac());

    let _s = bind_event(&[r1, r2], "click", Rc::new(|_| call!("click")));
    rt.update();

    e1.emit("click");
    cr.verify("click");
}

#[test]
fn other_events_are_ignored() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let doc = MemoryDocument::new();
    let e1 = doc.create_element();
    let r1 = NodeRef::<MemoryElement>::new();
    r1.bind(e1.clone(), rt.ac());

    let _s = bind_event(&[r1], "click", Rc::new(|_| call!("click")));
    rt.update();

    e1.emit("change");
    cr.verify(());
}

#[test]
fn rebinds_when_a_target_changes_identity() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let doc = MemoryDocument::new();
    let e1 = doc.create_element();
    let e2 = doc.create_element();
    let r = NodeRef::<MemoryElement>::new();
    r.bind(e1.clone(), rt.ac());

    let _s = bind_event(&[r.clone()], "click", Rc::new(|_| call!("click")));
    rt.update();

    r.bind(e2.clone(), rt.ac());
    rt.update();

    e1.emit("click");
    cr.verify(());
    e2.emit("click");
    cr.verify("click");
}

#[test]
fn binding_the_same_element_again_keeps_one_listener() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let doc = MemoryDocument::new();
    let e1 = doc.create_element();
    let r = NodeRef::<MemoryElement>::new();
    r.bind(e1.clone(), rt.ac());

    let _s = bind_event(&[r.clone()], "click", Rc::new(|_| call!("click")));
    rt.update();

    r.bind(e1.clone(), rt.ac());
    rt.update();

    e1.emit("click");
    cr.verify("click");
}

#[test]
fn drop_detaches_everything() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let doc = MemoryDocument::new();
    let e1 = doc.create_element();
    let r = NodeRef::<MemoryElement>::new();
    r.bind(e1.clone(), rt.ac());

    let s = bind_event(&[r], "click", Rc::new(|_| call!("click")));
    rt.update();
    e1.emit("click");
    cr.verify("click");

    drop(s);
    e1.emit("click");
    cr.verify(());
}
