use std::rc::Rc;

use assert_call::{call, CallRecorder};

use super::Subscription;
use crate::test_helpers::call_on_drop;

#[test]
fn empty_is_noop() {
    let mut cr = CallRecorder::new();
    drop(Subscription::empty());
    cr.verify(());
}

#[test]
fn from_fn_calls_on_drop() {
    let mut cr = CallRecorder::new();
    {
        let _s = Subscription::from_fn(|| call!("drop"));
    }
    cr.verify("drop");
}

#[test]
fn from_rc_keeps_payload_alive_until_drop() {
    let mut cr = CallRecorder::new();
    let s = Subscription::from_rc(Rc::new(call_on_drop("payload")));
    cr.verify(());
    drop(s);
    cr.verify("payload");
}
