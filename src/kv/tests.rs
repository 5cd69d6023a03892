use std::rc::Rc;

use assert_call::{call, CallRecorder};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    core::Runtime,
    effect,
    platform::{
        memory::{MemoryDocument, MemoryStorage},
        CookieJar,
    },
    StoredValue,
};

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
struct Prefs {
    theme: String,
    page: u32,
}

fn prefs() -> Prefs {
    Prefs {
        theme: "dark".into(),
        page: 3,
    }
}

#[test]
fn storage_round_trip() {
    let mut rt = Runtime::new();
    let store = MemoryStorage::new();
    let v = StoredValue::<Prefs, _>::new(store, "prefs");

    assert_eq!(v.get(&mut rt.sc()), None);
    v.set(&prefs(), rt.ac());
    assert_eq!(v.get(&mut rt.sc()), Some(prefs()));
}

#[test]
fn cookie_round_trip() {
    let mut rt = Runtime::new();
    let doc = MemoryDocument::new();
    let v = StoredValue::<Prefs>::cookie(&doc, "prefs");

    assert_eq!(v.get(&mut rt.sc()), None);
    v.set(&prefs(), rt.ac());
    assert_eq!(v.get(&mut rt.sc()), Some(prefs()));
}

#[test]
fn cookie_wire_format() {
    let mut rt = Runtime::new();
    let doc = MemoryDocument::new();
    let v = StoredValue::<String>::cookie(&doc, "token");

    v.set(&"abc".to_string(), rt.ac());
    assert_eq!(doc.read(), r#"token="abc""#);

    v.remove(rt.ac());
    assert_eq!(doc.read(), "");
    assert_eq!(v.get(&mut rt.sc()), None);
}

#[test]
fn remove_then_get_is_none() {
    let mut rt = Runtime::new();
    let store = MemoryStorage::new();
    let v = StoredValue::<Prefs, _>::new(store, "prefs");

    v.set(&prefs(), rt.ac());
    v.remove(rt.ac());
    assert_eq!(v.get(&mut rt.sc()), None);
}

#[test]
fn entries_lists_exactly_what_was_set() {
    let mut rt = Runtime::new();
    let store = MemoryStorage::new();
    let a = StoredValue::<u32, _>::new(store.clone(), "a");
    let b = StoredValue::<u32, _>::new(store, "b");

    a.set(&1, rt.ac());
    b.set(&2, rt.ac());
    assert_eq!(
        a.entries(&mut rt.sc()),
        vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))]
    );
}

#[test]
fn cookie_entries_lists_the_jar() {
    let mut rt = Runtime::new();
    let doc = MemoryDocument::new();
    let a = StoredValue::<u32>::cookie(&doc, "a");
    let b = StoredValue::<u32>::cookie(&doc, "b");

    a.set(&1, rt.ac());
    b.set(&2, rt.ac());
    let mut entries = a.entries(&mut rt.sc());
    entries.sort_by(|x, y| x.0.cmp(&y.0));
    assert_eq!(
        entries,
        vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))]
    );
}

#[test]
fn undecodable_entry_is_skipped() {
    let mut rt = Runtime::new();
    let doc = MemoryDocument::new();
    doc.write("junk=not json");
    let v = StoredValue::<u32>::cookie(&doc, "a");

    v.set(&1, rt.ac());
    assert_eq!(
        v.entries(&mut rt.sc()),
        vec![("a".to_string(), json!(1))]
    );
}

#[test]
fn mutation_reruns_observers() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let store = MemoryStorage::new();
    let v = Rc::new(StoredValue::<u32, _>::new(store, "n"));

    let v0 = v.clone();
    let _e = effect(move |sc| call!("{:?}", v0.get(sc)));
    rt.update();
    cr.verify("None");

    v.set(&7, rt.ac());
    rt.update();
    cr.verify("Some(7)");

    v.remove(rt.ac());
    rt.update();
    cr.verify("None");
}

#[test]
fn quota_error_is_a_noop() {
    let mut rt = Runtime::new();
    let store = MemoryStorage::with_quota(8);
    let v = StoredValue::<String, _>::new(store, "k");

    v.set(&"ab".to_string(), rt.ac());
    assert_eq!(v.get(&mut rt.sc()), Some("ab".to_string()));

    // `"ab"` stores as five bytes; this one would not fit.
    v.set(&"a much longer value".to_string(), rt.ac());
    assert_eq!(v.get(&mut rt.sc()), Some("ab".to_string()));
}
