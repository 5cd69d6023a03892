use std::time::{Duration, Instant};

use crate::{core::Runtime, platform::memory::MemoryConnectivity, OnlineWatcher, RECONNECT_WINDOW};

#[test]
fn initial_status_is_read_synchronously() {
    let mut rt = Runtime::new();
    let host = MemoryConnectivity::new(Some(true));
    let w = OnlineWatcher::new(&host);

    assert_eq!(w.is_online(&mut rt.sc()), Some(true));
    assert!(!w.is_determining(&mut rt.sc()));
    assert_eq!(w.last_disconnect(&mut rt.sc()), None);
    assert!(!w.just_reconnected(&mut rt.sc()));
}

#[test]
fn unknown_where_the_flag_cannot_be_read() {
    let mut rt = Runtime::new();
    let host = MemoryConnectivity::new(None);
    let w = OnlineWatcher::new(&host);

    assert_eq!(w.is_online(&mut rt.sc()), None);
    assert!(w.is_determining(&mut rt.sc()));
}

#[test]
fn offline_event_records_the_transition() {
    let mut rt = Runtime::new();
    let host = MemoryConnectivity::new(Some(true));
    let w = OnlineWatcher::new(&host);

    host.set_online(false);
    rt.update();
    assert_eq!(w.is_online(&mut rt.sc()), Some(false));
    assert!(w.last_disconnect(&mut rt.sc()).is_some());
    assert!(!w.just_reconnected(&mut rt.sc()));
}

#[test]
fn reconnect_flag_clears_after_the_window() {
    let mut rt = Runtime::new();
    let host = MemoryConnectivity::new(Some(true));
    let w = OnlineWatcher::new(&host);

    let before_offline = Instant::now();
    host.set_online(false);
    host.set_online(true);
    rt.update();
    let after_online = Instant::now();
    assert_eq!(w.is_online(&mut rt.sc()), Some(true));
    assert!(w.just_reconnected(&mut rt.sc()));

    // The deadline is no earlier than the moment the offline event fired.
    rt.update_at(before_offline + RECONNECT_WINDOW - Duration::from_millis(1));
    assert!(w.just_reconnected(&mut rt.sc()));

    rt.update_at(after_online + RECONNECT_WINDOW);
    assert!(!w.just_reconnected(&mut rt.sc()));
}

#[test]
fn reentering_online_rearms_the_window() {
    let mut rt = Runtime::new();
    let host = MemoryConnectivity::new(Some(true));
    let w = OnlineWatcher::new(&host);

    host.set_online(false);
    host.set_online(true);
    rt.update();

    host.set_online(false);
    let before_second_online = Instant::now();
    host.set_online(true);
    rt.update();
    let after_second_online = Instant::now();

    // Only the re-armed timer is live, and it has a full window left.
    rt.update_at(before_second_online + RECONNECT_WINDOW - Duration::from_millis(1));
    assert!(w.just_reconnected(&mut rt.sc()));

    rt.update_at(after_second_online + RECONNECT_WINDOW);
    assert!(!w.just_reconnected(&mut rt.sc()));
}

#[test]
fn drop_cancels_the_pending_clear() {
    let mut rt = Runtime::new();
    let host = MemoryConnectivity::new(Some(true));
    let w = OnlineWatcher::new(&host);

    host.set_online(false);
    host.set_online(true);
    rt.update();
    drop(w);

    // The watcher is gone; firing the stale deadline must not panic.
    rt.update_at(Instant::now() + RECONNECT_WINDOW * 2);
}

#[test]
fn events_after_drop_are_not_observed() {
    let mut rt = Runtime::new();
    let host = MemoryConnectivity::new(Some(true));
    let w = OnlineWatcher::new(&host);
    drop(w);

    host.set_online(false);
    rt.update();
}
