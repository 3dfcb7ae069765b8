use std::cell::RefCell;
use std::rc::Rc;
use std::thread;

use crossbeam::channel::unbounded;

use tabsync::store::{BroadcastStore, StorageEvent};
use tabsync::sync::{derive_key, publish, subscribe, MessageKind};
use tabsync::{BroadcastHub, SharedStore, SyncError};

fn recording_subscriber(
    store: &SharedStore,
    channel: &str,
    kind: MessageKind,
) -> (tabsync::sync::Subscription, Rc<RefCell<Vec<String>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let sub = subscribe(store, channel, kind, move |value: String| {
        sink.borrow_mut().push(value);
        Ok(())
    });
    (sub, seen)
}

#[test]
fn same_payload_twice_notifies_twice() {
    let hub = BroadcastHub::new();
    let a = hub.connect();
    let b = Rc::new(hub.connect());
    let b_shared: SharedStore = b.clone();
    let (_sub, seen) = recording_subscriber(&b_shared, "shared", MessageKind::DataUpdate);

    publish(&a, "shared", MessageKind::DataUpdate, "same").unwrap();
    publish(&a, "shared", MessageKind::DataUpdate, "same").unwrap();
    b.dispatch_pending();

    assert_eq!(*seen.borrow(), vec!["same".to_string(), "same".to_string()]);
}

#[test]
fn removals_are_never_delivered() {
    let hub = BroadcastHub::new();
    let a = hub.connect();
    let b = Rc::new(hub.connect());
    let b_shared: SharedStore = b.clone();

    let raw_events = Rc::new(RefCell::new(Vec::<StorageEvent>::new()));
    let raw_sink = raw_events.clone();
    b.add_listener(Rc::new(move |event: &StorageEvent| -> Result<(), SyncError> {
        raw_sink.borrow_mut().push(event.clone());
        Ok(())
    }));
    let (_sub, seen) = recording_subscriber(&b_shared, "shared", MessageKind::DataForInit);

    publish(&a, "shared", MessageKind::DataForInit, "v").unwrap();
    let report = b.dispatch_pending();

    // The store raised both halves; the subscriber only saw the write
    assert_eq!(report.events, 2);
    assert_eq!(raw_events.borrow().len(), 2);
    assert!(raw_events.borrow()[1].is_removal());
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn publisher_does_not_hear_itself() {
    let hub = BroadcastHub::new();
    let a = Rc::new(hub.connect());
    let a_shared: SharedStore = a.clone();
    let (_sub, seen) = recording_subscriber(&a_shared, "shared", MessageKind::DataUpdate);

    publish(a_shared.as_ref(), "shared", MessageKind::DataUpdate, "mine").unwrap();

    assert_eq!(a.pending(), 0);
    assert!(seen.borrow().is_empty());
    assert_eq!(a.get_item(&derive_key("shared", MessageKind::DataUpdate)), None);
}

#[test]
fn participants_on_separate_threads() {
    let hub = BroadcastHub::new();
    let (ready_tx, ready_rx) = unbounded();
    let (done_tx, done_rx) = unbounded::<()>();

    let listener_hub = hub.clone();
    let listener = thread::spawn(move || {
        let store = Rc::new(listener_hub.connect());
        let shared: SharedStore = store.clone();
        let (_sub, seen) = recording_subscriber(&shared, "shared", MessageKind::DataUpdate);
        ready_tx.send(()).unwrap();

        done_rx.recv().unwrap();
        store.dispatch_pending();
        let values = seen.borrow().clone();
        values
    });

    ready_rx.recv().unwrap();
    let writer = hub.connect();
    for value in ["a", "b", "c"] {
        publish(&writer, "shared", MessageKind::DataUpdate, value).unwrap();
    }
    done_tx.send(()).unwrap();

    let values = listener.join().unwrap();
    assert_eq!(values, vec!["a", "b", "c"]);
}
