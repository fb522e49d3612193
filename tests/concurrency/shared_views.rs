//! Lazy views read from many threads at once.
//!
//! A materialized view is immutable shared state: concurrent reads must
//! agree on values, and the nested-child memoization must hand every reader
//! the same child instance, materialized exactly once.

use crate::common::*;
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;

fn summary_projector() -> Projector {
    let projector = projector();
    let address_view = ShapeBuilder::new("AddressView")
        .direct_field("city")
        .build()
        .unwrap();
    projector
        .describe("PersonSummary", |shape| {
            shape
                .direct_field("firstname")
                .computed("fullName", "fullname")
                .nested_field("address", address_view)
        })
        .unwrap();
    projector
}

#[test]
fn concurrent_reads_agree_on_every_accessor() {
    let projector = summary_projector();
    let view = Arc::new(projector.project("PersonSummary", &person()).unwrap());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let view = Arc::clone(&view);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                let first = view.get("firstname").unwrap();
                let full = view.get("fullName").unwrap();
                (first, full)
            })
        })
        .collect();

    for handle in handles {
        let (first, full) = handle.join().unwrap();
        assert_eq!(first, Value::from("Oliver"));
        assert_eq!(full, Value::from("Oliver Matthews"));
    }
}

#[test]
fn racing_nested_navigation_yields_one_child_instance() {
    let projector = summary_projector();
    let view = Arc::new(projector.project("PersonSummary", &person()).unwrap());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let view = Arc::clone(&view);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                let child = view.nested("address").unwrap().unwrap();
                assert_eq!(child.get("city").unwrap(), Value::from("Norwich"));
                child as *const MaterializedView as usize
            })
        })
        .collect();

    let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = addresses[0];
    assert!(addresses.iter().all(|&addr| addr == first));
}

#[test]
fn racing_navigation_materializes_an_eager_child_exactly_once() {
    let counting = CountingEvaluator::new(test_evaluator());
    let projector = Projector::new().with_evaluator(counting.clone());

    // The child is a value object with a computed accessor, so its one
    // evaluation happens inside the memoized child materialization
    let child = ShapeBuilder::new("FullNameDto")
        .computed("fullName", "fullname")
        .constructor(["fullName"])
        .build()
        .unwrap();
    projector
        .describe("Assignment", |shape| {
            shape.nested("assignee", "manager", child)
        })
        .unwrap();

    let manager = Record::new()
        .with("firstname", "Grace")
        .with("lastname", "Hopper");
    let record = Record::new().with("manager", manager);
    let view = Arc::new(projector.project("Assignment", &record).unwrap());

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let view = Arc::clone(&view);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                let child = view.nested("assignee").unwrap().unwrap();
                child.get("fullName").unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Value::from("Grace Hopper"));
    }
    assert_eq!(counting.calls(), 1);
}

#[test]
fn one_projector_serves_concurrent_projections() {
    let projector = Arc::new(summary_projector());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|thread_id| {
            let projector = Arc::clone(&projector);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                let record = person().with("firstname", format!("Worker{thread_id}"));
                let view = projector.project("PersonSummary", &record).unwrap();
                view.get("firstname").unwrap()
            })
        })
        .collect();

    for (thread_id, handle) in handles.into_iter().enumerate() {
        assert_eq!(
            handle.join().unwrap(),
            Value::from(format!("Worker{thread_id}"))
        );
    }
}
