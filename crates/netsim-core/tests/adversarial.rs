//! Adversarial topology edits and edge cases.
//!
//! Each case should either return an error or be handled gracefully without
//! panics or leaked package identities.

use netsim_core::factory::{Factory, FactoryError, NodeKind, PackageLocation};
use netsim_core::id::{ElementId, PackageId, SenderId};
use netsim_core::node::{Ramp, Worker};
use netsim_core::storage::QueueKind;
use netsim_core::test_utils::*;
use netsim_core::validation::{InconsistencyReason, check_consistency};

/// A worker routing only to itself recirculates its packages forever.
#[test]
fn self_loop_worker_recirculates_without_panicking() {
    let mut factory = self_loop_factory();
    assert!(!factory.is_consistent());

    run_ticks(&mut factory, 1, 20);
    assert_eq!(factory.delivered_count(), 0);
    assert_eq!(factory.package_ids().live_count(), 20);
}

#[test]
fn self_loop_beside_storehouse_edge_is_consistent() {
    let mut factory = self_loop_factory();
    connect(&mut factory, worker_id(1), to_store(1));
    assert!(factory.is_consistent());
}

/// Two workers feeding each other with no exit.
#[test]
fn closed_worker_cycle_is_inconsistent() {
    let mut factory = Factory::new();
    add_ramp(&mut factory, 1, 1);
    add_worker(&mut factory, 1, 1, QueueKind::Fifo);
    add_worker(&mut factory, 2, 1, QueueKind::Fifo);
    add_storehouse(&mut factory, 1);
    connect(&mut factory, ramp_id(1), to_worker(1));
    connect(&mut factory, worker_id(1), to_worker(2));
    connect(&mut factory, worker_id(2), to_worker(1));

    let err = check_consistency(&factory).unwrap_err();
    assert_eq!(err.sender, worker_id(2));
    assert_eq!(err.reason, InconsistencyReason::NoQualifyingReceiver);
}

#[test]
fn duplicate_link_is_a_no_op() {
    let mut factory = line_factory();
    assert!(!factory.link(ramp_id(1), to_worker(1)).unwrap());
    let prefs = &factory.sender(ramp_id(1)).unwrap().receiver_preferences;
    assert_eq!(prefs.len(), 1);
    assert_eq!(prefs.probability(to_worker(1)), Some(1.0));
}

#[test]
fn linking_to_missing_nodes_fails() {
    let mut factory = line_factory();
    assert_eq!(
        factory.link(ramp_id(1), to_store(9)),
        Err(FactoryError::UnknownIdentity {
            kind: NodeKind::Storehouse,
            id: ElementId(9),
        })
    );
    assert_eq!(
        factory.link(worker_id(9), to_store(1)),
        Err(FactoryError::UnknownIdentity {
            kind: NodeKind::Worker,
            id: ElementId(9),
        })
    );
    assert_eq!(factory.unlink(ramp_id(1), to_worker(2)), Ok(false));
}

#[test]
fn zero_intervals_are_rejected() {
    let mut factory = Factory::new();
    assert!(matches!(
        factory.add_ramp(Ramp::new(1, 0)),
        Err(FactoryError::InvalidInterval {
            kind: NodeKind::Ramp,
            ..
        })
    ));
    assert!(matches!(
        factory.add_worker(Worker::new(1, 0, QueueKind::Fifo)),
        Err(FactoryError::InvalidInterval {
            kind: NodeKind::Worker,
            ..
        })
    ));
    assert!(factory.ramps().is_empty());
    assert!(factory.workers().is_empty());
}

/// Removing a worker mid-run prunes every edge to it and frees whatever it
/// held, leaving the rest of the network running.
#[test]
fn removing_worker_mid_run() {
    let mut factory = Factory::new();
    add_ramp(&mut factory, 1, 1);
    add_worker(&mut factory, 1, 4, QueueKind::Fifo);
    add_storehouse(&mut factory, 1);
    connect(&mut factory, ramp_id(1), to_worker(1));
    connect(&mut factory, ramp_id(1), to_store(1));
    connect(&mut factory, worker_id(1), to_store(1));
    run_ticks(&mut factory, 1, 10);

    let held_by_worker = factory.package_ids().live_count() - factory.delivered_count();
    let removed = factory.remove_worker(1).unwrap();
    assert_eq!(removed.queue().len() + usize::from(removed.current().is_some()), 0);
    assert_eq!(
        factory.package_ids().live_count(),
        factory.delivered_count()
    );
    assert_eq!(factory.package_ids().freed().count(), held_by_worker);

    let prefs = &factory.sender(ramp_id(1)).unwrap().receiver_preferences;
    assert!(!prefs.contains(to_worker(1)));
    assert_eq!(prefs.probability(to_store(1)), Some(1.0));

    let before = factory.delivered_count();
    run_ticks(&mut factory, 11, 15);
    assert_eq!(factory.delivered_count(), before + 5);
}

#[test]
fn removing_storehouse_breaks_consistency() {
    let mut factory = line_factory();
    factory.remove_storehouse(1).unwrap();
    let err = check_consistency(&factory).unwrap_err();
    assert_eq!(err.sender, worker_id(1));
    assert_eq!(err.reason, InconsistencyReason::NoReceivers);
}

#[test]
fn removing_unknown_node_fails() {
    let mut factory = line_factory();
    assert!(matches!(
        factory.remove_ramp(7),
        Err(FactoryError::UnknownIdentity {
            kind: NodeKind::Ramp,
            ..
        })
    ));
    assert!(factory.remove_worker(7).is_err());
    assert!(factory.remove_storehouse(7).is_err());
}

/// A failed dispatch leaves the worker's finished package in its slot, and
/// later completions wait behind it instead of overwriting it.
#[test]
fn blocked_worker_holds_finished_packages() {
    let mut factory = Factory::new();
    add_ramp(&mut factory, 1, 1);
    add_worker(&mut factory, 1, 1, QueueKind::Fifo);
    connect(&mut factory, ramp_id(1), to_worker(1));

    factory.tick(1).unwrap();
    let err = factory.tick(2).unwrap_err();
    assert!(matches!(err, FactoryError::Routing { sender: SenderId::Worker(_), .. }));

    let _ = factory.tick(3);
    assert_eq!(
        factory.locate_package(PackageId(1)),
        Some(PackageLocation::Outbound(worker_id(1)))
    );
    assert_eq!(
        factory.locate_package(PackageId(2)),
        Some(PackageLocation::Processing(ElementId(1)))
    );

    add_storehouse(&mut factory, 1);
    connect(&mut factory, worker_id(1), to_store(1));
    factory.tick(4).unwrap();
    assert_eq!(stored_ids(&factory, 1), vec![1]);
    assert_eq!(
        factory.locate_package(PackageId(2)),
        Some(PackageLocation::Processing(ElementId(1)))
    );
    factory.tick(5).unwrap();
    assert_eq!(stored_ids(&factory, 1), vec![1, 2]);
}

#[test]
fn empty_factory_ticks_and_is_consistent() {
    let mut factory = Factory::new();
    assert!(factory.is_consistent());
    run_ticks(&mut factory, 1, 5);
    assert_eq!(factory.package_ids().live_count(), 0);
}

#[test]
fn unreachable_broken_worker_is_ignored() {
    let mut factory = line_factory();
    add_worker(&mut factory, 2, 1, QueueKind::Fifo);
    assert!(factory.sender(worker_id(2)).unwrap().receiver_preferences.is_empty());
    assert!(factory.is_consistent());
}
