//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::factory::Factory;
use crate::id::{ElementId, ReceiverId, SenderId};
use crate::node::{Ramp, Storehouse, Worker};
use crate::storage::QueueKind;

// ===========================================================================
// Handle shorthands
// ===========================================================================

pub fn ramp_id(id: u32) -> SenderId {
    SenderId::Ramp(ElementId(id))
}

pub fn worker_id(id: u32) -> SenderId {
    SenderId::Worker(ElementId(id))
}

pub fn to_worker(id: u32) -> ReceiverId {
    ReceiverId::worker(id)
}

pub fn to_store(id: u32) -> ReceiverId {
    ReceiverId::storehouse(id)
}

// ===========================================================================
// Node helpers
// ===========================================================================

pub fn add_ramp(factory: &mut Factory, id: u32, interval: u64) {
    factory
        .add_ramp(Ramp::new(id, interval))
        .expect("ramp identity should be free");
}

pub fn add_worker(factory: &mut Factory, id: u32, duration: u64, kind: QueueKind) {
    factory
        .add_worker(Worker::new(id, duration, kind))
        .expect("worker identity should be free");
}

pub fn add_storehouse(factory: &mut Factory, id: u32) {
    factory
        .add_storehouse(Storehouse::new(id))
        .expect("storehouse identity should be free");
}

pub fn connect(factory: &mut Factory, src: SenderId, dest: ReceiverId) {
    factory.link(src, dest).expect("both ends should exist");
}

/// Run ticks `from..=to`, panicking on dispatch failure.
pub fn run_ticks(factory: &mut Factory, from: u64, to: u64) {
    for t in from..=to {
        factory.tick(t).expect("tick should succeed");
    }
}

/// Package identities held by a storehouse, oldest first.
pub fn stored_ids(factory: &Factory, store: u32) -> Vec<u32> {
    use crate::node::PackageReceiver;
    factory
        .find_storehouse_by_id(store)
        .map(|s| s.stockpile().iter().map(|p| p.id().0).collect())
        .unwrap_or_default()
}

// ===========================================================================
// Factory builders (for benchmarks, stress tests, and proptests)
// ===========================================================================

/// Ramp 1 (interval 1) -> worker 1 (duration 1, FIFO) -> storehouse 1.
pub fn line_factory() -> Factory {
    let mut factory = Factory::new();
    add_ramp(&mut factory, 1, 1);
    add_worker(&mut factory, 1, 1, QueueKind::Fifo);
    add_storehouse(&mut factory, 1);
    connect(&mut factory, ramp_id(1), to_worker(1));
    connect(&mut factory, worker_id(1), to_store(1));
    factory
}

/// Ramp 1 -> worker 1, whose only edge loops back to itself. Storehouse 1
/// exists but is unreachable.
pub fn self_loop_factory() -> Factory {
    let mut factory = Factory::new();
    add_ramp(&mut factory, 1, 1);
    add_worker(&mut factory, 1, 1, QueueKind::Fifo);
    add_storehouse(&mut factory, 1);
    connect(&mut factory, ramp_id(1), to_worker(1));
    connect(&mut factory, worker_id(1), to_worker(1));
    factory
}

/// One ramp and one storehouse with no routing edges.
pub fn unlinked_factory() -> Factory {
    let mut factory = Factory::new();
    add_ramp(&mut factory, 1, 1);
    add_storehouse(&mut factory, 1);
    factory
}

/// Ramp -> worker 1 -> worker 2 -> ... -> worker N -> storehouse.
/// Deep network with one worker per hop.
pub fn build_chain_factory(length: usize) -> Factory {
    let mut factory = Factory::new();
    add_ramp(&mut factory, 1, 1);
    add_storehouse(&mut factory, 1);

    let mut prev = ramp_id(1);
    for i in 1..=length as u32 {
        add_worker(&mut factory, i, 2, QueueKind::Fifo);
        connect(&mut factory, prev, to_worker(i));
        prev = worker_id(i);
    }
    connect(&mut factory, prev, to_store(1));
    factory
}

/// One ramp fanning out to N workers, each routing to one of two
/// storehouses.
pub fn build_wide_factory(fan_out: usize) -> Factory {
    let mut factory = Factory::new();
    add_ramp(&mut factory, 1, 1);
    add_storehouse(&mut factory, 1);
    add_storehouse(&mut factory, 2);

    for i in 1..=fan_out as u32 {
        let kind = if i % 2 == 0 { QueueKind::Lifo } else { QueueKind::Fifo };
        add_worker(&mut factory, i, u64::from(i % 3 + 1), kind);
        connect(&mut factory, ramp_id(1), to_worker(i));
        connect(&mut factory, worker_id(i), to_store(1 + i % 2));
    }
    factory
}
