#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use netsim_core::factory::Factory;
use netsim_core::node::{Ramp, Storehouse, Worker};
use netsim_core::storage::QueueKind;
use netsim_core::test_utils::*;

/// A structured edit or tick applied to the factory.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    AddRamp { id: u8, interval: u8 },
    AddWorker { id: u8, duration: u8, lifo: bool },
    AddStorehouse { id: u8 },
    RemoveRamp { id: u8 },
    RemoveWorker { id: u8 },
    RemoveStorehouse { id: u8 },
    LinkToWorker { from_ramp: bool, from: u8, to: u8 },
    LinkToStore { from_ramp: bool, from: u8, to: u8 },
    Unlink { from_ramp: bool, from: u8, to: u8 },
    Tick,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    ops: Vec<FuzzOp>,
}

fn sender(from_ramp: bool, id: u8) -> netsim_core::id::SenderId {
    if from_ramp {
        ramp_id(u32::from(id))
    } else {
        worker_id(u32::from(id))
    }
}

fuzz_target!(|input: FuzzInput| {
    let mut factory = Factory::new();
    let mut turn = 0u64;

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(200);

    for op in &input.ops[..max_ops] {
        // Errors are expected (unknown ids, zero intervals, unroutable
        // packages); panics are not.
        match *op {
            FuzzOp::AddRamp { id, interval } => {
                let _ = factory.add_ramp(Ramp::new(u32::from(id), u64::from(interval)));
            }
            FuzzOp::AddWorker { id, duration, lifo } => {
                let kind = if lifo { QueueKind::Lifo } else { QueueKind::Fifo };
                let _ = factory.add_worker(Worker::new(u32::from(id), u64::from(duration), kind));
            }
            FuzzOp::AddStorehouse { id } => {
                let _ = factory.add_storehouse(Storehouse::new(u32::from(id)));
            }
            FuzzOp::RemoveRamp { id } => {
                let _ = factory.remove_ramp(u32::from(id));
            }
            FuzzOp::RemoveWorker { id } => {
                let _ = factory.remove_worker(u32::from(id));
            }
            FuzzOp::RemoveStorehouse { id } => {
                let _ = factory.remove_storehouse(u32::from(id));
            }
            FuzzOp::LinkToWorker { from_ramp, from, to } => {
                let _ = factory.link(sender(from_ramp, from), to_worker(u32::from(to)));
            }
            FuzzOp::LinkToStore { from_ramp, from, to } => {
                let _ = factory.link(sender(from_ramp, from), to_store(u32::from(to)));
            }
            FuzzOp::Unlink { from_ramp, from, to } => {
                let _ = factory.unlink(sender(from_ramp, from), to_worker(u32::from(to)));
            }
            FuzzOp::Tick => {
                turn += 1;
                let _ = factory.tick(turn);
            }
        }
        let _ = factory.is_consistent();
    }

    // Every live identity must be findable somewhere in the network or
    // retained by a storehouse.
    assert!(factory.package_ids().live_count() >= factory.delivered_count());
});
