//! NetSim Core -- a tick-driven simulation of a small production network.
//!
//! Loading ramps generate packages, workers process them, and storehouses
//! collect them. Senders route each outgoing package to one of their
//! registered receivers with uniform probability.
//!
//! # Three-Phase Tick
//!
//! For every tick `t = 1, 2, 3, ...` the driver calls:
//!
//! 1. **Deliveries** -- [`factory::Factory::do_deliveries`]: ramps create
//!    packages on their period.
//! 2. **Work** -- [`factory::Factory::do_work`]: workers start queued
//!    packages and finish the ones whose processing time has elapsed.
//! 3. **Package passing** -- [`factory::Factory::do_package_passing`]:
//!    every outbound slot is flushed into a receiver's storage.
//!
//! [`factory::Factory::is_consistent`] checks, independently of the tick,
//! that every ramp can route its packages to a storehouse.
//!
//! ```rust
//! use netsim_core::factory::Factory;
//! use netsim_core::id::{ElementId, ReceiverId, SenderId};
//! use netsim_core::node::{Ramp, Storehouse, Worker};
//! use netsim_core::storage::QueueKind;
//!
//! let mut factory = Factory::new();
//! factory.add_ramp(Ramp::new(1, 1)).unwrap();
//! factory.add_worker(Worker::new(1, 1, QueueKind::Fifo)).unwrap();
//! factory.add_storehouse(Storehouse::new(1)).unwrap();
//! factory.link(SenderId::Ramp(ElementId(1)), ReceiverId::worker(1)).unwrap();
//! factory.link(SenderId::Worker(ElementId(1)), ReceiverId::storehouse(1)).unwrap();
//! assert!(factory.is_consistent());
//!
//! for t in 1..=3 {
//!     factory.tick(t).unwrap();
//! }
//! assert_eq!(factory.delivered_count(), 2);
//! ```
//!
//! # Key Types
//!
//! - [`factory::Factory`] -- owns every node and runs the tick phases.
//! - [`node::Ramp`], [`node::Worker`], [`node::Storehouse`] -- node behaviours.
//! - [`routing::ReceiverPreferences`] -- per-sender routing table.
//! - [`storage::PackageQueue`] -- FIFO/LIFO package storage.
//! - [`package::PackageIdAllocator`] -- issues and recycles package identities.
//! - [`sim::simulate`] -- multi-turn driver with report scheduling.

pub mod factory;
pub mod id;
pub mod node;
pub mod package;
pub mod report;
pub mod rng;
pub mod routing;
pub mod serialize;
pub mod sim;
pub mod storage;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
