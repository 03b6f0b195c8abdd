//! Node behaviours: ramps generate packages, workers process them,
//! storehouses keep them.

use crate::id::{ElementId, ReceiverId, ReceiverKind, Time, TimeOffset};
use crate::package::{Package, PackageIdAllocator};
use crate::routing::ReceiverPreferences;
use crate::storage::{PackageQueue, QueueKind};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Common identity accessor used by [`crate::factory::NodeCollection`].
pub trait Node {
    fn id(&self) -> ElementId;
}

/// A node that can accept packages.
pub trait PackageReceiver: Node {
    fn receiver_kind(&self) -> ReceiverKind;

    fn receive_package(&mut self, package: Package);

    /// The storage exposed for inspection.
    fn stockpile(&self) -> &PackageQueue;

    fn receiver_id(&self) -> ReceiverId {
        ReceiverId {
            kind: self.receiver_kind(),
            id: self.id(),
        }
    }
}

/// Outbound slot plus routing table, shared by ramps and workers.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PackageSender {
    pub receiver_preferences: ReceiverPreferences,
    #[serde(deserialize_with = "crate::package::deserialize_slot")]
    sending_buffer: Option<Package>,
}

impl PackageSender {
    pub fn sending_buffer(&self) -> Option<&Package> {
        self.sending_buffer.as_ref()
    }

    /// Put a package into the outbound slot, returning whatever it displaced.
    pub fn push_package(&mut self, package: Package) -> Option<Package> {
        self.sending_buffer.replace(package)
    }

    pub fn take_package(&mut self) -> Option<Package> {
        self.sending_buffer.take()
    }
}

// ---------------------------------------------------------------------------
// Ramp
// ---------------------------------------------------------------------------

/// Package source that delivers one package every `delivery_interval` ticks,
/// starting at tick 1.
#[derive(Debug, Serialize, Deserialize)]
pub struct Ramp {
    id: ElementId,
    delivery_interval: TimeOffset,
    pub sender: PackageSender,
}

impl Ramp {
    pub fn new(id: u32, delivery_interval: TimeOffset) -> Self {
        Self {
            id: ElementId(id),
            delivery_interval,
            sender: PackageSender::default(),
        }
    }

    pub fn delivery_interval(&self) -> TimeOffset {
        self.delivery_interval
    }

    /// Whether tick `t` is a delivery tick: 1, d+1, 2d+1, ...
    pub fn delivers_at(&self, t: Time) -> bool {
        t >= 1 && (t - 1) % self.delivery_interval.max(1) == 0
    }

    /// Generate a package if `t` is a delivery tick. Returns the package that
    /// was displaced from the outbound slot, if any.
    pub fn deliver_goods(&mut self, t: Time, ids: &mut PackageIdAllocator) -> Option<Package> {
        if !self.delivers_at(t) {
            return None;
        }
        let package = ids.allocate();
        tracing::debug!(ramp = %self.id, package = %package.id(), tick = t, "delivered package");
        self.sender.push_package(package)
    }
}

impl Node for Ramp {
    fn id(&self) -> ElementId {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// The package a worker is currently processing.
#[derive(Debug, Serialize, Deserialize)]
pub struct InProcess {
    #[serde(deserialize_with = "crate::package::deserialize_package")]
    pub package: Package,
    pub started_at: Time,
}

/// Processing node: queues incoming packages and spends
/// `processing_duration` ticks on each.
#[derive(Debug, Serialize, Deserialize)]
pub struct Worker {
    id: ElementId,
    processing_duration: TimeOffset,
    queue: PackageQueue,
    current: Option<InProcess>,
    pub sender: PackageSender,
}

impl Worker {
    pub fn new(id: u32, processing_duration: TimeOffset, queue_kind: QueueKind) -> Self {
        Self {
            id: ElementId(id),
            processing_duration,
            queue: PackageQueue::new(queue_kind),
            current: None,
            sender: PackageSender::default(),
        }
    }

    pub fn processing_duration(&self) -> TimeOffset {
        self.processing_duration
    }

    pub fn queue(&self) -> &PackageQueue {
        &self.queue
    }

    pub fn current(&self) -> Option<&InProcess> {
        self.current.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    /// Advance processing by one tick.
    pub fn do_work(&mut self, t: Time) {
        if self.current.is_none() {
            if let Ok(package) = self.queue.pop() {
                self.current = Some(InProcess {
                    package,
                    started_at: t,
                });
            }
        }

        // Finished once `started_at + duration <= t + 1`, compared as elapsed
        // time so that huge durations cannot overflow.
        let finished = self
            .current
            .as_ref()
            .is_some_and(|c| t.saturating_sub(c.started_at) >= self.processing_duration.max(1) - 1);
        // An outbound slot left occupied by a failed dispatch holds the
        // finished package back until it is flushed.
        if finished && self.sender.sending_buffer().is_none() {
            if let Some(done) = self.current.take() {
                tracing::debug!(worker = %self.id, package = %done.package.id(), tick = t, "finished processing");
                self.sender.push_package(done.package);
            }
        }
    }

    /// Remove every package the worker holds: in process, queued, outbound.
    pub(crate) fn drain_packages(&mut self) -> Vec<Package> {
        let mut packages: Vec<Package> = self.current.take().map(|c| c.package).into_iter().collect();
        packages.extend(self.queue.drain());
        packages.extend(self.sender.take_package());
        packages
    }
}

impl Node for Worker {
    fn id(&self) -> ElementId {
        self.id
    }
}

impl PackageReceiver for Worker {
    fn receiver_kind(&self) -> ReceiverKind {
        ReceiverKind::Worker
    }

    fn receive_package(&mut self, package: Package) {
        self.queue.push(package);
    }

    fn stockpile(&self) -> &PackageQueue {
        &self.queue
    }
}

// ---------------------------------------------------------------------------
// Storehouse
// ---------------------------------------------------------------------------

/// Terminal sink that keeps every package it receives.
#[derive(Debug, Serialize, Deserialize)]
pub struct Storehouse {
    id: ElementId,
    stockpile: PackageQueue,
}

impl Storehouse {
    pub fn new(id: u32) -> Self {
        Self {
            id: ElementId(id),
            stockpile: PackageQueue::new(QueueKind::Fifo),
        }
    }

    pub(crate) fn drain_packages(&mut self) -> Vec<Package> {
        self.stockpile.drain().collect()
    }
}

impl Node for Storehouse {
    fn id(&self) -> ElementId {
        self.id
    }
}

impl PackageReceiver for Storehouse {
    fn receiver_kind(&self) -> ReceiverKind {
        ReceiverKind::Storehouse
    }

    fn receive_package(&mut self, package: Package) {
        self.stockpile.push(package);
    }

    fn stockpile(&self) -> &PackageQueue {
        &self.stockpile
    }
}
