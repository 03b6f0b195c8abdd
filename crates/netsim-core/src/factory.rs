//! The network: owns every node and runs the three per-tick phases.
//!
//! # Phases
//!
//! Each tick `t` is driven by calling, in order:
//! 1. [`Factory::do_deliveries`] -- ramps create packages.
//! 2. [`Factory::do_work`] -- workers advance processing.
//! 3. [`Factory::do_package_passing`] -- every sender flushes its outbound
//!    slot into a receiver chosen by its routing table.
//!
//! A package therefore moves at most one hop per tick.

use crate::id::{ElementId, PackageId, ReceiverId, ReceiverKind, SenderId, Time};
use crate::node::{Node, PackageReceiver, PackageSender, Ramp, Storehouse, Worker};
use crate::package::{Package, PackageIdAllocator};
use crate::rng::{ProbabilityGenerator, SimRng};
use crate::routing::RoutingError;
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from topology edits and package dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    #[error("duplicate {kind} identity {id}")]
    DuplicateIdentity { kind: NodeKind, id: ElementId },
    #[error("unknown {kind} identity {id}")]
    UnknownIdentity { kind: NodeKind, id: ElementId },
    #[error("{kind} {id} needs a positive interval")]
    InvalidInterval { kind: NodeKind, id: ElementId },
    #[error("{sender} cannot dispatch: {source}")]
    Routing {
        sender: SenderId,
        #[source]
        source: RoutingError,
    },
    #[error("{sender} routed to missing {receiver}")]
    UnknownReceiver {
        sender: SenderId,
        receiver: ReceiverId,
    },
}

/// Node kind tag used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Ramp,
    Worker,
    Storehouse,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Ramp => "ramp",
            NodeKind::Worker => "worker",
            NodeKind::Storehouse => "storehouse",
        })
    }
}

impl From<ReceiverKind> for NodeKind {
    fn from(kind: ReceiverKind) -> Self {
        match kind {
            ReceiverKind::Worker => NodeKind::Worker,
            ReceiverKind::Storehouse => NodeKind::Storehouse,
        }
    }
}

impl SenderId {
    pub fn node_kind(self) -> NodeKind {
        match self {
            SenderId::Ramp(_) => NodeKind::Ramp,
            SenderId::Worker(_) => NodeKind::Worker,
        }
    }

    pub fn element_id(self) -> ElementId {
        match self {
            SenderId::Ramp(id) | SenderId::Worker(id) => id,
        }
    }
}

// ---------------------------------------------------------------------------
// NodeCollection
// ---------------------------------------------------------------------------

/// Nodes of one kind keyed by identity. Iterates in ascending identity order.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct NodeCollection<N> {
    nodes: BTreeMap<ElementId, N>,
}

impl<N> Default for NodeCollection<N> {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }
}

impl<N: Node> NodeCollection<N> {
    /// Insert a node. Returns it back if the identity is taken.
    pub fn add(&mut self, node: N) -> Result<(), N> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(node);
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    pub fn remove_by_id(&mut self, id: ElementId) -> Option<N> {
        self.nodes.remove(&id)
    }

    pub fn find_by_id(&self, id: ElementId) -> Option<&N> {
        self.nodes.get(&id)
    }

    pub fn find_by_id_mut(&mut self, id: ElementId) -> Option<&mut N> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Stored keys alongside their nodes.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (ElementId, &N)> + '_ {
        self.nodes.iter().map(|(&id, node)| (id, node))
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &N> + '_ {
        self.nodes.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut N> + '_ {
        self.nodes.values_mut()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// The production network.
///
/// Routing edges live on senders as [`ReceiverId`] handles; every edit that
/// removes a receiver strips it from all routing tables, so dispatch never
/// sees a dangling handle.
pub struct Factory {
    pub(crate) ramps: NodeCollection<Ramp>,
    pub(crate) workers: NodeCollection<Worker>,
    pub(crate) storehouses: NodeCollection<Storehouse>,
    pub(crate) package_ids: PackageIdAllocator,
    generator: Box<dyn ProbabilityGenerator>,
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("ramps", &self.ramps)
            .field("workers", &self.workers)
            .field("storehouses", &self.storehouses)
            .field("package_ids", &self.package_ids)
            .finish_non_exhaustive()
    }
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}

impl Factory {
    /// Create an empty factory routing with a default-seeded [`SimRng`].
    pub fn new() -> Self {
        Self::with_generator(SimRng::default())
    }

    /// Create an empty factory with an injected probability source.
    pub fn with_generator(generator: impl ProbabilityGenerator + 'static) -> Self {
        Self {
            ramps: NodeCollection::default(),
            workers: NodeCollection::default(),
            storehouses: NodeCollection::default(),
            package_ids: PackageIdAllocator::new(),
            generator: Box::new(generator),
        }
    }

    pub(crate) fn from_parts(
        ramps: NodeCollection<Ramp>,
        workers: NodeCollection<Worker>,
        storehouses: NodeCollection<Storehouse>,
        package_ids: PackageIdAllocator,
        generator: Box<dyn ProbabilityGenerator>,
    ) -> Self {
        Self {
            ramps,
            workers,
            storehouses,
            package_ids,
            generator,
        }
    }

    /// Replace the probability source used for routing.
    pub fn set_generator(&mut self, generator: impl ProbabilityGenerator + 'static) {
        self.generator = Box::new(generator);
    }

    // -----------------------------------------------------------------------
    // Node accessors
    // -----------------------------------------------------------------------

    pub fn ramps(&self) -> &NodeCollection<Ramp> {
        &self.ramps
    }

    pub fn workers(&self) -> &NodeCollection<Worker> {
        &self.workers
    }

    pub fn storehouses(&self) -> &NodeCollection<Storehouse> {
        &self.storehouses
    }

    pub fn find_ramp_by_id(&self, id: u32) -> Option<&Ramp> {
        self.ramps.find_by_id(ElementId(id))
    }

    pub fn find_worker_by_id(&self, id: u32) -> Option<&Worker> {
        self.workers.find_by_id(ElementId(id))
    }

    pub fn find_storehouse_by_id(&self, id: u32) -> Option<&Storehouse> {
        self.storehouses.find_by_id(ElementId(id))
    }

    pub fn package_ids(&self) -> &PackageIdAllocator {
        &self.package_ids
    }

    /// Whether the receiver handle points at an existing node.
    pub fn contains_receiver(&self, receiver: ReceiverId) -> bool {
        match receiver.kind {
            ReceiverKind::Worker => self.workers.contains(receiver.id),
            ReceiverKind::Storehouse => self.storehouses.contains(receiver.id),
        }
    }

    /// Outbound slot and routing table of a sender.
    pub fn sender(&self, sender: SenderId) -> Option<&PackageSender> {
        match sender {
            SenderId::Ramp(id) => self.ramps.find_by_id(id).map(|r| &r.sender),
            SenderId::Worker(id) => self.workers.find_by_id(id).map(|w| &w.sender),
        }
    }

    fn sender_mut(&mut self, sender: SenderId) -> Option<&mut PackageSender> {
        match sender {
            SenderId::Ramp(id) => self.ramps.find_by_id_mut(id).map(|r| &mut r.sender),
            SenderId::Worker(id) => self.workers.find_by_id_mut(id).map(|w| &mut w.sender),
        }
    }

    fn receiver_mut(&mut self, receiver: ReceiverId) -> Option<&mut dyn PackageReceiver> {
        match receiver.kind {
            ReceiverKind::Worker => self
                .workers
                .find_by_id_mut(receiver.id)
                .map(|w| w as &mut dyn PackageReceiver),
            ReceiverKind::Storehouse => self
                .storehouses
                .find_by_id_mut(receiver.id)
                .map(|s| s as &mut dyn PackageReceiver),
        }
    }

    /// Every sender handle: ramps first, then workers, each by identity.
    pub fn sender_ids(&self) -> Vec<SenderId> {
        self.ramps
            .ids()
            .map(SenderId::Ramp)
            .chain(self.workers.ids().map(SenderId::Worker))
            .collect()
    }

    /// Total packages held by storehouses.
    pub fn delivered_count(&self) -> usize {
        self.storehouses.iter().map(|s| s.stockpile().len()).sum()
    }

    // -----------------------------------------------------------------------
    // Topology edits
    // -----------------------------------------------------------------------

    pub fn add_ramp(&mut self, ramp: Ramp) -> Result<(), FactoryError> {
        let id = ramp.id();
        if ramp.delivery_interval() == 0 {
            return Err(FactoryError::InvalidInterval {
                kind: NodeKind::Ramp,
                id,
            });
        }
        self.ramps
            .add(ramp)
            .map_err(|_| FactoryError::DuplicateIdentity {
                kind: NodeKind::Ramp,
                id,
            })
    }

    pub fn add_worker(&mut self, worker: Worker) -> Result<(), FactoryError> {
        let id = worker.id();
        if worker.processing_duration() == 0 {
            return Err(FactoryError::InvalidInterval {
                kind: NodeKind::Worker,
                id,
            });
        }
        self.workers
            .add(worker)
            .map_err(|_| FactoryError::DuplicateIdentity {
                kind: NodeKind::Worker,
                id,
            })
    }

    pub fn add_storehouse(&mut self, storehouse: Storehouse) -> Result<(), FactoryError> {
        let id = storehouse.id();
        self.storehouses
            .add(storehouse)
            .map_err(|_| FactoryError::DuplicateIdentity {
                kind: NodeKind::Storehouse,
                id,
            })
    }

    /// Remove a ramp, releasing its unsent package.
    pub fn remove_ramp(&mut self, id: u32) -> Result<Ramp, FactoryError> {
        let id = ElementId(id);
        let mut ramp = self
            .ramps
            .remove_by_id(id)
            .ok_or(FactoryError::UnknownIdentity {
                kind: NodeKind::Ramp,
                id,
            })?;
        if let Some(package) = ramp.sender.take_package() {
            self.package_ids.release(package);
        }
        Ok(ramp)
    }

    /// Remove a worker, pruning every routing edge to it and releasing the
    /// packages it held.
    pub fn remove_worker(&mut self, id: u32) -> Result<Worker, FactoryError> {
        let id = ElementId(id);
        let mut worker = self
            .workers
            .remove_by_id(id)
            .ok_or(FactoryError::UnknownIdentity {
                kind: NodeKind::Worker,
                id,
            })?;
        self.prune_receiver(worker.receiver_id());
        for package in worker.drain_packages() {
            self.package_ids.release(package);
        }
        Ok(worker)
    }

    /// Remove a storehouse, pruning every routing edge to it and releasing
    /// its stock.
    pub fn remove_storehouse(&mut self, id: u32) -> Result<Storehouse, FactoryError> {
        let id = ElementId(id);
        let mut storehouse =
            self.storehouses
                .remove_by_id(id)
                .ok_or(FactoryError::UnknownIdentity {
                    kind: NodeKind::Storehouse,
                    id,
                })?;
        self.prune_receiver(storehouse.receiver_id());
        for package in storehouse.drain_packages() {
            self.package_ids.release(package);
        }
        Ok(storehouse)
    }

    fn prune_receiver(&mut self, receiver: ReceiverId) {
        for ramp in self.ramps.iter_mut() {
            ramp.sender.receiver_preferences.remove_receiver(receiver);
        }
        for worker in self.workers.iter_mut() {
            worker.sender.receiver_preferences.remove_receiver(receiver);
        }
    }

    /// Add a routing edge. Returns `false` if the edge already existed.
    pub fn link(&mut self, src: SenderId, dest: ReceiverId) -> Result<bool, FactoryError> {
        if !self.contains_receiver(dest) {
            return Err(FactoryError::UnknownIdentity {
                kind: dest.kind.into(),
                id: dest.id,
            });
        }
        let sender = self
            .sender_mut(src)
            .ok_or(FactoryError::UnknownIdentity {
                kind: src.node_kind(),
                id: src.element_id(),
            })?;
        Ok(sender.receiver_preferences.add_receiver(dest))
    }

    /// Remove a routing edge. Returns `false` if there was no such edge.
    pub fn unlink(&mut self, src: SenderId, dest: ReceiverId) -> Result<bool, FactoryError> {
        let sender = self
            .sender_mut(src)
            .ok_or(FactoryError::UnknownIdentity {
                kind: src.node_kind(),
                id: src.element_id(),
            })?;
        Ok(sender.receiver_preferences.remove_receiver(dest))
    }

    // -----------------------------------------------------------------------
    // Tick phases
    // -----------------------------------------------------------------------

    /// Phase 1: every ramp whose period hits `t` creates a package.
    pub fn do_deliveries(&mut self, t: Time) {
        for ramp in self.ramps.iter_mut() {
            if let Some(displaced) = ramp.deliver_goods(t, &mut self.package_ids) {
                tracing::warn!(ramp = %ramp.id(), package = %displaced.id(), "outbound slot overwritten");
                self.package_ids.release(displaced);
            }
        }
    }

    /// Phase 2: every worker advances by one tick.
    pub fn do_work(&mut self, t: Time) {
        for worker in self.workers.iter_mut() {
            worker.do_work(t);
        }
    }

    /// Phase 3: every sender (ramps, then workers) hands its outbound package
    /// to a receiver chosen by its routing table.
    ///
    /// On failure the package is put back into its sender's slot and the
    /// remaining senders are not processed.
    pub fn do_package_passing(&mut self) -> Result<(), FactoryError> {
        for sender in self.sender_ids() {
            self.send_package(sender)?;
        }
        Ok(())
    }

    /// Dispatch a single sender's outbound package, if it holds one.
    /// Returns the receiver it went to.
    pub fn send_package(&mut self, sender: SenderId) -> Result<Option<ReceiverId>, FactoryError> {
        let slot = match sender {
            SenderId::Ramp(id) => self.ramps.find_by_id_mut(id).map(|r| &mut r.sender),
            SenderId::Worker(id) => self.workers.find_by_id_mut(id).map(|w| &mut w.sender),
        };
        let Some(slot) = slot else {
            return Err(FactoryError::UnknownIdentity {
                kind: sender.node_kind(),
                id: sender.element_id(),
            });
        };
        if slot.sending_buffer().is_none() {
            return Ok(None);
        }

        let receiver = slot
            .receiver_preferences
            .choose_receiver(self.generator.as_mut())
            .map_err(|source| FactoryError::Routing { sender, source })?;
        let Some(package) = slot.take_package() else {
            return Ok(None);
        };
        let package_id = package.id();
        match self.receiver_mut(receiver) {
            Some(target) => {
                target.receive_package(package);
                tracing::trace!(%sender, %receiver, package = %package_id, "passed package");
                Ok(Some(receiver))
            }
            None => {
                self.restore_outbound(sender, package);
                Err(FactoryError::UnknownReceiver { sender, receiver })
            }
        }
    }

    fn restore_outbound(&mut self, sender: SenderId, package: Package) {
        if let Some(slot) = self.sender_mut(sender) {
            slot.push_package(package);
        }
    }

    /// Run all three phases for tick `t`.
    pub fn tick(&mut self, t: Time) -> Result<(), FactoryError> {
        self.do_deliveries(t);
        self.do_work(t);
        self.do_package_passing()
    }

    /// Where a live package currently sits, if anywhere in the network.
    pub fn locate_package(&self, package: PackageId) -> Option<PackageLocation> {
        for ramp in self.ramps.iter() {
            if ramp.sender.sending_buffer().map(Package::id) == Some(package) {
                return Some(PackageLocation::Outbound(SenderId::Ramp(ramp.id())));
            }
        }
        for worker in self.workers.iter() {
            if worker.current().map(|c| c.package.id()) == Some(package) {
                return Some(PackageLocation::Processing(worker.id()));
            }
            if worker.queue().iter().any(|p| p.id() == package) {
                return Some(PackageLocation::Queued(worker.id()));
            }
            if worker.sender.sending_buffer().map(Package::id) == Some(package) {
                return Some(PackageLocation::Outbound(SenderId::Worker(worker.id())));
            }
        }
        self.storehouses
            .iter()
            .find(|s| s.stockpile().iter().any(|p| p.id() == package))
            .map(|s| PackageLocation::Stored(s.id()))
    }
}

/// Result of [`Factory::locate_package`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageLocation {
    Outbound(SenderId),
    Queued(ElementId),
    Processing(ElementId),
    Stored(ElementId),
}
