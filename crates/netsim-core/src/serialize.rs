//! Binary snapshots of a running factory.
//!
//! Snapshots are encoded with `bitcode` behind a versioned header. They hold
//! every node with its queues, in-process packages, outbound slots and
//! routing tables, plus the identity allocator. The probability generator is
//! not captured; a restored factory routes with a fresh generator.
//!
//! Decoded snapshots are checked before they become a [`Factory`]: node keys
//! match node identities, intervals are positive, routing handles resolve,
//! and every held package is live in the allocator exactly once.

use crate::factory::{Factory, NodeCollection};
use crate::id::{PackageId, ReceiverKind, SenderId};
use crate::node::{Node, PackageReceiver, Ramp, Storehouse, Worker};
use crate::package::{Package, PackageIdAllocator};
use crate::rng::{ProbabilityGenerator, SimRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Leading bytes of every snapshot.
pub const SNAPSHOT_TAG: [u8; 4] = *b"NSIM";

/// Snapshot layout revision. Bumped whenever a stored type changes shape.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Why a snapshot could not be written or read.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot encoding failed: {0}")]
    Encode(String),
    #[error("snapshot decoding failed: {0}")]
    Decode(String),
    #[error("not a factory snapshot (leading bytes {found:?})")]
    NotASnapshot { found: [u8; 4] },
    #[error("snapshot version {found} cannot be read by this build (reads version {SNAPSHOT_VERSION})")]
    VersionMismatch { found: u16 },
    #[error("snapshot holds an impossible state: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Preamble {
    tag: [u8; 4],
    version: u16,
}

impl Preamble {
    const CURRENT: Preamble = Preamble {
        tag: SNAPSHOT_TAG,
        version: SNAPSHOT_VERSION,
    };

    fn check(self) -> Result<(), SnapshotError> {
        if self.tag != SNAPSHOT_TAG {
            return Err(SnapshotError::NotASnapshot { found: self.tag });
        }
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                found: self.version,
            });
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    preamble: Preamble,
    ramps: &'a NodeCollection<Ramp>,
    workers: &'a NodeCollection<Worker>,
    storehouses: &'a NodeCollection<Storehouse>,
    package_ids: &'a PackageIdAllocator,
}

#[derive(Deserialize)]
struct Snapshot {
    preamble: Preamble,
    ramps: NodeCollection<Ramp>,
    workers: NodeCollection<Worker>,
    storehouses: NodeCollection<Storehouse>,
    package_ids: PackageIdAllocator,
}

fn invalid(reason: String) -> SnapshotError {
    SnapshotError::Invalid(reason)
}

impl Snapshot {
    fn validate(&self) -> Result<(), SnapshotError> {
        for (key, ramp) in self.ramps.entries() {
            if key != ramp.id() {
                return Err(invalid(format!("ramp {} stored under identity {key}", ramp.id())));
            }
            if ramp.delivery_interval() == 0 {
                return Err(invalid(format!("ramp {key} has a zero delivery interval")));
            }
        }
        for (key, worker) in self.workers.entries() {
            if key != worker.id() {
                return Err(invalid(format!("worker {} stored under identity {key}", worker.id())));
            }
            if worker.processing_duration() == 0 {
                return Err(invalid(format!("worker {key} has a zero processing time")));
            }
        }
        for (key, storehouse) in self.storehouses.entries() {
            if key != storehouse.id() {
                return Err(invalid(format!(
                    "storehouse {} stored under identity {key}",
                    storehouse.id()
                )));
            }
        }

        let routes = self
            .ramps
            .iter()
            .map(|r| (SenderId::Ramp(r.id()), &r.sender))
            .chain(self.workers.iter().map(|w| (SenderId::Worker(w.id()), &w.sender)));
        for (sender, slot) in routes {
            for receiver in slot.receiver_preferences.receivers() {
                let resolves = match receiver.kind {
                    ReceiverKind::Worker => self.workers.contains(receiver.id),
                    ReceiverKind::Storehouse => self.storehouses.contains(receiver.id),
                };
                if !resolves {
                    return Err(invalid(format!("{sender} routes to missing {receiver}")));
                }
            }
        }

        let ids = &self.package_ids;
        if let Some(id) = ids.freed().find(|&id| ids.is_assigned(id)) {
            return Err(invalid(format!("package {id} is both live and freed")));
        }
        if ids.highest_assigned() == Some(PackageId(u32::MAX)) {
            return Err(invalid("package identities are exhausted".to_string()));
        }
        let mut seen = BTreeSet::new();
        for id in self.held_packages() {
            if !ids.is_assigned(id) {
                return Err(invalid(format!("package {id} is held but not live")));
            }
            if !seen.insert(id) {
                return Err(invalid(format!("package {id} is held twice")));
            }
        }
        Ok(())
    }

    /// Identity of every package sitting in a slot, queue or stockpile.
    fn held_packages(&self) -> impl Iterator<Item = PackageId> + '_ {
        let ramps = self.ramps.iter().filter_map(|r| r.sender.sending_buffer());
        let workers = self.workers.iter().flat_map(|w| {
            w.current()
                .map(|c| &c.package)
                .into_iter()
                .chain(w.queue().iter())
                .chain(w.sender.sending_buffer())
        });
        let storehouses = self.storehouses.iter().flat_map(|s| s.stockpile().iter());
        ramps.chain(workers).chain(storehouses).map(Package::id)
    }
}

impl Factory {
    /// Encode the whole network state.
    pub fn serialize(&self) -> Result<Vec<u8>, SnapshotError> {
        bitcode::serialize(&SnapshotRef {
            preamble: Preamble::CURRENT,
            ramps: &self.ramps,
            workers: &self.workers,
            storehouses: &self.storehouses,
            package_ids: &self.package_ids,
        })
        .map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Restore a factory that routes with a default-seeded [`SimRng`].
    pub fn deserialize(data: &[u8]) -> Result<Self, SnapshotError> {
        Self::deserialize_with_generator(data, SimRng::default())
    }

    /// Restore a factory that routes with `generator`.
    pub fn deserialize_with_generator(
        data: &[u8],
        generator: impl ProbabilityGenerator + 'static,
    ) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot =
            bitcode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
        snapshot.preamble.check()?;
        snapshot.validate()?;
        tracing::debug!(
            ramps = snapshot.ramps.len(),
            workers = snapshot.workers.len(),
            storehouses = snapshot.storehouses.len(),
            "restored factory snapshot"
        );
        Ok(Factory::from_parts(
            snapshot.ramps,
            snapshot.workers,
            snapshot.storehouses,
            snapshot.package_ids,
            Box::new(generator),
        ))
    }
}
