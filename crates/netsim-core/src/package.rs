//! Packages and the identity allocator that issues them.
//!
//! A [`Package`] cannot be cloned, so no two live packages share an identity.
//! Identities return to the allocator only through
//! [`PackageIdAllocator::release`]; a package dropped any other way keeps its
//! identity reserved.
//!
//! Packages serialize, but only snapshot restore can rebuild them: the
//! decoding helpers below are crate-private, and `Package` itself does not
//! implement `Deserialize`.

use crate::id::PackageId;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// An opaque token moving through the network.
///
/// ```compile_fail
/// use netsim_core::package::Package;
/// let forged: Package = serde_json::from_str(r#"{"id":1}"#).unwrap();
/// ```
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Package {
    id: PackageId,
}

impl Package {
    pub fn id(&self) -> PackageId {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Snapshot restore
// ---------------------------------------------------------------------------

/// Encoded form of a [`Package`].
#[derive(Deserialize)]
struct StoredPackage {
    id: PackageId,
}

impl From<StoredPackage> for Package {
    fn from(stored: StoredPackage) -> Self {
        Package { id: stored.id }
    }
}

pub(crate) fn deserialize_package<'de, D: Deserializer<'de>>(d: D) -> Result<Package, D::Error> {
    StoredPackage::deserialize(d).map(Package::from)
}

pub(crate) fn deserialize_slot<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Package>, D::Error> {
    Option::<StoredPackage>::deserialize(d).map(|stored| stored.map(Package::from))
}

pub(crate) fn deserialize_packages<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<VecDeque<Package>, D::Error> {
    VecDeque::<StoredPackage>::deserialize(d)
        .map(|stored| stored.into_iter().map(Package::from).collect())
}

// ---------------------------------------------------------------------------
// Allocator
// ---------------------------------------------------------------------------

/// Issues package identities, reusing the smallest freed one first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIdAllocator {
    assigned: BTreeSet<PackageId>,
    freed: BTreeSet<PackageId>,
}

impl PackageIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a package with a fresh identity.
    ///
    /// # Examples
    ///
    /// ```
    /// use netsim_core::package::PackageIdAllocator;
    /// use netsim_core::id::PackageId;
    ///
    /// let mut ids = PackageIdAllocator::new();
    /// let first = ids.allocate();
    /// let second = ids.allocate();
    /// assert_eq!(first.id(), PackageId(1));
    /// ids.release(first);
    /// assert_eq!(ids.allocate().id(), PackageId(1));
    /// # drop(second);
    /// ```
    pub fn allocate(&mut self) -> Package {
        let id = match self.freed.pop_first() {
            Some(id) => id,
            None => match self.assigned.last() {
                Some(max) => PackageId(max.0 + 1),
                None => PackageId(1),
            },
        };
        self.assigned.insert(id);
        Package { id }
    }

    /// Destroy a package and return its identity to the free pool.
    pub fn release(&mut self, package: Package) {
        if self.assigned.remove(&package.id) {
            self.freed.insert(package.id);
        }
    }

    /// Whether the identity belongs to a live package.
    pub fn is_assigned(&self, id: PackageId) -> bool {
        self.assigned.contains(&id)
    }

    /// Number of live packages.
    pub fn live_count(&self) -> usize {
        self.assigned.len()
    }

    /// Largest live identity.
    pub(crate) fn highest_assigned(&self) -> Option<PackageId> {
        self.assigned.last().copied()
    }

    /// Freed identities awaiting reuse, smallest first.
    pub fn freed(&self) -> impl Iterator<Item = PackageId> + '_ {
        self.freed.iter().copied()
    }
}
