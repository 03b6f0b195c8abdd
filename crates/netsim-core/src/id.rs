use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticks are the atomic unit of simulation time. The first tick is 1.
pub type Time = u64;

/// A duration measured in ticks (delivery intervals, processing times).
pub type TimeOffset = u64;

/// Identifies a node within its kind. Two nodes of different kinds may share
/// the same `ElementId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub u32);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a live package. Issued by [`crate::package::PackageIdAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageId(pub u32);

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two node kinds that can accept packages.
///
/// Declaration order matters: routing tables iterate workers before
/// storehouses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReceiverKind {
    Worker,
    Storehouse,
}

/// A handle to a receiving node: kind tag plus identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReceiverId {
    pub kind: ReceiverKind,
    pub id: ElementId,
}

impl ReceiverId {
    pub fn worker(id: u32) -> Self {
        Self {
            kind: ReceiverKind::Worker,
            id: ElementId(id),
        }
    }

    pub fn storehouse(id: u32) -> Self {
        Self {
            kind: ReceiverKind::Storehouse,
            id: ElementId(id),
        }
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ReceiverKind::Worker => write!(f, "worker #{}", self.id),
            ReceiverKind::Storehouse => write!(f, "storehouse #{}", self.id),
        }
    }
}

/// A handle to a sending node (ramp or worker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SenderId {
    Ramp(ElementId),
    Worker(ElementId),
}

impl SenderId {
    /// The receiver handle for the same node, if the sender can also receive.
    pub fn as_receiver(self) -> Option<ReceiverId> {
        match self {
            SenderId::Ramp(_) => None,
            SenderId::Worker(id) => Some(ReceiverId {
                kind: ReceiverKind::Worker,
                id,
            }),
        }
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderId::Ramp(id) => write!(f, "ramp #{id}"),
            SenderId::Worker(id) => write!(f, "worker #{id}"),
        }
    }
}
