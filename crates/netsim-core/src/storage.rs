//! Package storage with a queueing discipline fixed at creation.

use crate::package::Package;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Errors that can occur when taking packages out of storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("pop from empty package queue")]
    Empty,
}

/// Which package `pop` hands out next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueKind {
    /// Oldest package first.
    Fifo,
    /// Newest package first.
    Lifo,
}

impl QueueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QueueKind::Fifo => "FIFO",
            QueueKind::Lifo => "LIFO",
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered package storage.
///
/// Packages are kept in insertion order regardless of discipline, so
/// iteration (used by reports) is stable across FIFO and LIFO queues.
#[derive(Debug, Serialize, Deserialize)]
pub struct PackageQueue {
    kind: QueueKind,
    #[serde(deserialize_with = "crate::package::deserialize_packages")]
    packages: VecDeque<Package>,
}

impl PackageQueue {
    pub fn new(kind: QueueKind) -> Self {
        Self {
            kind,
            packages: VecDeque::new(),
        }
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    pub fn push(&mut self, package: Package) {
        self.packages.push_back(package);
    }

    /// Remove the next package according to the queue's discipline.
    pub fn pop(&mut self) -> Result<Package, StorageError> {
        let next = match self.kind {
            QueueKind::Fifo => self.packages.pop_front(),
            QueueKind::Lifo => self.packages.pop_back(),
        };
        next.ok_or(StorageError::Empty)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Packages from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Package> + '_ {
        self.packages.iter()
    }

    /// Remove every package, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = Package> + '_ {
        self.packages.drain(..)
    }
}

impl<'a> IntoIterator for &'a PackageQueue {
    type Item = &'a Package;
    type IntoIter = std::collections::vec_deque::Iter<'a, Package>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.iter()
    }
}
