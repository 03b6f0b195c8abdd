//! Structural consistency: every ramp's packages must be able to reach a
//! storehouse instead of getting stranded.
//!
//! The check is a depth-first traversal from each ramp over sender nodes,
//! driven by an explicit stack.
//! An edge qualifies as an onward route when it targets a storehouse, a
//! worker already proven, or an unvisited worker (which is then proven
//! recursively). Self-loops and edges back into the node currently on the
//! traversal path never qualify. A sender with no edges, or with no
//! qualifying edge, makes the whole topology inconsistent. Workers that no
//! ramp reaches are not inspected.

use crate::factory::Factory;
use crate::id::{ReceiverId, ReceiverKind, SenderId};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Why a sender fails the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InconsistencyReason {
    /// The sender has no routing edges at all.
    NoReceivers,
    /// Every edge is a self-loop or leads back into the current path.
    NoQualifyingReceiver,
}

/// A sender whose packages may never reach a storehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{sender} cannot reach a storehouse: {reason:?}")]
pub struct Inconsistency {
    pub sender: SenderId,
    pub reason: InconsistencyReason,
}

/// Traversal state of a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// A sender on the traversal path, with its position among its edges.
struct Frame {
    node: SenderId,
    receivers: Vec<ReceiverId>,
    cursor: usize,
    qualifying: usize,
}

/// Put `node` on the path. Fails if it has no routing edges.
fn enter(
    factory: &Factory,
    node: SenderId,
    states: &mut HashMap<SenderId, VisitState>,
) -> Result<Frame, Inconsistency> {
    states.insert(node, VisitState::InProgress);
    // Routing tables never hold dangling handles; a missing node counts as a
    // dead end all the same.
    let receivers: Vec<ReceiverId> = factory
        .sender(node)
        .map(|sender| sender.receiver_preferences.receivers().collect())
        .unwrap_or_default();
    if receivers.is_empty() {
        return Err(Inconsistency {
            sender: node,
            reason: InconsistencyReason::NoReceivers,
        });
    }
    Ok(Frame {
        node,
        receivers,
        cursor: 0,
        qualifying: 0,
    })
}

/// Prove `root` with an explicit stack, so path depth is bounded by the heap
/// rather than the thread stack.
fn visit(
    factory: &Factory,
    root: SenderId,
    states: &mut HashMap<SenderId, VisitState>,
) -> Result<(), Inconsistency> {
    if states.get(&root) == Some(&VisitState::Done) {
        return Ok(());
    }
    let mut path = vec![enter(factory, root, states)?];

    while let Some(frame) = path.last_mut() {
        let Some(&receiver) = frame.receivers.get(frame.cursor) else {
            let Some(finished) = path.pop() else { break };
            states.insert(finished.node, VisitState::Done);
            if finished.qualifying == 0 {
                return Err(Inconsistency {
                    sender: finished.node,
                    reason: InconsistencyReason::NoQualifyingReceiver,
                });
            }
            if let Some(parent) = path.last_mut() {
                parent.qualifying += 1;
            }
            continue;
        };
        frame.cursor += 1;

        match receiver.kind {
            ReceiverKind::Storehouse => frame.qualifying += 1,
            ReceiverKind::Worker => {
                let next = SenderId::Worker(receiver.id);
                if next == frame.node {
                    continue;
                }
                match states.get(&next) {
                    Some(VisitState::InProgress) => {}
                    Some(VisitState::Done) => frame.qualifying += 1,
                    None => {
                        let child = enter(factory, next, states)?;
                        path.push(child);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Run the consistency check and report the first failing sender.
pub fn check_consistency(factory: &Factory) -> Result<(), Inconsistency> {
    let mut states = HashMap::new();
    for ramp in factory.ramps().ids() {
        visit(factory, SenderId::Ramp(ramp), &mut states)?;
    }
    Ok(())
}

impl Factory {
    /// Whether every ramp is guaranteed an onward route to a storehouse.
    pub fn is_consistent(&self) -> bool {
        match check_consistency(self) {
            Ok(()) => true,
            Err(inconsistency) => {
                tracing::debug!(%inconsistency, "topology is inconsistent");
                false
            }
        }
    }
}
