//! Vocabulary shared by the loader and the writer: line tags, their keys,
//! and the `kind-id` endpoint tokens used by `LINK` lines.

use netsim_core::id::{ElementId, ReceiverId, ReceiverKind, SenderId};
use netsim_core::storage::QueueKind;
use std::fmt;

/// Line tag of a topology entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    LoadingRamp,
    Worker,
    Storehouse,
    Link,
}

impl Tag {
    pub fn parse(name: &str) -> Option<Tag> {
        match name {
            "LOADING_RAMP" => Some(Tag::LoadingRamp),
            "WORKER" => Some(Tag::Worker),
            "STOREHOUSE" => Some(Tag::Storehouse),
            "LINK" => Some(Tag::Link),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::LoadingRamp => "LOADING_RAMP",
            Tag::Worker => "WORKER",
            Tag::Storehouse => "STOREHOUSE",
            Tag::Link => "LINK",
        }
    }

    /// Keys the tag accepts. Every one of them is required.
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            Tag::LoadingRamp => &[KEY_ID, KEY_DELIVERY_INTERVAL],
            Tag::Worker => &[KEY_ID, KEY_PROCESSING_TIME, KEY_QUEUE_TYPE],
            Tag::Storehouse => &[KEY_ID],
            Tag::Link => &[KEY_SRC, KEY_DEST],
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const KEY_ID: &str = "id";
pub const KEY_DELIVERY_INTERVAL: &str = "delivery-interval";
pub const KEY_PROCESSING_TIME: &str = "processing-time";
pub const KEY_QUEUE_TYPE: &str = "queue-type";
pub const KEY_SRC: &str = "src";
pub const KEY_DEST: &str = "dest";

const RAMP: &str = "ramp";
const WORKER: &str = "worker";
const STORE: &str = "store";

pub fn parse_queue_kind(name: &str) -> Option<QueueKind> {
    [QueueKind::Fifo, QueueKind::Lifo]
        .into_iter()
        .find(|kind| kind.as_str() == name)
}

fn split_endpoint(token: &str) -> Option<(&str, ElementId)> {
    let (kind, id) = token.split_once('-')?;
    let id = id.parse().ok()?;
    Some((kind, ElementId(id)))
}

/// `ramp-N` or `worker-N`.
pub fn parse_sender(token: &str) -> Option<SenderId> {
    match split_endpoint(token)? {
        (RAMP, id) => Some(SenderId::Ramp(id)),
        (WORKER, id) => Some(SenderId::Worker(id)),
        _ => None,
    }
}

/// `worker-N` or `store-N`.
pub fn parse_receiver(token: &str) -> Option<ReceiverId> {
    match split_endpoint(token)? {
        (WORKER, id) => Some(ReceiverId {
            kind: ReceiverKind::Worker,
            id,
        }),
        (STORE, id) => Some(ReceiverId {
            kind: ReceiverKind::Storehouse,
            id,
        }),
        _ => None,
    }
}

pub fn sender_token(sender: SenderId) -> String {
    match sender {
        SenderId::Ramp(id) => format!("{RAMP}-{id}"),
        SenderId::Worker(id) => format!("{WORKER}-{id}"),
    }
}

pub fn receiver_token(receiver: ReceiverId) -> String {
    match receiver.kind {
        ReceiverKind::Worker => format!("{WORKER}-{}", receiver.id),
        ReceiverKind::Storehouse => format!("{STORE}-{}", receiver.id),
    }
}
