//! Builds a [`Factory`] from topology text.
//!
//! Loading is all-or-nothing: the first bad line aborts the load and no
//! partially built factory escapes. Node lines are applied as they are read;
//! `LINK` lines are collected and applied once every node exists, so a link
//! may appear anywhere in the file.

use crate::syntax::{
    self, KEY_DELIVERY_INTERVAL, KEY_DEST, KEY_ID, KEY_PROCESSING_TIME, KEY_QUEUE_TYPE, KEY_SRC,
    Tag,
};
use netsim_core::factory::{Factory, FactoryError};
use netsim_core::id::{ReceiverId, SenderId};
use netsim_core::node::{Ramp, Storehouse, Worker};
use std::collections::BTreeMap;
use std::str::FromStr;

// ===========================================================================
// Errors
// ===========================================================================

/// A load failure, tagged with the 1-based line it came from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct LoadError {
    pub line: usize,
    pub kind: LoadErrorKind,
}

/// What was wrong with the line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadErrorKind {
    #[error("unknown tag '{0}'")]
    UnknownTag(String),

    #[error("unknown key '{key}' for {tag}")]
    UnknownKey { tag: Tag, key: String },

    #[error("empty key or value in '{0}'")]
    EmptyField(String),

    #[error("key '{0}' given more than once")]
    DuplicateKey(String),

    #[error("{tag} is missing required key '{key}'")]
    MissingKey { tag: Tag, key: &'static str },

    #[error("'{key}' must be a non-negative integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("unknown queue type '{0}'")]
    UnknownQueueType(String),

    #[error("invalid {key} endpoint '{value}'")]
    InvalidEndpoint { key: &'static str, value: String },

    /// The factory refused the node or link (duplicate identity, unknown
    /// node reference, zero interval).
    #[error(transparent)]
    Factory(#[from] FactoryError),
}

// ===========================================================================
// Line parsing
// ===========================================================================

/// A tag with its `key=value` pairs.
#[derive(Debug)]
struct ParsedLine<'a> {
    tag: Tag,
    fields: BTreeMap<&'a str, &'a str>,
}

impl<'a> ParsedLine<'a> {
    fn field(&self, key: &'static str) -> Result<&'a str, LoadErrorKind> {
        self.fields
            .get(key)
            .copied()
            .ok_or(LoadErrorKind::MissingKey { tag: self.tag, key })
    }

    fn number<T: FromStr>(&self, key: &'static str) -> Result<T, LoadErrorKind> {
        let value = self.field(key)?;
        value.parse().map_err(|_| LoadErrorKind::InvalidNumber {
            key,
            value: value.to_string(),
        })
    }

    fn link(&self) -> Result<(SenderId, ReceiverId), LoadErrorKind> {
        let src = self.field(KEY_SRC)?;
        let dest = self.field(KEY_DEST)?;
        let sender = syntax::parse_sender(src).ok_or_else(|| LoadErrorKind::InvalidEndpoint {
            key: KEY_SRC,
            value: src.to_string(),
        })?;
        let receiver =
            syntax::parse_receiver(dest).ok_or_else(|| LoadErrorKind::InvalidEndpoint {
                key: KEY_DEST,
                value: dest.to_string(),
            })?;
        Ok((sender, receiver))
    }
}

fn parse_line(line: &str) -> Result<ParsedLine<'_>, LoadErrorKind> {
    let mut tokens = line.split_whitespace();
    let name = tokens.next().unwrap_or_default();
    let tag = Tag::parse(name).ok_or_else(|| LoadErrorKind::UnknownTag(name.to_string()))?;

    let mut fields = BTreeMap::new();
    for token in tokens {
        let (key, value) = token.split_once('=').unwrap_or((token, ""));
        if key.is_empty() || value.is_empty() {
            return Err(LoadErrorKind::EmptyField(token.to_string()));
        }
        if !tag.keys().iter().any(|known| *known == key) {
            return Err(LoadErrorKind::UnknownKey {
                tag,
                key: key.to_string(),
            });
        }
        if fields.insert(key, value).is_some() {
            return Err(LoadErrorKind::DuplicateKey(key.to_string()));
        }
    }
    Ok(ParsedLine { tag, fields })
}

fn add_node(factory: &mut Factory, parsed: &ParsedLine<'_>) -> Result<(), LoadErrorKind> {
    match parsed.tag {
        Tag::LoadingRamp => {
            let ramp = Ramp::new(parsed.number(KEY_ID)?, parsed.number(KEY_DELIVERY_INTERVAL)?);
            factory.add_ramp(ramp)?;
        }
        Tag::Worker => {
            let id = parsed.number(KEY_ID)?;
            let duration = parsed.number(KEY_PROCESSING_TIME)?;
            let name = parsed.field(KEY_QUEUE_TYPE)?;
            let kind = syntax::parse_queue_kind(name)
                .ok_or_else(|| LoadErrorKind::UnknownQueueType(name.to_string()))?;
            factory.add_worker(Worker::new(id, duration, kind))?;
        }
        Tag::Storehouse => {
            factory.add_storehouse(Storehouse::new(parsed.number(KEY_ID)?))?;
        }
        Tag::Link => {}
    }
    Ok(())
}

// ===========================================================================
// Loading
// ===========================================================================

/// Parse topology text into a factory.
///
/// Blank lines and lines starting with `;` are skipped. Duplicate `LINK`
/// lines are accepted and collapse into one edge.
pub fn load_factory_structure(text: &str) -> Result<Factory, LoadError> {
    let mut factory = Factory::new();
    let mut links = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let at = |kind| LoadError { line, kind };

        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }
        let parsed = parse_line(trimmed).map_err(at)?;
        if parsed.tag == Tag::Link {
            links.push((line, parsed.link().map_err(at)?));
        } else {
            add_node(&mut factory, &parsed).map_err(at)?;
        }
    }

    for (line, (sender, receiver)) in links {
        let added = factory.link(sender, receiver).map_err(|e| LoadError {
            line,
            kind: e.into(),
        })?;
        if !added {
            tracing::debug!(line, %sender, %receiver, "duplicate link ignored");
        }
    }

    tracing::debug!(
        ramps = factory.ramps().len(),
        workers = factory.workers().len(),
        storehouses = factory.storehouses().len(),
        "loaded factory structure"
    );
    Ok(factory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsim_core::factory::NodeKind;
    use netsim_core::id::ElementId;
    use netsim_core::storage::QueueKind;
    use netsim_core::test_utils::*;

    const TOPOLOGY: &str = "\
; a small line with a side branch
LOADING_RAMP id=1 delivery-interval=3
LOADING_RAMP id=2 delivery-interval=2

WORKER id=1 processing-time=2 queue-type=FIFO
WORKER id=2 processing-time=1 queue-type=LIFO
STOREHOUSE id=1

LINK src=ramp-1 dest=worker-1
LINK src=ramp-2 dest=worker-1
LINK src=ramp-2 dest=worker-2
LINK src=worker-1 dest=store-1
LINK src=worker-2 dest=store-1
";

    fn load_err(text: &str) -> LoadError {
        load_factory_structure(text).unwrap_err()
    }

    #[test]
    fn loads_nodes_and_links() {
        let factory = load_factory_structure(TOPOLOGY).unwrap();
        assert_eq!(factory.ramps().len(), 2);
        assert_eq!(factory.find_ramp_by_id(1).unwrap().delivery_interval(), 3);

        let worker = factory.find_worker_by_id(2).unwrap();
        assert_eq!(worker.processing_duration(), 1);
        assert_eq!(worker.queue().kind(), QueueKind::Lifo);
        assert!(factory.find_storehouse_by_id(1).is_some());

        let prefs = &factory.sender(ramp_id(2)).unwrap().receiver_preferences;
        assert_eq!(prefs.probability(to_worker(1)), Some(0.5));
        assert_eq!(prefs.probability(to_worker(2)), Some(0.5));
        assert!(factory.is_consistent());
    }

    #[test]
    fn links_may_precede_their_nodes() {
        let text = "LINK src=ramp-1 dest=store-1\nSTOREHOUSE id=1\nLOADING_RAMP id=1 delivery-interval=1\n";
        let factory = load_factory_structure(text).unwrap();
        assert!(factory.is_consistent());
    }

    #[test]
    fn empty_text_is_an_empty_factory() {
        let factory = load_factory_structure("\n; nothing here\n   \n").unwrap();
        assert!(factory.ramps().is_empty());
        assert!(factory.workers().is_empty());
        assert!(factory.storehouses().is_empty());
    }

    #[test]
    fn unknown_tag_reports_its_line() {
        let err = load_err("STOREHOUSE id=1\n\nFURNACE id=2\n");
        assert_eq!(err.line, 3);
        assert_eq!(err.kind, LoadErrorKind::UnknownTag("FURNACE".into()));
        assert_eq!(err.to_string(), "line 3: unknown tag 'FURNACE'");
    }

    #[test]
    fn field_errors() {
        assert_eq!(
            load_err("STOREHOUSE id=1 colour=red").kind,
            LoadErrorKind::UnknownKey {
                tag: Tag::Storehouse,
                key: "colour".into()
            }
        );
        assert_eq!(
            load_err("STOREHOUSE id=").kind,
            LoadErrorKind::EmptyField("id=".into())
        );
        assert_eq!(
            load_err("STOREHOUSE id").kind,
            LoadErrorKind::EmptyField("id".into())
        );
        assert_eq!(
            load_err("STOREHOUSE id=1 id=2").kind,
            LoadErrorKind::DuplicateKey("id".into())
        );
        assert_eq!(
            load_err("WORKER id=1 queue-type=FIFO").kind,
            LoadErrorKind::MissingKey {
                tag: Tag::Worker,
                key: KEY_PROCESSING_TIME
            }
        );
    }

    #[test]
    fn value_errors() {
        assert_eq!(
            load_err("LOADING_RAMP id=one delivery-interval=2").kind,
            LoadErrorKind::InvalidNumber {
                key: KEY_ID,
                value: "one".into()
            }
        );
        assert_eq!(
            load_err("LOADING_RAMP id=1 delivery-interval=-2").kind,
            LoadErrorKind::InvalidNumber {
                key: KEY_DELIVERY_INTERVAL,
                value: "-2".into()
            }
        );
        assert_eq!(
            load_err("WORKER id=1 processing-time=2 queue-type=PRIORITY").kind,
            LoadErrorKind::UnknownQueueType("PRIORITY".into())
        );
        assert!(matches!(
            load_err("LOADING_RAMP id=1 delivery-interval=0").kind,
            LoadErrorKind::Factory(FactoryError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let err = load_err("STOREHOUSE id=4\nWORKER id=4 processing-time=1 queue-type=FIFO\nSTOREHOUSE id=4\n");
        assert_eq!(err.line, 3);
        assert_eq!(
            err.kind,
            LoadErrorKind::Factory(FactoryError::DuplicateIdentity {
                kind: NodeKind::Storehouse,
                id: ElementId(4)
            })
        );
    }

    #[test]
    fn link_errors() {
        assert_eq!(
            load_err("STOREHOUSE id=1\nLINK src=store-1 dest=store-1").kind,
            LoadErrorKind::InvalidEndpoint {
                key: KEY_SRC,
                value: "store-1".into()
            }
        );
        assert_eq!(
            load_err("LOADING_RAMP id=1 delivery-interval=1\nLINK src=ramp-1 dest=ramp-1").kind,
            LoadErrorKind::InvalidEndpoint {
                key: KEY_DEST,
                value: "ramp-1".into()
            }
        );
        assert_eq!(
            load_err("LINK src=ramp-1").kind,
            LoadErrorKind::MissingKey {
                tag: Tag::Link,
                key: KEY_DEST
            }
        );

        let err = load_err("LOADING_RAMP id=1 delivery-interval=1\n; gap\nLINK src=ramp-1 dest=worker-5\n");
        assert_eq!(err.line, 3);
        assert_eq!(
            err.kind,
            LoadErrorKind::Factory(FactoryError::UnknownIdentity {
                kind: NodeKind::Worker,
                id: ElementId(5)
            })
        );
    }

    #[test]
    fn duplicate_links_collapse() {
        let text = "LOADING_RAMP id=1 delivery-interval=1\nSTOREHOUSE id=1\nLINK src=ramp-1 dest=store-1\nLINK src=ramp-1 dest=store-1\n";
        let factory = load_factory_structure(text).unwrap();
        let prefs = &factory.sender(ramp_id(1)).unwrap().receiver_preferences;
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs.probability(to_store(1)), Some(1.0));
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let text = "STOREHOUSE id=1\r\nLOADING_RAMP id=1 delivery-interval=2\r\nLINK src=ramp-1 dest=store-1\r\n";
        let factory = load_factory_structure(text).unwrap();
        assert!(factory.is_consistent());
    }

    #[test]
    fn largest_processing_time_loads_and_runs() {
        let text = "\
LOADING_RAMP id=1 delivery-interval=18446744073709551615
WORKER id=1 processing-time=18446744073709551615 queue-type=FIFO
STOREHOUSE id=1
LINK src=ramp-1 dest=worker-1
LINK src=worker-1 dest=store-1
";
        let mut factory = load_factory_structure(text).unwrap();
        assert_eq!(factory.find_worker_by_id(1).unwrap().processing_duration(), u64::MAX);
        run_ticks(&mut factory, 1, 3);
        assert_eq!(
            factory.locate_package(netsim_core::id::PackageId(1)),
            Some(netsim_core::factory::PackageLocation::Processing(ElementId(1)))
        );
        assert_eq!(factory.delivered_count(), 0);
    }
}
