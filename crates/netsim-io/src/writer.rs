//! Writes a factory's structure back out as topology text.
//!
//! Output is canonical: one section per node kind, nodes sorted by identity,
//! links sorted by source then destination. Loading canonical text and saving
//! it again reproduces the text byte for byte.

use crate::syntax::{self, Tag};
use netsim_core::factory::Factory;
use netsim_core::id::{ReceiverId, SenderId};
use netsim_core::node::Node;
use std::io::{self, Write};

/// Errors from writing topology text.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("failed to write factory structure: {0}")]
    Io(#[from] io::Error),
}

fn section(text: &mut String, title: &str) {
    text.push_str(&format!("\n; == {title} ==\n\n"));
}

/// Every routing edge in canonical order.
fn links(factory: &Factory) -> Vec<(SenderId, ReceiverId)> {
    let mut links: Vec<(SenderId, ReceiverId)> = factory
        .sender_ids()
        .into_iter()
        .filter_map(|id| factory.sender(id).map(|sender| (id, sender)))
        .flat_map(|(id, sender)| {
            sender
                .receiver_preferences
                .receivers()
                .map(move |receiver| (id, receiver))
        })
        .collect();
    links.sort();
    links
}

/// Canonical topology text of `factory`.
pub fn factory_structure_to_string(factory: &Factory) -> String {
    let mut text = String::new();

    section(&mut text, "LOADING RAMPS");
    for ramp in factory.ramps().iter() {
        text.push_str(&format!(
            "{} id={} delivery-interval={}\n",
            Tag::LoadingRamp,
            ramp.id(),
            ramp.delivery_interval()
        ));
    }

    section(&mut text, "WORKERS");
    for worker in factory.workers().iter() {
        text.push_str(&format!(
            "{} id={} processing-time={} queue-type={}\n",
            Tag::Worker,
            worker.id(),
            worker.processing_duration(),
            worker.queue().kind()
        ));
    }

    section(&mut text, "STOREHOUSES");
    for storehouse in factory.storehouses().iter() {
        text.push_str(&format!("{} id={}\n", Tag::Storehouse, storehouse.id()));
    }

    section(&mut text, "LINKS");
    for (sender, receiver) in links(factory) {
        text.push_str(&format!(
            "{} src={} dest={}\n",
            Tag::Link,
            syntax::sender_token(sender),
            syntax::receiver_token(receiver)
        ));
    }
    text
}

/// Write the topology of `factory` in canonical form.
pub fn save_factory_structure(factory: &Factory, out: &mut impl Write) -> Result<(), SaveError> {
    out.write_all(factory_structure_to_string(factory).as_bytes())?;
    out.flush()?;
    Ok(())
}
