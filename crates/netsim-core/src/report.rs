//! Human-readable reports: the network's structure and per-turn state.

use crate::factory::Factory;
use crate::id::{ReceiverKind, Time};
use crate::node::{Node, PackageReceiver};
use crate::package::Package;
use crate::routing::ReceiverPreferences;
use std::io::{self, Write};

fn receiver_lines(preferences: &ReceiverPreferences) -> Vec<String> {
    let mut lines: Vec<String> = preferences
        .receivers()
        .map(|r| match r.kind {
            ReceiverKind::Worker => format!("worker #{}", r.id),
            ReceiverKind::Storehouse => format!("storehouse #{}", r.id),
        })
        .collect();
    lines.sort();
    lines
}

fn package_list<'a>(packages: impl Iterator<Item = &'a Package>) -> String {
    let ids: Vec<String> = packages.map(|p| format!("#{}", p.id())).collect();
    if ids.is_empty() {
        "(empty)".to_string()
    } else {
        ids.join(", ")
    }
}

fn buffer(package: Option<&Package>) -> String {
    match package {
        Some(p) => format!("#{}", p.id()),
        None => "(empty)".to_string(),
    }
}

/// Describe every node and its receivers.
pub fn generate_structure_report(factory: &Factory, out: &mut impl Write) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "== LOADING RAMPS ==")?;
    writeln!(out)?;
    for ramp in factory.ramps().iter() {
        writeln!(out, "LOADING RAMP #{}", ramp.id())?;
        writeln!(out, "  Delivery interval: {}", ramp.delivery_interval())?;
        writeln!(out, "  Receivers:")?;
        for line in receiver_lines(&ramp.sender.receiver_preferences) {
            writeln!(out, "    {line}")?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    writeln!(out, "== WORKERS ==")?;
    writeln!(out)?;
    for worker in factory.workers().iter() {
        writeln!(out, "WORKER #{}", worker.id())?;
        writeln!(out, "  Processing time: {}", worker.processing_duration())?;
        writeln!(out, "  Queue type: {}", worker.queue().kind())?;
        writeln!(out, "  Receivers:")?;
        for line in receiver_lines(&worker.sender.receiver_preferences) {
            writeln!(out, "    {line}")?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    writeln!(out, "== STOREHOUSES ==")?;
    writeln!(out)?;
    for storehouse in factory.storehouses().iter() {
        writeln!(out, "STOREHOUSE #{}", storehouse.id())?;
        writeln!(out)?;
    }
    out.flush()
}

/// Describe the state of workers and storehouses after turn `t`.
pub fn generate_simulation_turn_report(
    factory: &Factory,
    out: &mut impl Write,
    t: Time,
) -> io::Result<()> {
    writeln!(out, "=== [ Turn: {t} ] ===")?;
    writeln!(out)?;
    writeln!(out, "== WORKERS ==")?;
    for worker in factory.workers().iter() {
        writeln!(out)?;
        writeln!(out, "WORKER #{}", worker.id())?;
        match worker.current() {
            Some(current) => writeln!(
                out,
                "  PBuffer: #{} (pt = {})",
                current.package.id(),
                t.saturating_sub(current.started_at) + 1
            )?,
            None => writeln!(out, "  PBuffer: (empty)")?,
        }
        writeln!(out, "  Queue: {}", package_list(worker.queue().iter()))?;
        writeln!(out, "  SBuffer: {}", buffer(worker.sender.sending_buffer()))?;
    }

    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "== STOREHOUSES ==")?;
    for storehouse in factory.storehouses().iter() {
        writeln!(out)?;
        writeln!(out, "STOREHOUSE #{}", storehouse.id())?;
        writeln!(out, "  Stock: {}", package_list(storehouse.stockpile().iter()))?;
    }
    writeln!(out)?;
    out.flush()
}
