//! Text topology files for NetSim factories.
//!
//! A topology file lists nodes and routing edges, one per line:
//!
//! ```text
//! ; comment
//! LOADING_RAMP id=1 delivery-interval=3
//! WORKER id=1 processing-time=2 queue-type=FIFO
//! STOREHOUSE id=1
//! LINK src=ramp-1 dest=worker-1
//! LINK src=worker-1 dest=store-1
//! ```
//!
//! [`load_factory_structure`] builds a [`Factory`](netsim_core::factory::Factory)
//! from such text and [`save_factory_structure`] writes one back in canonical
//! form.

pub mod loader;
pub mod syntax;
pub mod writer;

pub use loader::{LoadError, LoadErrorKind, load_factory_structure};
pub use writer::{SaveError, factory_structure_to_string, save_factory_structure};
