//! The process-wide game data registry.
//!
//! Lifecycle: load the static data file, let the embedder add data-pack
//! entries and tags, then `finalize` exactly once before listening. After
//! finalization everything is immutable and the clientbound
//! `registry_data`/`update_tags` packets are pre-encoded.

pub mod block_states;
pub mod error;
pub mod registry;

pub use block_states::{state_key, BlockStates, StateQuery};
pub use error::{Error, Result};
pub use registry::{DataEntry, IdMap, Registry};
