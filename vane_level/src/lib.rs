pub mod chunk;
pub mod error;
pub mod provider;

pub use chunk::{Chunk, Section, SECTION_VOLUME};
pub use error::{Error, Result};
pub use provider::{ChunkProvider, RegionLoader, SuperflatGenerator};
