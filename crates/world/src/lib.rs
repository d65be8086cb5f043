//! Chunked world model: chunks, per-tile metadata, persistence and the
//! reference-counted chunk store.
#![warn(missing_docs)]

mod chunk;
mod chunk_data;
mod error;
mod generation;
mod info;
mod persist;
mod world;

pub use chunk::*;
pub use chunk_data::*;
pub use error::*;
pub use generation::*;
pub use info::*;
pub use persist::*;
pub use world::*;
