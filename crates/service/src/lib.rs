//! Async front door for a [`tilestream_world::World`]: a single worker
//! thread applies chunk operations strictly in arrival order, and cloneable
//! handles submit them from any task.
#![warn(missing_docs)]

mod handle;
mod ops;
mod service;
mod viewport;

pub use handle::WorldHandle;
pub use ops::ChunkOp;
pub use service::WorldService;
pub use viewport::Viewport;
