#![warn(missing_docs)]
//! Core primitives shared across the workspace: grid positions, bounds and
//! the coordinate arithmetic between tile space, chunk space and chunk-local
//! space.

mod bounds;
mod color;
pub mod coords;
mod position;

pub use bounds::*;
pub use color::*;
pub use position::*;
