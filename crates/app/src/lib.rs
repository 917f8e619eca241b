//! Composition root: wires explicitly constructed collaborators together.

pub mod context;

pub use context::{AppContext, OwnerContext};
