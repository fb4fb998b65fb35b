//! kind cluster resource model
//!
//! Declarative description of a kind cluster as written by operators, plus the
//! computed state produced by a successful reconciliation.

pub mod cluster;
pub mod node;
pub mod state;

pub use cluster::*;
pub use node::*;
pub use state::*;
