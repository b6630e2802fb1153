//! Move validation and selection staging for Wildcard.
//!
//! Everything here is synchronous and pure with respect to the network:
//! it reads the session state, decides what the local player may do, and
//! produces [`Action`](wildcard_protocol::Action)s for the caller to send.
//!
//! # Key types
//!
//! - [`rules`]: advisory legality checks ([`rules::can_play_card`])
//! - [`Selection`]: staged cards, Wild color resolution, in-flight guard
//! - [`TableError`]: why a local action was refused

mod error;
pub mod rules;
mod selection;

pub use error::TableError;
pub use selection::{PlayOutcome, Selection, Toggle};
