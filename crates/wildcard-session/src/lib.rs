//! Session state for Wildcard clients.
//!
//! The [`SessionStore`] is the single mutable record of everything the
//! authority has told us: who we are, the lobby, the roster, and the
//! current game. It is updated only through [`SessionStore::apply`];
//! everything else reads it through selectors.
//!
//! # How it fits in the stack
//!
//! ```text
//! Table Layer (above)   ← reads the hand, discard top and turn flag
//!     ↕
//! Session Layer (this crate)  ← mirrors authority state
//!     ↕
//! Protocol Layer (below)  ← provides ServerEvent and the card model
//! ```

mod store;

pub use store::{Applied, Changes, SessionStore};
