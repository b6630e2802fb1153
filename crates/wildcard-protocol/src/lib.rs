//! Wire protocol for Wildcard.
//!
//! This crate defines what travels between the client and the game
//! authority:
//!
//! - **Types** ([`Card`], [`Player`], [`GameSnapshot`], ...) for the card
//!   model and the records the authority pushes.
//! - **Messages** ([`ServerEvent`] inbound, [`Action`] outbound) and the
//!   [`Frame`] envelope.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) converting messages to and
//!   from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (ServerEvent) → Session (store)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use message::{Action, Frame, ServerEvent};
pub use types::{
    Card, CardValue, Color, Direction, GameId, GameSnapshot, LobbyGame,
    PlayedCards, Player, PlayerId, RosterEntry,
};
