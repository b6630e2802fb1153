//! Error types for the table layer.

use wildcard_protocol::{Card, CardValue};

/// Why a local action was refused before reaching the authority.
///
/// None of these are fatal. The caller drops the action and may surface
/// the reason to the player.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// No card on the discard pile, so no round is running.
    #[error("no card on the discard pile")]
    NoDiscard,

    /// It is someone else's turn.
    #[error("not your turn")]
    NotYourTurn,

    /// The card matches neither the color nor the value of the top card.
    #[error("{0} can't be played on the current discard")]
    IllegalCard(Card),

    /// A multi-card play must share the first card's value.
    #[error("selection is locked to {expected}, got {got}")]
    RankMismatch {
        expected: CardValue,
        got: CardValue,
    },

    /// The hand has no card at this position.
    #[error("no card at hand slot {0}")]
    BadSlot(usize),

    /// Nothing is staged.
    #[error("no cards selected")]
    EmptySelection,

    /// A play has been submitted and not yet sent or cancelled.
    #[error("a play is already in flight")]
    InFlight,

    /// A color was chosen but no Wild card is waiting for one.
    #[error("no color choice pending")]
    NoColorPending,

    /// `Wild` is not a color a card can be resolved to.
    #[error("choose red, blue, green, or yellow")]
    WildColor,
}
