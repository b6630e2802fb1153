//! Advisory legality checks.
//!
//! These mirror the authority's matching rule closely enough to give
//! immediate feedback. The authority still has the final word.

use wildcard_protocol::{Card, CardValue};

use crate::TableError;

/// Whether `card` may be staged given the discard `top` and the cards
/// already staged.
///
/// - No top card: nothing is playable.
/// - Non-empty selection: only cards of the first staged card's value.
/// - Otherwise: same color, same value, a Wild-valued card (whatever its
///   color), or a top card whose color is still Wild.
pub fn can_play_card(top: Option<&Card>, selection: &[Card], card: &Card) -> bool {
    check_card(top, selection, card).is_ok()
}

/// Same-value check for stacking `card` onto a play started by `first`.
pub fn can_stack(first: &Card, card: &Card) -> bool {
    first.value == card.value
}

fn is_wild_value(value: CardValue) -> bool {
    matches!(value, CardValue::Wild | CardValue::WildDrawFour)
}

/// Like [`can_play_card`], but says why not.
pub fn check_card(
    top: Option<&Card>,
    selection: &[Card],
    card: &Card,
) -> Result<(), TableError> {
    let top = top.ok_or(TableError::NoDiscard)?;

    if let Some(first) = selection.first() {
        return if can_stack(first, card) {
            Ok(())
        } else {
            Err(TableError::RankMismatch {
                expected: first.value,
                got: card.value,
            })
        };
    }

    let matches = card.color == top.color
        || card.value == top.value
        || card.color.is_wild()
        || is_wild_value(card.value)
        || top.color.is_wild();
    if matches {
        Ok(())
    } else {
        Err(TableError::IllegalCard(card.clone()))
    }
}
