//! Selection staging: the cards the local player has picked but not sent.
//!
//! ```text
//!            toggle()                play()              mark_sent()
//!  [empty] ───────────→ [staged] ───────────→ [in flight] ──────────→ [empty]
//!                          │  ↑                    │
//!              NeedsColor  │  │ choose_color()     │ mark_cancelled()
//!                          ↓  │                    ↓
//!                    [color pending]           [staged]
//! ```
//!
//! Cards are staged by hand slot, so two identical cards in the hand stay
//! distinguishable. A staged Wild keeps its source card; choosing a color
//! builds a new card for the selection and never touches the hand.

use wildcard_protocol::{Action, Card, Color, GameId};

use crate::{TableError, rules};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Staged {
    slot: usize,
    /// The card as it sits in the hand.
    source: Card,
    /// The card as it will be sent; differs from `source` once a Wild's
    /// color is chosen.
    card: Card,
}

/// Result of [`Selection::toggle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Staged,
    Unstaged,
    Rejected(TableError),
}

/// Result of [`Selection::play`] and [`Selection::choose_color`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Ready to send. The selection is now in flight.
    Ready(Action),
    /// A staged Wild needs a color before anything can be sent.
    NeedsColor,
    Rejected(TableError),
}

/// The pending multi-card play.
///
/// Invariant: every staged card has the same value as the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    staged: Vec<Staged>,
    color_pending: bool,
    in_flight: bool,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages or unstages the card at `slot` in `hand`.
    ///
    /// Unstaging is always allowed. Staging requires `my_turn` and a card
    /// that passes [`rules::check_card`]. Nothing changes while a play is in
    /// flight.
    pub fn toggle(
        &mut self,
        slot: usize,
        hand: &[Card],
        top: Option<&Card>,
        my_turn: bool,
    ) -> Toggle {
        if self.in_flight {
            return Toggle::Rejected(TableError::InFlight);
        }

        if let Some(pos) = self.staged.iter().position(|s| s.slot == slot) {
            self.staged.remove(pos);
            self.color_pending = false;
            return Toggle::Unstaged;
        }

        let Some(card) = hand.get(slot) else {
            return Toggle::Rejected(TableError::BadSlot(slot));
        };
        if !my_turn {
            return Toggle::Rejected(TableError::NotYourTurn);
        }
        let staged: Vec<Card> = self.cards().cloned().collect();
        if let Err(err) = rules::check_card(top, &staged, card) {
            return Toggle::Rejected(err);
        }

        self.staged.push(Staged {
            slot,
            source: card.clone(),
            card: card.clone(),
        });
        self.color_pending = false;
        Toggle::Staged
    }

    /// Submits the selection.
    ///
    /// Produces a `play_cards` action for the game, or raises a color
    /// request if a staged Wild is unresolved. After `Ready`, the selection
    /// stays in flight until [`mark_sent`](Self::mark_sent) or
    /// [`mark_cancelled`](Self::mark_cancelled).
    pub fn play(&mut self, game_id: GameId) -> PlayOutcome {
        if self.in_flight {
            return PlayOutcome::Rejected(TableError::InFlight);
        }
        if self.staged.is_empty() {
            return PlayOutcome::Rejected(TableError::EmptySelection);
        }
        if self.staged.iter().any(|s| s.card.needs_color()) {
            self.color_pending = true;
            return PlayOutcome::NeedsColor;
        }

        self.color_pending = false;
        self.in_flight = true;
        PlayOutcome::Ready(Action::PlayCards {
            cards: self.cards().cloned().collect(),
            game_id,
        })
    }

    /// Resolves the first unresolved Wild to `color` and resumes
    /// [`play`](Self::play).
    pub fn choose_color(&mut self, color: Color, game_id: GameId) -> PlayOutcome {
        if !self.color_pending {
            return PlayOutcome::Rejected(TableError::NoColorPending);
        }
        if color.is_wild() {
            return PlayOutcome::Rejected(TableError::WildColor);
        }
        let Some(wild) = self.staged.iter_mut().find(|s| s.card.needs_color()) else {
            self.color_pending = false;
            return PlayOutcome::Rejected(TableError::NoColorPending);
        };
        wild.card = wild.card.with_color(color);
        self.color_pending = false;
        self.play(game_id)
    }

    /// Closes an open color request, keeping the staged cards. Returns
    /// whether a request was open.
    pub fn cancel_color(&mut self) -> bool {
        std::mem::take(&mut self.color_pending)
    }

    /// The submitted play left for the authority: clear everything.
    pub fn mark_sent(&mut self) {
        self.clear();
    }

    /// The submitted play was not sent. The cards go back to staged.
    pub fn mark_cancelled(&mut self) {
        self.in_flight = false;
    }

    /// Abandons the selection and returns a `draw_card` action.
    pub fn draw(&mut self, game_id: GameId) -> Result<Action, TableError> {
        if self.in_flight {
            return Err(TableError::InFlight);
        }
        self.clear();
        Ok(Action::DrawCard { game_id })
    }

    /// Drops staged cards whose hand slot no longer holds the same card.
    /// Returns how many were dropped. An in-flight selection is left alone.
    pub fn reconcile(&mut self, hand: &[Card]) -> usize {
        if self.in_flight {
            return 0;
        }
        let before = self.staged.len();
        self.staged.retain(|s| hand.get(s.slot) == Some(&s.source));
        let dropped = before - self.staged.len();
        if dropped > 0 {
            tracing::debug!(dropped, "hand changed under the selection");
            if !self.staged.iter().any(|s| s.card.needs_color()) {
                self.color_pending = false;
            }
        }
        dropped
    }

    /// Empties the selection and closes any color request.
    pub fn clear(&mut self) {
        self.staged.clear();
        self.color_pending = false;
        self.in_flight = false;
    }

    /// Staged cards in staging order, with any chosen colors applied.
    pub fn cards(&self) -> impl Iterator<Item = &Card> + '_ {
        self.staged.iter().map(|s| &s.card)
    }

    /// Hand slots of the staged cards, in staging order.
    pub fn slots(&self) -> Vec<usize> {
        self.staged.iter().map(|s| s.slot).collect()
    }

    pub fn is_staged(&self, slot: usize) -> bool {
        self.staged.iter().any(|s| s.slot == slot)
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Whether a Wild is waiting on a color choice.
    pub fn color_pending(&self) -> bool {
        self.color_pending
    }

    /// Whether the staged cards are being played.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use wildcard_protocol::CardValue;

    use super::*;

    const GAME: GameId = GameId(1);

    fn card(color: Color, value: CardValue) -> Card {
        Card::new(color, value)
    }

    fn n(color: Color, v: u8) -> Card {
        card(color, CardValue::Number(v))
    }

    #[test]
    fn test_toggle_stages_then_unstages() {
        let hand = [n(Color::Red, 3), n(Color::Blue, 7)];
        let top = n(Color::Red, 7);
        let mut sel = Selection::new();

        assert_eq!(sel.toggle(1, &hand, Some(&top), true), Toggle::Staged);
        assert!(sel.is_staged(1));
        assert_eq!(sel.toggle(1, &hand, Some(&top), true), Toggle::Unstaged);
        assert_eq!(sel, Selection::new());
    }

    #[test]
    fn test_toggle_twice_restores_membership() {
        let hand = [n(Color::Yellow, 5), n(Color::Blue, 5), n(Color::Green, 5)];
        let top = n(Color::Yellow, 1);
        let mut sel = Selection::new();
        sel.toggle(0, &hand, Some(&top), true);
        sel.toggle(2, &hand, Some(&top), true);
        let before = sel.slots();

        for slot in 0..hand.len() {
            sel.toggle(slot, &hand, Some(&top), true);
            sel.toggle(slot, &hand, Some(&top), true);
            let mut now = sel.slots();
            let mut expected = before.clone();
            now.sort_unstable();
            expected.sort_unstable();
            assert_eq!(now, expected, "slot {slot}");
        }
    }

    #[test]
    fn test_toggle_rank_locked_after_first_card() {
        let hand = [n(Color::Yellow, 5), n(Color::Blue, 5), n(Color::Blue, 2)];
        let top = n(Color::Yellow, 9);
        let mut sel = Selection::new();

        assert_eq!(sel.toggle(0, &hand, Some(&top), true), Toggle::Staged);
        assert_eq!(sel.toggle(1, &hand, Some(&top), true), Toggle::Staged);
        assert!(matches!(
            sel.toggle(2, &hand, Some(&top), true),
            Toggle::Rejected(TableError::RankMismatch { .. })
        ));
        assert_eq!(sel.len(), 2);
    }

    #[test]
    fn test_toggle_not_my_turn_is_rejected_but_unstage_allowed() {
        let hand = [n(Color::Red, 3)];
        let top = n(Color::Red, 7);
        let mut sel = Selection::new();

        assert_eq!(
            sel.toggle(0, &hand, Some(&top), false),
            Toggle::Rejected(TableError::NotYourTurn)
        );
        sel.toggle(0, &hand, Some(&top), true);
        assert_eq!(sel.toggle(0, &hand, Some(&top), false), Toggle::Unstaged);
    }

    #[test]
    fn test_toggle_bad_slot_and_no_top() {
        let hand = [n(Color::Red, 3)];
        let mut sel = Selection::new();
        assert_eq!(
            sel.toggle(4, &hand, None, true),
            Toggle::Rejected(TableError::BadSlot(4))
        );
        assert_eq!(
            sel.toggle(0, &hand, None, true),
            Toggle::Rejected(TableError::NoDiscard)
        );
    }

    #[test]
    fn test_play_builds_play_cards_and_goes_in_flight() {
        let hand = [n(Color::Red, 3)];
        let top = n(Color::Red, 7);
        let mut sel = Selection::new();
        sel.toggle(0, &hand, Some(&top), true);

        let outcome = sel.play(GAME);
        assert_eq!(
            outcome,
            PlayOutcome::Ready(Action::PlayCards {
                cards: vec![n(Color::Red, 3)],
                game_id: GAME,
            })
        );
        assert!(sel.in_flight());

        // Second submit while the first is pending is refused.
        assert_eq!(sel.play(GAME), PlayOutcome::Rejected(TableError::InFlight));
        assert_eq!(
            sel.toggle(0, &hand, Some(&top), true),
            Toggle::Rejected(TableError::InFlight)
        );
        assert_eq!(sel.draw(GAME), Err(TableError::InFlight));

        sel.mark_sent();
        assert!(sel.is_empty());
        assert!(!sel.in_flight());
    }

    #[test]
    fn test_play_empty_is_rejected() {
        assert_eq!(
            Selection::new().play(GAME),
            PlayOutcome::Rejected(TableError::EmptySelection)
        );
    }

    #[test]
    fn test_wild_needs_color_then_resolves_without_touching_hand() {
        let hand = [card(Color::Wild, CardValue::Wild)];
        let top = n(Color::Red, 7);
        let mut sel = Selection::new();
        sel.toggle(0, &hand, Some(&top), true);

        assert_eq!(sel.play(GAME), PlayOutcome::NeedsColor);
        assert!(sel.color_pending());
        assert!(!sel.in_flight());

        let outcome = sel.choose_color(Color::Blue, GAME);
        let PlayOutcome::Ready(Action::PlayCards { cards, .. }) = outcome else {
            panic!("expected ready play, got {outcome:?}");
        };
        assert_eq!(cards, vec![card(Color::Blue, CardValue::Wild)]);
        assert_eq!(hand[0].color, Color::Wild);
        assert!(!sel.color_pending());
    }

    #[test]
    fn test_two_wilds_need_two_choices() {
        let hand = [
            card(Color::Wild, CardValue::WildDrawFour),
            card(Color::Wild, CardValue::WildDrawFour),
        ];
        let top = n(Color::Green, 2);
        let mut sel = Selection::new();
        sel.toggle(0, &hand, Some(&top), true);
        sel.toggle(1, &hand, Some(&top), true);

        assert_eq!(sel.play(GAME), PlayOutcome::NeedsColor);
        assert_eq!(sel.choose_color(Color::Red, GAME), PlayOutcome::NeedsColor);
        let PlayOutcome::Ready(action) = sel.choose_color(Color::Yellow, GAME) else {
            panic!("expected ready play");
        };
        let colors: Vec<Color> = action.cards().iter().map(|c| c.color).collect();
        assert_eq!(colors, vec![Color::Red, Color::Yellow]);
    }

    #[test]
    fn test_choose_color_rejects_wild_and_unrequested() {
        let hand = [card(Color::Wild, CardValue::Wild)];
        let top = n(Color::Red, 7);
        let mut sel = Selection::new();
        sel.toggle(0, &hand, Some(&top), true);

        assert_eq!(
            sel.choose_color(Color::Green, GAME),
            PlayOutcome::Rejected(TableError::NoColorPending)
        );
        sel.play(GAME);
        assert_eq!(
            sel.choose_color(Color::Wild, GAME),
            PlayOutcome::Rejected(TableError::WildColor)
        );
        assert!(sel.color_pending());
    }

    #[test]
    fn test_cancel_color_keeps_selection() {
        let hand = [card(Color::Wild, CardValue::Wild)];
        let top = n(Color::Red, 7);
        let mut sel = Selection::new();
        sel.toggle(0, &hand, Some(&top), true);
        sel.play(GAME);

        assert!(sel.cancel_color());
        assert!(!sel.cancel_color());
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_mark_cancelled_returns_cards_to_staged() {
        let hand = [n(Color::Red, 3)];
        let top = n(Color::Red, 7);
        let mut sel = Selection::new();
        sel.toggle(0, &hand, Some(&top), true);
        sel.play(GAME);

        sel.mark_cancelled();
        assert!(!sel.in_flight());
        assert_eq!(sel.len(), 1);
        assert!(matches!(sel.play(GAME), PlayOutcome::Ready(_)));
    }

    #[test]
    fn test_draw_discards_selection() {
        let hand = [n(Color::Red, 3)];
        let top = n(Color::Red, 7);
        let mut sel = Selection::new();
        sel.toggle(0, &hand, Some(&top), true);

        assert_eq!(sel.draw(GAME), Ok(Action::DrawCard { game_id: GAME }));
        assert!(sel.is_empty());
    }

    #[test]
    fn test_reconcile_drops_moved_cards() {
        let hand = [n(Color::Red, 3), n(Color::Blue, 3), n(Color::Green, 3)];
        let top = n(Color::Red, 3);
        let mut sel = Selection::new();
        sel.toggle(0, &hand, Some(&top), true);
        sel.toggle(2, &hand, Some(&top), true);

        // Authority removed the first card; everything shifted left.
        let new_hand = [n(Color::Blue, 3), n(Color::Green, 3), n(Color::Green, 3)];
        assert_eq!(sel.reconcile(&new_hand), 1);
        assert_eq!(sel.slots(), vec![2]);
    }
}
