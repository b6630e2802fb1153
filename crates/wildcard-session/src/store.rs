//! The session state store.
//!
//! # Turn flag
//!
//! Whether it is our turn is *derived*: it holds when the game's
//! `player_to_play` is the local player, a round is in progress, and the
//! local player is not spectating. The authority also sends explicit
//! `your_turn` / `card_played` / `card_drawn` signals; those set a hint
//! that wins over the derivation until the next `update_game_state`
//! replaces the snapshot, so an out-of-order signal can never leave the
//! flag stuck.

use wildcard_protocol::{
    Card, GameId, GameSnapshot, LobbyGame, Player, PlayerId, RosterEntry,
    ServerEvent,
};

/// Which parts of the store an event touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Changes {
    pub player: bool,
    pub games: bool,
    pub roster: bool,
    pub game: bool,
    pub turn: bool,
    pub status: bool,
}

impl Changes {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Outcome of [`SessionStore::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The store was mutated.
    Changed(Changes),
    /// The authority put us in a game; the caller should navigate to it.
    /// The store itself is untouched.
    Navigate(GameId),
    /// Nothing to do (unknown tag, or an update we can't place).
    Ignored,
}

/// Client-side mirror of the authority's session state.
///
/// Created empty when a connection opens and populated entirely by
/// inbound events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStore {
    local_player: Option<Player>,
    /// Id announced via `player_id` before the full record arrives.
    assigned_id: Option<PlayerId>,
    roster: Vec<RosterEntry>,
    games: Vec<LobbyGame>,
    game: Option<GameSnapshot>,
    status: Option<String>,
    turn_hint: Option<bool>,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one inbound event.
    pub fn apply(&mut self, event: &ServerEvent) -> Applied {
        let changes = match event {
            ServerEvent::LocalPlayer(player) => {
                self.assigned_id = Some(player.id);
                self.local_player = Some(player.clone());
                Changes {
                    player: true,
                    turn: true,
                    ..Changes::default()
                }
            }
            ServerEvent::PlayerId(id) => {
                self.assigned_id = Some(*id);
                Changes {
                    player: true,
                    turn: true,
                    ..Changes::default()
                }
            }
            ServerEvent::GamesList(games) => {
                self.games = games.clone();
                Changes {
                    games: true,
                    ..Changes::default()
                }
            }
            ServerEvent::JoinedGame(game_id) => {
                return Applied::Navigate(*game_id);
            }
            ServerEvent::Roster(roster) => {
                self.roster = roster.clone();
                Changes {
                    roster: true,
                    ..Changes::default()
                }
            }
            ServerEvent::GameState(snapshot) => {
                self.game = Some(snapshot.clone());
                self.turn_hint = None;
                Changes {
                    game: true,
                    turn: true,
                    ..Changes::default()
                }
            }
            ServerEvent::YourTurn => self.hint_turn(true),
            ServerEvent::CardPlayed(_) | ServerEvent::CardDrawn => {
                self.hint_turn(false)
            }
            ServerEvent::Hand(cards) => {
                let Some(player) = self.local_player.as_mut() else {
                    tracing::debug!("hand update before player record, ignoring");
                    return Applied::Ignored;
                };
                player.hand = Some(cards.clone());
                Changes {
                    player: true,
                    ..Changes::default()
                }
            }
            ServerEvent::Status(text) => {
                self.status = Some(text.clone());
                Changes {
                    status: true,
                    ..Changes::default()
                }
            }
            ServerEvent::Unknown(tag) => {
                tracing::debug!(%tag, "ignoring unknown event");
                return Applied::Ignored;
            }
        };
        Applied::Changed(changes)
    }

    fn hint_turn(&mut self, mine: bool) -> Changes {
        self.turn_hint = Some(mine);
        Changes {
            turn: true,
            ..Changes::default()
        }
    }

    /// Discards everything. Called when the session is torn down.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Discards the game snapshot, roster, and turn hint, keeping identity
    /// and the lobby list. Called when navigating away from a game.
    pub fn leave_game(&mut self) {
        self.game = None;
        self.roster.clear();
        self.turn_hint = None;
    }

    // -- Selectors ---------------------------------------------------------

    pub fn local_player(&self) -> Option<&Player> {
        self.local_player.as_ref()
    }

    pub fn local_player_id(&self) -> Option<PlayerId> {
        self.local_player
            .as_ref()
            .map(|p| p.id)
            .or(self.assigned_id)
    }

    /// The local hand; empty until the authority sends one.
    pub fn hand(&self) -> &[Card] {
        self.local_player
            .as_ref()
            .and_then(|p| p.hand.as_deref())
            .unwrap_or(&[])
    }

    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    pub fn game(&self) -> Option<&GameSnapshot> {
        self.game.as_ref()
    }

    pub fn games(&self) -> &[LobbyGame] {
        &self.games
    }

    pub fn discard_top(&self) -> Option<&Card> {
        self.game.as_ref().and_then(GameSnapshot::discard_top)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn is_spectator(&self) -> bool {
        self.local_player.as_ref().is_some_and(|p| p.is_spectator)
    }

    /// Whether the local player may act now. See the module docs.
    pub fn is_local_turn(&self) -> bool {
        if self.is_spectator() {
            return false;
        }
        if let Some(hint) = self.turn_hint {
            return hint;
        }
        match (&self.game, self.local_player_id()) {
            (Some(game), Some(me)) => {
                game.round_in_progress && game.player_to_play == Some(me)
            }
            _ => false,
        }
    }

    /// Non-spectators in seating order.
    ///
    /// Uses the snapshot's seating order when present, otherwise roster
    /// order.
    pub fn seated_players(&self) -> Vec<PlayerId> {
        let spectating = |id: &PlayerId| {
            self.roster
                .iter()
                .any(|entry| entry.id == *id && entry.is_spectator)
        };
        match self.game.as_ref().filter(|g| !g.players.is_empty()) {
            Some(game) => game
                .players
                .iter()
                .copied()
                .filter(|id| !spectating(id))
                .collect(),
            None => self
                .roster
                .iter()
                .filter(|entry| !entry.is_spectator)
                .map(|entry| entry.id)
                .collect(),
        }
    }

    /// The player after `player_to_play`, stepping in the game's direction.
    ///
    /// `None` when there is no game, no turn pointer, or the pointer is not
    /// a seated player.
    pub fn next_player(&self) -> Option<PlayerId> {
        let game = self.game.as_ref()?;
        let current = game.player_to_play?;
        let seated = self.seated_players();
        let index = seated.iter().position(|id| *id == current)?;
        let len = seated.len() as isize;
        let next = (index as isize + game.direction.step()).rem_euclid(len);
        seated.get(next as usize).copied()
    }
}
