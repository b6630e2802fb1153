//! The synchronous client core.
//!
//! [`Controller`] owns the session store, the selection, and the joined
//! game id. Every method is a plain state transition that reports what has
//! to go on the wire and what the presentation layer should hear about.
//! It never touches the network, so it can be driven directly in tests and
//! wrapped by [`GameClient`](crate::GameClient) for real use.

use wildcard_protocol::{
    Action, Card, Color, GameId, JsonCodec, ServerEvent,
};
use wildcard_session::{Applied, Changes, SessionStore};
use wildcard_table::{PlayOutcome, Selection, Toggle};
use wildcard_transport::ConnectionState;

use crate::ClientError;

/// Something the presentation layer should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The connection changed state.
    Connection(ConnectionState),
    /// Store and/or selection changed; re-read the view.
    StateChanged { store: Changes, selection: bool },
    /// The authority placed us in this game.
    Navigate(GameId),
    /// A staged Wild needs a color. Answer with `choose_color` or
    /// `cancel_color`.
    ColorRequested,
    /// These cards were submitted and are on their way out. Purely a hint
    /// for animation; the send does not wait on it.
    CardsLeaving(Vec<Card>),
    /// An action was handed to the connection.
    ActionSent(Action),
    /// A command was refused.
    Rejected(ClientError),
}

impl ClientEvent {
    fn selection_changed() -> Self {
        Self::StateChanged {
            store: Changes::default(),
            selection: true,
        }
    }
}

/// What a controller command produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Action to send, if any.
    pub send: Option<Action>,
    pub events: Vec<ClientEvent>,
}

impl Outcome {
    fn send(action: Action) -> Self {
        Self {
            send: Some(action),
            events: Vec::new(),
        }
    }

    fn event(event: ClientEvent) -> Self {
        Self {
            send: None,
            events: vec![event],
        }
    }

    fn rejected(err: impl Into<ClientError>) -> Self {
        let err = err.into();
        tracing::debug!(error = %err, "command rejected");
        Self::event(ClientEvent::Rejected(err))
    }
}

/// Read-only snapshot of client state, published after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientView {
    pub connection: ConnectionState,
    pub store: SessionStore,
    pub selection: Selection,
    pub game_id: Option<GameId>,
}

impl ClientView {
    pub fn is_local_turn(&self) -> bool {
        self.store.is_local_turn()
    }

    pub fn hand(&self) -> &[Card] {
        self.store.hand()
    }

    /// Whether the card at `slot` is part of a submitted play.
    pub fn is_being_played(&self, slot: usize) -> bool {
        self.selection.in_flight() && self.selection.is_staged(slot)
    }
}

/// Store + selection + joined game, driven one event or command at a time.
#[derive(Debug, Default)]
pub struct Controller {
    store: SessionStore,
    selection: Selection,
    joined: Option<GameId>,
    codec: JsonCodec,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The game commands apply to: the one we were told we joined, else
    /// the one the current snapshot describes.
    pub fn game_id(&self) -> Option<GameId> {
        self.joined.or_else(|| self.store.game().map(|g| g.id))
    }

    pub fn view(&self, connection: ConnectionState) -> ClientView {
        ClientView {
            connection,
            store: self.store.clone(),
            selection: self.selection.clone(),
            game_id: self.game_id(),
        }
    }

    // -- Inbound -----------------------------------------------------------

    /// Decodes one inbound frame and applies it.
    ///
    /// A frame that fails to decode is logged and dropped; the store is
    /// left exactly as it was.
    pub fn handle_frame(&mut self, bytes: &[u8]) -> Vec<ClientEvent> {
        match ServerEvent::decode(&self.codec, bytes) {
            Ok(event) => self.handle_event(&event),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    frame = %String::from_utf8_lossy(bytes),
                    "dropping malformed frame"
                );
                Vec::new()
            }
        }
    }

    /// Applies an already-decoded event.
    pub fn handle_event(&mut self, event: &ServerEvent) -> Vec<ClientEvent> {
        tracing::trace!(tag = event.tag(), "applying server event");
        match self.store.apply(event) {
            Applied::Changed(changes) => {
                let mut selection = false;
                if changes.player {
                    selection = self.selection.reconcile(self.store.hand()) > 0;
                }
                vec![ClientEvent::StateChanged {
                    store: changes,
                    selection,
                }]
            }
            Applied::Navigate(game_id) => {
                if self.joined.is_some_and(|current| current != game_id) {
                    self.store.leave_game();
                    self.selection.clear();
                }
                self.joined = Some(game_id);
                tracing::info!(%game_id, "joined game");
                vec![ClientEvent::Navigate(game_id)]
            }
            Applied::Ignored => Vec::new(),
        }
    }

    // -- Table commands ----------------------------------------------------

    /// Stages or unstages the card at `slot` of the local hand.
    pub fn toggle_card(&mut self, slot: usize) -> Outcome {
        let toggle = self.selection.toggle(
            slot,
            self.store.hand(),
            self.store.discard_top(),
            self.store.is_local_turn(),
        );
        match toggle {
            Toggle::Staged | Toggle::Unstaged => {
                Outcome::event(ClientEvent::selection_changed())
            }
            Toggle::Rejected(e) => Outcome::rejected(e),
        }
    }

    /// Submits the staged cards.
    pub fn play_selected(&mut self) -> Outcome {
        let Some(game_id) = self.game_id() else {
            return Outcome::rejected(ClientError::NotInGame);
        };
        let outcome = self.selection.play(game_id);
        self.play_outcome(outcome)
    }

    /// Answers an open color request.
    pub fn choose_color(&mut self, color: Color) -> Outcome {
        let Some(game_id) = self.game_id() else {
            return Outcome::rejected(ClientError::NotInGame);
        };
        let outcome = self.selection.choose_color(color, game_id);
        self.play_outcome(outcome)
    }

    fn play_outcome(&mut self, outcome: PlayOutcome) -> Outcome {
        match outcome {
            PlayOutcome::Ready(action) => {
                let cards = action.cards().to_vec();
                Outcome {
                    send: Some(action),
                    events: vec![
                        ClientEvent::CardsLeaving(cards),
                        ClientEvent::selection_changed(),
                    ],
                }
            }
            PlayOutcome::NeedsColor => Outcome::event(ClientEvent::ColorRequested),
            PlayOutcome::Rejected(e) => Outcome::rejected(e),
        }
    }

    /// Closes an open color request, keeping the selection.
    pub fn cancel_color(&mut self) -> Outcome {
        if self.selection.cancel_color() {
            Outcome::event(ClientEvent::selection_changed())
        } else {
            Outcome::default()
        }
    }

    /// Draws a card, abandoning anything staged.
    pub fn draw_card(&mut self) -> Outcome {
        let Some(game_id) = self.game_id() else {
            return Outcome::rejected(ClientError::NotInGame);
        };
        let had_selection = !self.selection.is_empty();
        match self.selection.draw(game_id) {
            Ok(action) => {
                let mut outcome = Outcome::send(action);
                if had_selection {
                    outcome.events.push(ClientEvent::selection_changed());
                }
                outcome
            }
            Err(e) => Outcome::rejected(e),
        }
    }

    // -- Lobby commands ----------------------------------------------------

    pub fn fetch_games(&mut self) -> Outcome {
        Outcome::send(Action::FetchGames)
    }

    pub fn create_game(&mut self) -> Outcome {
        Outcome::send(Action::CreateGame)
    }

    pub fn join_game(&mut self, game_id: GameId) -> Outcome {
        Outcome::send(Action::JoinGame { game_id })
    }

    /// Navigates away from the current game. Local only; the authority
    /// has no leave action.
    pub fn leave_game(&mut self) -> Outcome {
        self.store.leave_game();
        self.selection.clear();
        self.joined = None;
        Outcome::event(ClientEvent::StateChanged {
            store: Changes {
                game: true,
                roster: true,
                turn: true,
                ..Changes::default()
            },
            selection: true,
        })
    }

    // -- Dispatch bookkeeping ----------------------------------------------

    /// `action` left on the wire.
    pub fn sent(&mut self, action: &Action) {
        if action.is_play() {
            self.selection.mark_sent();
        }
    }

    /// `action` was dropped before reaching the wire.
    pub fn unsent(&mut self, action: &Action) {
        if action.is_play() {
            self.selection.mark_cancelled();
        }
    }

    /// Discards all session state. Called on teardown.
    pub fn reset(&mut self) {
        self.selection.clear();
        self.store.reset();
        self.joined = None;
    }
}
