//! Message envelopes: inbound server events and outbound actions.
//!
//! Inbound traffic is a JSON object `{"sv": <tag>, "data": <payload>}`.
//! The authority sometimes double-encodes `data` (the payload is a JSON
//! *string* holding more JSON), so [`ServerEvent::from_frame`] interprets it
//! exactly once: a string is parsed as JSON first, and used verbatim if that
//! fails or does not fit the tag's payload type.
//!
//! Outbound traffic is an [`Action`], internally tagged by `action`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{
    Card, GameId, GameSnapshot, LobbyGame, PlayedCards, Player, PlayerId,
    RosterEntry,
};
use crate::{Codec, ProtocolError};

/// The raw inbound envelope, decoded in a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Dispatch tag.
    pub sv: String,
    /// Payload. Absent means `null`.
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    /// Builds a frame from a tag and an already-structured payload.
    pub fn new(sv: impl Into<String>, data: Value) -> Self {
        Self {
            sv: sv.into(),
            data,
        }
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// `player` / `update_player`: the local player's full record.
    LocalPlayer(Player),
    /// `player_id`: the authority assigned us an id before a full record.
    PlayerId(PlayerId),
    /// `update_lobby_games_list`: full replacement of the lobby list.
    GamesList(Vec<LobbyGame>),
    /// `you_joined_game`: navigate into this game.
    JoinedGame(GameId),
    /// `update_players`: full replacement of the roster.
    Roster(Vec<RosterEntry>),
    /// `update_game_state`: full replacement of the game snapshot.
    GameState(GameSnapshot),
    /// `your_turn`.
    YourTurn,
    /// `card_played`. The payload is informational and may be missing.
    CardPlayed(Option<PlayedCards>),
    /// `card_drawn`.
    CardDrawn,
    /// `update_hand`: replaces only the local hand.
    Hand(Vec<Card>),
    /// `update_status`: a human-readable status line.
    Status(String),
    /// Any tag this client doesn't know. Ignored downstream.
    Unknown(String),
}

impl ServerEvent {
    /// Decodes raw bytes from the connection into an event.
    pub fn decode<C: Codec>(
        codec: &C,
        bytes: &[u8],
    ) -> Result<Self, ProtocolError> {
        let frame: Frame = codec.decode(bytes)?;
        Self::from_frame(frame)
    }

    /// Interprets an already-decoded envelope.
    pub fn from_frame(frame: Frame) -> Result<Self, ProtocolError> {
        let Frame { sv, data } = frame;
        if sv.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "empty `sv` tag".into(),
            ));
        }

        let event = match sv.as_str() {
            "player" | "update_player" => {
                Self::LocalPlayer(payload(&sv, data)?)
            }
            "player_id" => Self::PlayerId(payload(&sv, data)?),
            "update_lobby_games_list" => Self::GamesList(payload(&sv, data)?),
            "you_joined_game" => Self::JoinedGame(payload(&sv, data)?),
            "update_players" => Self::Roster(payload(&sv, data)?),
            "update_game_state" => Self::GameState(payload(&sv, data)?),
            "your_turn" => Self::YourTurn,
            "card_played" => {
                // The turn change matters, the payload doesn't.
                let played = match data {
                    Value::Null => None,
                    data => payload(&sv, data).ok(),
                };
                Self::CardPlayed(played)
            }
            "card_drawn" => Self::CardDrawn,
            "update_hand" => Self::Hand(payload(&sv, data)?),
            "update_status" => Self::Status(payload(&sv, data)?),
            _ => {
                tracing::trace!(tag = %sv, "unrecognized server tag");
                Self::Unknown(sv)
            }
        };
        Ok(event)
    }

    /// The wire tag this event was decoded from (canonical form).
    pub fn tag(&self) -> &str {
        match self {
            Self::LocalPlayer(_) => "player",
            Self::PlayerId(_) => "player_id",
            Self::GamesList(_) => "update_lobby_games_list",
            Self::JoinedGame(_) => "you_joined_game",
            Self::Roster(_) => "update_players",
            Self::GameState(_) => "update_game_state",
            Self::YourTurn => "your_turn",
            Self::CardPlayed(_) => "card_played",
            Self::CardDrawn => "card_drawn",
            Self::Hand(_) => "update_hand",
            Self::Status(_) => "update_status",
            Self::Unknown(tag) => tag,
        }
    }
}

/// Interprets `data` once as `T`.
fn payload<T: DeserializeOwned>(
    tag: &str,
    data: Value,
) -> Result<T, ProtocolError> {
    if let Value::String(text) = &data {
        if let Ok(inner) = serde_json::from_str::<T>(text) {
            return Ok(inner);
        }
    }
    serde_json::from_value(data).map_err(|source| ProtocolError::Payload {
        tag: tag.to_owned(),
        source,
    })
}

/// An outbound request to the authority.
///
/// ```rust
/// use wildcard_protocol::{Action, Codec, GameId, JsonCodec};
///
/// let bytes = JsonCodec
///     .encode(&Action::DrawCard { game_id: GameId(3) })
///     .unwrap();
/// assert_eq!(bytes, br#"{"action":"draw_card","game_id":3}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    FetchGames,
    CreateGame,
    JoinGame { game_id: GameId },
    PlayCard { card: Card, game_id: GameId },
    PlayCards { cards: Vec<Card>, game_id: GameId },
    DrawCard { game_id: GameId },
}

impl Action {
    /// The `action` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchGames => "fetch_games",
            Self::CreateGame => "create_game",
            Self::JoinGame { .. } => "join_game",
            Self::PlayCard { .. } => "play_card",
            Self::PlayCards { .. } => "play_cards",
            Self::DrawCard { .. } => "draw_card",
        }
    }

    /// Whether this action plays cards.
    pub fn is_play(&self) -> bool {
        matches!(self, Self::PlayCard { .. } | Self::PlayCards { .. })
    }

    /// The game this action targets, for in-game actions.
    pub fn game_id(&self) -> Option<GameId> {
        match self {
            Self::JoinGame { game_id }
            | Self::PlayCard { game_id, .. }
            | Self::PlayCards { game_id, .. }
            | Self::DrawCard { game_id } => Some(*game_id),
            Self::FetchGames | Self::CreateGame => None,
        }
    }

    /// Cards carried by a play action; empty for everything else.
    pub fn cards(&self) -> &[Card] {
        match self {
            Self::PlayCard { card, .. } => std::slice::from_ref(card),
            Self::PlayCards { cards, .. } => cards,
            _ => &[],
        }
    }
}
