//! Core protocol types: the card model and the records the authority pushes.
//!
//! Everything here travels on the wire as JSON. The authority is not
//! perfectly consistent about encodings (ids arrive as numbers or numeric
//! strings, enum names in either case), so the deserializers accept the
//! variants seen in practice and the serializers always emit one canonical
//! form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Wire form of an id: a number, or a string holding a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Num(u64),
    Text(String),
}

impl TryFrom<IdRepr> for u64 {
    type Error = String;

    fn try_from(repr: IdRepr) -> Result<Self, Self::Error> {
        match repr {
            IdRepr::Num(n) => Ok(n),
            IdRepr::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("expected a numeric id, got {s:?}")),
        }
    }
}

/// Authority-assigned identity of a player.
///
/// Newtype over `u64` so a `GameId` can't be passed where a `PlayerId` is
/// expected. Serializes as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identity of one game session on the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

macro_rules! numeric_id_serde {
    ($ty:ident) => {
        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(
                &self,
                serializer: S,
            ) -> Result<S::Ok, S::Error> {
                serializer.serialize_u64(self.0)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(
                deserializer: D,
            ) -> Result<Self, D::Error> {
                let repr = IdRepr::deserialize(deserializer)?;
                u64::try_from(repr).map($ty).map_err(serde::de::Error::custom)
            }
        }
    };
}

numeric_id_serde!(PlayerId);
numeric_id_serde!(GameId);

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// Card color. `Wild` means "not chosen yet".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[serde(alias = "Red", alias = "RED")]
    Red,
    #[serde(alias = "Blue", alias = "BLUE")]
    Blue,
    #[serde(alias = "Green", alias = "GREEN")]
    Green,
    #[serde(alias = "Yellow", alias = "YELLOW")]
    Yellow,
    #[serde(alias = "Wild", alias = "WILD")]
    Wild,
}

impl Color {
    /// The four colors a Wild card can be resolved to.
    pub const CONCRETE: [Color; 4] =
        [Color::Red, Color::Blue, Color::Green, Color::Yellow];

    /// Returns `true` for the unresolved `Wild` color.
    pub fn is_wild(self) -> bool {
        matches!(self, Self::Wild)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Wild => "wild",
        };
        f.write_str(name)
    }
}

/// Card face value.
///
/// On the wire this is a string: `"0"`–`"9"`, `"skip"`, `"reverse"`,
/// `"draw_two"`, `"wild"`, `"wild_draw_four"`. Plain integers and the
/// externally tagged `{"Number": 7}` form are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ValueRepr", into = "String")]
pub enum CardValue {
    /// A number card, 0 through 9.
    Number(u8),
    Skip,
    Reverse,
    DrawTwo,
    Wild,
    WildDrawFour,
}

impl CardValue {
    /// Builds a number value, rejecting anything above 9.
    pub fn number(n: u8) -> Option<Self> {
        (n <= 9).then_some(Self::Number(n))
    }
}

impl fmt::Display for CardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Skip => f.write_str("skip"),
            Self::Reverse => f.write_str("reverse"),
            Self::DrawTwo => f.write_str("draw_two"),
            Self::Wild => f.write_str("wild"),
            Self::WildDrawFour => f.write_str("wild_draw_four"),
        }
    }
}

impl FromStr for CardValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "draw_two", "DrawTwo" and "drawtwo" all normalize to "drawtwo".
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "skip" => Ok(Self::Skip),
            "reverse" => Ok(Self::Reverse),
            "drawtwo" => Ok(Self::DrawTwo),
            "wild" => Ok(Self::Wild),
            "wilddrawfour" => Ok(Self::WildDrawFour),
            digits => digits
                .parse::<u8>()
                .ok()
                .and_then(Self::number)
                .ok_or_else(|| format!("unknown card value {s:?}")),
        }
    }
}

impl From<CardValue> for String {
    fn from(value: CardValue) -> Self {
        value.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ValueRepr {
    Int(u64),
    Text(String),
    Tagged {
        #[serde(rename = "Number")]
        number: u64,
    },
}

impl TryFrom<ValueRepr> for CardValue {
    type Error = String;

    fn try_from(repr: ValueRepr) -> Result<Self, Self::Error> {
        match repr {
            ValueRepr::Int(n) | ValueRepr::Tagged { number: n } => {
                u8::try_from(n)
                    .ok()
                    .and_then(CardValue::number)
                    .ok_or_else(|| format!("card number out of range: {n}"))
            }
            ValueRepr::Text(s) => s.parse(),
        }
    }
}

/// A single card.
///
/// `id` is an optional authority-assigned identity; two cards with the same
/// color and value are otherwise indistinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub color: Color,
    pub value: CardValue,
}

impl Card {
    /// Creates a card without an identity.
    pub fn new(color: Color, value: CardValue) -> Self {
        Self {
            id: None,
            color,
            value,
        }
    }

    /// Returns `true` if this card still needs a color chosen at play time.
    pub fn needs_color(&self) -> bool {
        self.color.is_wild()
    }

    /// Returns a copy of this card with `color` in place of its current one.
    ///
    /// The original is left untouched, so the hand and the staged
    /// selection never alias.
    pub fn with_color(&self, color: Color) -> Self {
        Self {
            color,
            ..self.clone()
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color, self.value)
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// The local player's own record, pushed via `player` / `update_player`.
///
/// Only this record carries a hand; the authority never sends other
/// players' cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    #[serde(default, alias = "display_name", alias = "displayName")]
    pub name: String,
    #[serde(default)]
    pub hand: Option<Vec<Card>>,
    #[serde(default)]
    pub current_game: Option<GameId>,
    #[serde(default, alias = "isSpectator")]
    pub is_spectator: bool,
}

/// One seat in a game's roster, as seen by everyone else at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    #[serde(default, alias = "display_name", alias = "displayName")]
    pub name: String,
    #[serde(default, alias = "hand_size", alias = "cards")]
    pub card_count: usize,
    #[serde(default, alias = "isSpectator")]
    pub is_spectator: bool,
}

// ---------------------------------------------------------------------------
// Lobby
// ---------------------------------------------------------------------------

/// A joinable game as listed in the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyGame {
    pub id: GameId,
    #[serde(default)]
    pub player_count: usize,
    #[serde(default)]
    pub round_in_progress: bool,
}

// ---------------------------------------------------------------------------
// Game session
// ---------------------------------------------------------------------------

/// Direction of play. `1` / `-1` on the wire; nothing else is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Direction {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl Direction {
    /// Signed step through the seating order: `+1` or `-1`.
    pub fn step(self) -> isize {
        match self {
            Self::Clockwise => 1,
            Self::CounterClockwise => -1,
        }
    }
}

impl TryFrom<i8> for Direction {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Clockwise),
            -1 => Ok(Self::CounterClockwise),
            other => Err(format!("direction must be 1 or -1, got {other}")),
        }
    }
}

impl From<Direction> for i8 {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }
}

/// Snapshot of one game session, pushed via `update_game_state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: GameId,
    #[serde(default)]
    pub round_in_progress: bool,
    /// Whose turn it is (the turn pointer).
    #[serde(default, alias = "turn_pointer")]
    pub player_to_play: Option<PlayerId>,
    #[serde(default)]
    pub direction: Direction,
    /// Oldest first; the last element is the top of the pile.
    #[serde(default)]
    pub discard_pile: Vec<Card>,
    /// Cards left in the draw pile.
    #[serde(default, alias = "draw_pile_remaining")]
    pub deck_size: usize,
    #[serde(default)]
    pub player_count: usize,
    /// Seating order, when the authority includes it.
    #[serde(default, alias = "roster")]
    pub players: Vec<PlayerId>,
}

impl GameSnapshot {
    /// The most recently accepted play, if a round has started.
    pub fn discard_top(&self) -> Option<&Card> {
        self.discard_pile.last()
    }
}

/// Payload of a `card_played` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedCards {
    pub player_id: PlayerId,
    #[serde(default)]
    pub cards: Vec<Card>,
}

// =========================================================================
// Tests
// =========================================================================
