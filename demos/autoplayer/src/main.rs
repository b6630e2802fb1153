//! Headless bot: joins (or creates) a lobby game and plays whenever it is
//! its turn.
//!
//! ```text
//! RUST_LOG=debug cargo run -p autoplayer -- ws://localhost:3030
//! ```
//!
//! The endpoint comes from the first argument, then `WILDCARD_ENDPOINT`,
//! then the library default.

use std::collections::HashMap;

use tracing_subscriber::EnvFilter;
use wildcard::prelude::*;
use wildcard::table::rules;
use wildcard::DEFAULT_ENDPOINT;

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Move {
    /// Hand slots to stage, in order.
    Play(Vec<usize>),
    Draw,
}

/// Picks a move: the first playable colored card plus every other card of
/// the same value, else a Wild, else draw. `None` before a round starts.
fn choose_move(hand: &[Card], top: Option<&Card>) -> Option<Move> {
    top?;
    let playable = |card: &Card| rules::can_play_card(top, &[], card);

    let lead = hand
        .iter()
        .position(|c| !c.needs_color() && playable(c))
        .or_else(|| hand.iter().position(|c| playable(c)));

    let Some(lead) = lead else {
        return Some(Move::Draw);
    };
    let mut slots = vec![lead];
    slots.extend(
        hand.iter()
            .enumerate()
            .filter(|(i, c)| *i != lead && rules::can_stack(&hand[lead], c))
            .map(|(i, _)| i),
    );
    Some(Move::Play(slots))
}

/// The concrete color we hold most of; red when the hand is all Wilds.
fn favourite_color(hand: &[Card]) -> Color {
    let mut counts: HashMap<Color, usize> = HashMap::new();
    for card in hand.iter().filter(|c| !c.needs_color()) {
        *counts.entry(card.color).or_default() += 1;
    }
    // Reversed so ties go to the earlier color.
    Color::CONCRETE
        .into_iter()
        .rev()
        .max_by_key(|c| counts.get(c).copied().unwrap_or(0))
        .unwrap_or(Color::Red)
}

// ---------------------------------------------------------------------------
// Bot loop
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Bot {
    acted_this_turn: bool,
    asked_for_game: bool,
}

impl Bot {
    fn on_event(&mut self, client: &GameClient, event: &ClientEvent) -> Result<(), ClientError> {
        let view = client.view();
        match event {
            ClientEvent::Connection(state) => tracing::info!(%state, "connection"),
            ClientEvent::Navigate(game_id) => tracing::info!(%game_id, "seated"),
            ClientEvent::ColorRequested => {
                let color = favourite_color(view.hand());
                tracing::info!(%color, "choosing color");
                client.choose_color(color)?;
            }
            ClientEvent::Rejected(e) => {
                tracing::debug!(error = %e, "move refused, will retry");
                self.acted_this_turn = false;
            }
            _ => {}
        }

        if view.game_id.is_none() {
            return self.find_game(client, &view);
        }

        if !view.is_local_turn() {
            self.acted_this_turn = false;
            return Ok(());
        }
        if self.acted_this_turn || !view.selection.is_empty() {
            return Ok(());
        }

        match choose_move(view.hand(), view.store.discard_top()) {
            Some(Move::Play(slots)) => {
                tracing::info!(?slots, "playing");
                for slot in slots {
                    client.toggle_card(slot)?;
                }
                client.play_selected()?;
            }
            Some(Move::Draw) => {
                tracing::info!("nothing playable, drawing");
                client.draw_card()?;
            }
            None => return Ok(()),
        }
        self.acted_this_turn = true;
        Ok(())
    }

    fn find_game(&mut self, client: &GameClient, view: &ClientView) -> Result<(), ClientError> {
        if self.asked_for_game || view.connection != ConnectionState::Connected {
            return Ok(());
        }
        match view.store.games().iter().find(|g| !g.round_in_progress) {
            Some(game) => {
                tracing::info!(game_id = %game.id, "joining open game");
                client.join_game(game.id)?;
            }
            None => {
                tracing::info!("no open games, creating one");
                client.create_game()?;
            }
        }
        self.asked_for_game = true;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), WildcardError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let endpoint = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("WILDCARD_ENDPOINT").ok())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    let (mut client, mut events) = GameClient::builder().endpoint(endpoint).build();
    let mut bot = Bot::default();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                bot.on_event(&client, &event)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
