//! Integration tests for the game client against a stub authority.
//!
//! Each test binds a tiny WebSocket "authority" on a random local port,
//! lets a real `GameClient` connect to it, pushes frames, and checks what
//! the client sends back.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use wildcard::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

type AuthorityWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

const WAIT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("wildcard=debug")
        .with_test_writer()
        .try_init();
}

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
    let addr = listener.local_addr().expect("local addr");
    (listener, format!("ws://{addr}"))
}

async fn accept(listener: &TcpListener) -> AuthorityWs {
    let (stream, _) = tokio::time::timeout(WAIT, listener.accept())
        .await
        .expect("client should dial")
        .expect("should accept");
    tokio_tungstenite::accept_async(stream).await.expect("handshake")
}

async fn push(ws: &mut AuthorityWs, sv: &str, data: Value) {
    let frame = json!({"sv": sv, "data": data}).to_string();
    ws.send(Message::Text(frame.into())).await.expect("push frame");
}

async fn push_raw(ws: &mut AuthorityWs, raw: &str) {
    ws.send(Message::Text(raw.to_string().into())).await.expect("push raw");
}

/// Next action the client sent, as JSON.
async fn next_action(ws: &mut AuthorityWs) -> Value {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("client should send something")
            .expect("stream open")
            .expect("valid frame");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("client sends JSON");
        }
    }
}

/// Asserts the client sends nothing for `window`.
async fn assert_silent(ws: &mut AuthorityWs, window: Duration) {
    if let Ok(Some(Ok(msg))) = tokio::time::timeout(window, ws.next()).await {
        panic!("expected silence, client sent {msg:?}");
    }
}

async fn wait_view(client: &GameClient, pred: impl Fn(&ClientView) -> bool) -> ClientView {
    let mut rx = client.subscribe();
    let view = tokio::time::timeout(WAIT, rx.wait_for(|v| pred(v)))
        .await
        .expect("view should reach the expected state")
        .expect("client alive");
    view.clone()
}

async fn wait_event(events: &mut ClientEvents, pred: impl Fn(&ClientEvent) -> bool) -> ClientEvent {
    loop {
        let event = tokio::time::timeout(WAIT, events.recv())
            .await
            .expect("event should arrive")
            .expect("event stream open");
        if pred(&event) {
            return event;
        }
    }
}

/// Connects a client, consumes the lobby refresh, and seats the local
/// player (id 1) in game 7 with `hand`, a red 7 on the discard pile, and
/// the turn.
async fn seated_client(
    hand: Value,
    play_delay: Duration,
) -> (GameClient, ClientEvents, AuthorityWs) {
    init_tracing();
    let (listener, url) = listen().await;
    let (client, mut events) = GameClient::builder()
        .endpoint(url)
        .play_delay(play_delay)
        .build();
    let mut ws = accept(&listener).await;

    assert_eq!(next_action(&mut ws).await, json!({"action": "fetch_games"}));

    push(&mut ws, "player", json!({"id": 1, "name": "me", "hand": hand})).await;
    push(&mut ws, "you_joined_game", json!("7")).await;
    push(
        &mut ws,
        "update_game_state",
        json!({
            "id": 7,
            "round_in_progress": true,
            "player_to_play": 1,
            "direction": 1,
            "discard_pile": [{"color": "red", "value": "7"}],
            "deck_size": 80,
            "player_count": 2
        }),
    )
    .await;

    wait_event(&mut events, |e| matches!(e, ClientEvent::Navigate(GameId(7)))).await;
    wait_view(&client, |v| v.is_local_turn() && v.store.discard_top().is_some()).await;
    (client, events, ws)
}

// =========================================================================
// Lobby
// =========================================================================

#[tokio::test]
async fn test_client_fetches_games_on_connect_and_applies_list() {
    init_tracing();
    let (listener, url) = listen().await;
    let (mut client, mut events) = GameClient::builder().endpoint(url).build();
    let mut ws = accept(&listener).await;

    wait_event(&mut events, |e| {
        matches!(e, ClientEvent::Connection(ConnectionState::Connected))
    })
    .await;
    assert_eq!(next_action(&mut ws).await, json!({"action": "fetch_games"}));

    // Lobby lists arrive double-encoded.
    let games = json!([{"id": 3, "player_count": 1, "round_in_progress": false}]);
    push(&mut ws, "update_lobby_games_list", Value::String(games.to_string())).await;

    let view = wait_view(&client, |v| !v.store.games().is_empty()).await;
    assert_eq!(view.store.games()[0].id, GameId(3));

    client.join_game(GameId(3)).unwrap();
    assert_eq!(
        next_action(&mut ws).await,
        json!({"action": "join_game", "game_id": 3})
    );

    client.create_game().unwrap();
    assert_eq!(next_action(&mut ws).await, json!({"action": "create_game"}));

    client.shutdown().await;
}

// =========================================================================
// Playing
// =========================================================================

#[tokio::test]
async fn test_client_plays_staged_card() {
    let (mut client, mut events, mut ws) =
        seated_client(json!([{"color": "blue", "value": "7"}]), Duration::ZERO).await;

    client.toggle_card(0).unwrap();
    client.play_selected().unwrap();

    let sent = next_action(&mut ws).await;
    assert_eq!(
        sent,
        json!({
            "action": "play_cards",
            "cards": [{"color": "blue", "value": "7"}],
            "game_id": 7
        })
    );
    wait_event(&mut events, |e| matches!(e, ClientEvent::ActionSent(_))).await;
    wait_view(&client, |v| v.selection.is_empty()).await;

    // The authority confirms; the turn passes.
    push(&mut ws, "card_played", Value::Null).await;
    wait_view(&client, |v| !v.is_local_turn()).await;

    client.shutdown().await;
}

#[tokio::test]
async fn test_client_wild_play_waits_for_color() {
    let (mut client, mut events, mut ws) =
        seated_client(json!([{"color": "wild", "value": "wild_draw_four"}]), Duration::ZERO)
            .await;

    client.toggle_card(0).unwrap();
    client.play_selected().unwrap();
    wait_event(&mut events, |e| matches!(e, ClientEvent::ColorRequested)).await;
    assert_silent(&mut ws, Duration::from_millis(200)).await;

    client.choose_color(Color::Blue).unwrap();
    let sent = next_action(&mut ws).await;
    assert_eq!(sent["action"], "play_cards");
    assert_eq!(sent["cards"].as_array().map(Vec::len), Some(1));
    assert_eq!(sent["cards"][0]["color"], "blue");
    assert_eq!(sent["cards"][0]["value"], "wild_draw_four");
    assert_silent(&mut ws, Duration::from_millis(200)).await;

    client.shutdown().await;
}

#[tokio::test]
async fn test_client_draw_card_discards_selection() {
    let (mut client, _events, mut ws) =
        seated_client(json!([{"color": "red", "value": "2"}]), Duration::ZERO).await;

    client.toggle_card(0).unwrap();
    wait_view(&client, |v| v.selection.len() == 1).await;
    client.draw_card().unwrap();

    assert_eq!(
        next_action(&mut ws).await,
        json!({"action": "draw_card", "game_id": 7})
    );
    wait_view(&client, |v| v.selection.is_empty()).await;

    client.shutdown().await;
}

#[tokio::test]
async fn test_client_rejects_out_of_turn_toggle() {
    let (mut client, mut events, mut ws) =
        seated_client(json!([{"color": "red", "value": "2"}]), Duration::ZERO).await;

    push(&mut ws, "card_drawn", Value::Null).await;
    wait_view(&client, |v| !v.is_local_turn()).await;

    client.toggle_card(0).unwrap();
    let event = wait_event(&mut events, |e| matches!(e, ClientEvent::Rejected(_))).await;
    assert_eq!(
        event,
        ClientEvent::Rejected(ClientError::Table(TableError::NotYourTurn))
    );

    client.shutdown().await;
}

// =========================================================================
// Malformed input
// =========================================================================

#[tokio::test]
async fn test_client_survives_malformed_frames() {
    let (mut client, _events, mut ws) =
        seated_client(json!([{"color": "red", "value": "2"}]), Duration::ZERO).await;
    let before = client.view();

    push_raw(&mut ws, "this is not json").await;
    push_raw(&mut ws, r#"{"sv":"update_game_state","data":"{broken"}"#).await;
    push(&mut ws, "update_status", json!("still here")).await;

    let after = wait_view(&client, |v| v.store.status() == Some("still here")).await;
    assert_eq!(after.store.game(), before.store.game());
    assert_eq!(after.store.hand(), before.store.hand());

    client.shutdown().await;
}

// =========================================================================
// Deferred send
// =========================================================================

#[tokio::test]
async fn test_client_deferred_play_sends_after_delay() {
    let delay = Duration::from_millis(300);
    let (mut client, mut events, mut ws) =
        seated_client(json!([{"color": "red", "value": "5"}]), delay).await;

    client.toggle_card(0).unwrap();
    client.play_selected().unwrap();

    wait_event(&mut events, |e| matches!(e, ClientEvent::CardsLeaving(_))).await;
    let view = wait_view(&client, |v| v.selection.in_flight()).await;
    assert!(view.is_being_played(0));

    // A second submit while the first is pending is refused.
    client.play_selected().unwrap();
    let event = wait_event(&mut events, |e| matches!(e, ClientEvent::Rejected(_))).await;
    assert_eq!(
        event,
        ClientEvent::Rejected(ClientError::Table(TableError::InFlight))
    );

    let sent = next_action(&mut ws).await;
    assert_eq!(sent["action"], "play_cards");
    assert_silent(&mut ws, Duration::from_millis(500)).await;

    client.shutdown().await;
}

#[tokio::test]
async fn test_client_shutdown_cancels_deferred_play() {
    let (mut client, mut events, mut ws) =
        seated_client(json!([{"color": "red", "value": "5"}]), Duration::from_secs(2)).await;

    client.toggle_card(0).unwrap();
    client.play_selected().unwrap();
    wait_event(&mut events, |e| matches!(e, ClientEvent::CardsLeaving(_))).await;

    client.shutdown().await;

    // The connection closes without the play ever leaving.
    loop {
        match tokio::time::timeout(WAIT, ws.next()).await.expect("socket should close") {
            Some(Ok(Message::Text(text))) => panic!("late send after teardown: {text}"),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
            Some(Ok(_)) => continue,
        }
    }
    assert_eq!(client.view().store, wildcard::session::SessionStore::default());
    assert!(client.fetch_games().is_err());
}

#[tokio::test]
async fn test_client_leave_game_cancels_deferred_play() {
    let (mut client, mut events, mut ws) =
        seated_client(json!([{"color": "red", "value": "5"}]), Duration::from_millis(300)).await;

    client.toggle_card(0).unwrap();
    client.play_selected().unwrap();
    wait_event(&mut events, |e| matches!(e, ClientEvent::CardsLeaving(_))).await;

    client.leave_game().unwrap();
    let view = wait_view(&client, |v| v.game_id.is_none()).await;
    assert!(view.selection.is_empty());

    // Well past the delay: the play for game 7 never leaves.
    assert_silent(&mut ws, Duration::from_millis(800)).await;

    // Lobby traffic still flows.
    client.fetch_games().unwrap();
    assert_eq!(next_action(&mut ws).await, json!({"action": "fetch_games"}));

    client.shutdown().await;
}

#[tokio::test]
async fn test_client_switching_game_cancels_deferred_play() {
    let (mut client, mut events, mut ws) =
        seated_client(json!([{"color": "red", "value": "5"}]), Duration::from_millis(300)).await;

    client.toggle_card(0).unwrap();
    client.play_selected().unwrap();
    wait_event(&mut events, |e| matches!(e, ClientEvent::CardsLeaving(_))).await;

    push(&mut ws, "you_joined_game", json!("8")).await;
    wait_event(&mut events, |e| matches!(e, ClientEvent::Navigate(GameId(8)))).await;
    let view = wait_view(&client, |v| v.game_id == Some(GameId(8))).await;
    assert!(view.selection.is_empty());

    assert_silent(&mut ws, Duration::from_millis(800)).await;

    client.shutdown().await;
}

#[tokio::test]
async fn test_client_rejoining_same_game_keeps_deferred_play() {
    let (mut client, mut events, mut ws) =
        seated_client(json!([{"color": "red", "value": "5"}]), Duration::from_millis(300)).await;

    client.toggle_card(0).unwrap();
    client.play_selected().unwrap();
    wait_event(&mut events, |e| matches!(e, ClientEvent::CardsLeaving(_))).await;

    push(&mut ws, "you_joined_game", json!("7")).await;

    let sent = next_action(&mut ws).await;
    assert_eq!(sent["action"], "play_cards");
    assert_eq!(sent["game_id"], 7);

    client.shutdown().await;
}

// =========================================================================
// Reconnect
// =========================================================================

#[tokio::test]
async fn test_client_reconnects_and_refreshes_lobby() {
    init_tracing();
    let (listener, url) = listen().await;
    let (mut client, mut events) = GameClient::builder().endpoint(url).build();

    let mut first = accept(&listener).await;
    assert_eq!(next_action(&mut first).await, json!({"action": "fetch_games"}));
    wait_event(&mut events, |e| {
        matches!(e, ClientEvent::Connection(ConnectionState::Connected))
    })
    .await;
    first.close(None).await.unwrap();
    drop(first);

    let mut second = accept(&listener).await;
    assert_eq!(next_action(&mut second).await, json!({"action": "fetch_games"}));

    client.shutdown().await;
}
