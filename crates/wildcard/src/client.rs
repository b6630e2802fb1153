//! `GameClient` builder, handle, and actor loop.
//!
//! This is the entry point for running a Wildcard client. It ties the
//! layers together: transport → protocol → session → table.
//!
//! One background task owns the [`Controller`], the [`ConnectionManager`],
//! and the deferred-send scheduler. Inbound frames, user commands,
//! connection transitions, and due sends are all handled on that task, one
//! at a time, so session state is never mutated concurrently.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use wildcard_protocol::{Action, Codec, Color, GameId, JsonCodec};
use wildcard_timer::{SendKey, SendScheduler};
use wildcard_transport::{
    ConnectionManager, ConnectionState, Connector, ReconnectPolicy,
    WebSocketConnector,
};

use crate::controller::{ClientEvent, ClientView, Controller, Outcome};
use crate::{ClientConfig, ClientError};

/// How long [`GameClient::shutdown`] waits for the task to finish.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Receiving end of the client's event stream.
pub type ClientEvents = mpsc::Receiver<ClientEvent>;

/// User commands, serialized onto the client task.
#[derive(Debug)]
enum Command {
    ToggleCard(usize),
    PlaySelected,
    ChooseColor(Color),
    CancelColor,
    DrawCard,
    FetchGames,
    CreateGame,
    JoinGame(GameId),
    LeaveGame,
    Shutdown { reply: oneshot::Sender<()> },
}

/// Builder for configuring and starting a [`GameClient`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use wildcard::prelude::*;
///
/// # async fn run() {
/// let (client, mut events) = GameClient::builder()
///     .endpoint("ws://localhost:3030")
///     .play_delay(Duration::from_millis(250))
///     .build();
///
/// while let Some(event) = events.recv().await {
///     if let ClientEvent::Navigate(game_id) = event {
///         println!("joined {game_id}");
///     }
/// }
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct GameClientBuilder {
    config: ClientConfig,
}

impl GameClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the authority URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Sets the reconnect policy.
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.config.reconnect = policy;
        self
    }

    /// Delays each submitted play by `delay` before it is sent.
    pub fn play_delay(mut self, delay: Duration) -> Self {
        self.config.play_delay = delay;
        self
    }

    /// Sets the event channel capacity (minimum 1).
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Whether to send `fetch_games` on every (re)connect.
    pub fn refresh_lobby_on_connect(mut self, refresh: bool) -> Self {
        self.config.refresh_lobby_on_connect = refresh;
        self
    }

    /// Starts a client that dials the configured endpoint over WebSocket.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> (GameClient, ClientEvents) {
        let connector = WebSocketConnector::new(self.config.endpoint.clone());
        self.build_with(connector)
    }

    /// Starts a client over a custom [`Connector`].
    pub fn build_with<C: Connector>(self, connector: C) -> (GameClient, ClientEvents) {
        let config = self.config;
        let (manager, inbound) =
            ConnectionManager::start(connector, config.reconnect.clone());
        let state_rx = manager.subscribe();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        let (view_tx, view_rx) = watch::channel(ClientView::default());

        let actor = ClientActor {
            controller: Controller::new(),
            manager,
            inbound,
            state_rx,
            connection: ConnectionState::Disconnected,
            commands: command_rx,
            events: event_tx,
            view_tx,
            scheduler: SendScheduler::new(config.play_delay),
            deferred: Vec::new(),
            refresh_lobby_on_connect: config.refresh_lobby_on_connect,
            codec: JsonCodec,
        };

        tracing::info!(endpoint = %config.endpoint, "starting game client");
        let task = tokio::spawn(actor.run());

        let client = GameClient {
            commands: command_tx,
            view_rx,
            task: Some(task),
        };
        (client, event_rx)
    }
}

/// Handle to a running client.
///
/// Commands are fire-and-forget: their effects show up on the event stream
/// and in the published [`ClientView`]. Each returns
/// [`ClientError::Stopped`] once the client task is gone.
pub struct GameClient {
    commands: mpsc::UnboundedSender<Command>,
    view_rx: watch::Receiver<ClientView>,
    task: Option<JoinHandle<()>>,
}

impl GameClient {
    /// Creates a new builder.
    pub fn builder() -> GameClientBuilder {
        GameClientBuilder::new()
    }

    fn command(&self, cmd: Command) -> Result<(), ClientError> {
        self.commands.send(cmd).map_err(|_| ClientError::Stopped)
    }

    /// Stages or unstages the card at `slot` of the local hand.
    pub fn toggle_card(&self, slot: usize) -> Result<(), ClientError> {
        self.command(Command::ToggleCard(slot))
    }

    /// Submits the staged cards.
    pub fn play_selected(&self) -> Result<(), ClientError> {
        self.command(Command::PlaySelected)
    }

    /// Answers a [`ClientEvent::ColorRequested`].
    pub fn choose_color(&self, color: Color) -> Result<(), ClientError> {
        self.command(Command::ChooseColor(color))
    }

    /// Dismisses a color request without playing.
    pub fn cancel_color(&self) -> Result<(), ClientError> {
        self.command(Command::CancelColor)
    }

    pub fn draw_card(&self) -> Result<(), ClientError> {
        self.command(Command::DrawCard)
    }

    pub fn fetch_games(&self) -> Result<(), ClientError> {
        self.command(Command::FetchGames)
    }

    pub fn create_game(&self) -> Result<(), ClientError> {
        self.command(Command::CreateGame)
    }

    pub fn join_game(&self, game_id: GameId) -> Result<(), ClientError> {
        self.command(Command::JoinGame(game_id))
    }

    /// Navigates away from the current game.
    pub fn leave_game(&self) -> Result<(), ClientError> {
        self.command(Command::LeaveGame)
    }

    /// The latest published view.
    pub fn view(&self) -> ClientView {
        self.view_rx.borrow().clone()
    }

    /// Returns a receiver that observes every published view.
    pub fn subscribe(&self) -> watch::Receiver<ClientView> {
        self.view_rx.clone()
    }

    /// Tears the session down: cancels deferred sends, clears the
    /// selection and the store, and closes the connection. Safe to call
    /// twice.
    pub async fn shutdown(&mut self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Shutdown { reply }).is_ok() {
            let _ = done.await;
        }
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "client task failed"),
                Err(_) => {
                    tracing::warn!("client task did not exit in time, aborting");
                    task.abort();
                }
            }
        }
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for GameClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view = self.view_rx.borrow();
        f.debug_struct("GameClient")
            .field("connection", &view.connection)
            .field("game_id", &view.game_id)
            .field("running", &self.task.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct ClientActor {
    controller: Controller,
    manager: ConnectionManager,
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    state_rx: watch::Receiver<ConnectionState>,
    connection: ConnectionState,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::Sender<ClientEvent>,
    view_tx: watch::Sender<ClientView>,
    scheduler: SendScheduler<Action>,
    /// Keys of scheduled plays and the game each was made in.
    deferred: Vec<(SendKey, GameId)>,
    refresh_lobby_on_connect: bool,
    codec: JsonCodec,
}

impl ClientActor {
    async fn run(mut self) {
        tracing::debug!("client task started");
        let mut link_open = true;
        let mut watching = true;

        let reply = loop {
            tokio::select! {
                frame = self.inbound.recv(), if link_open => match frame {
                    Some(bytes) => {
                        tracing::trace!(frame = %String::from_utf8_lossy(&bytes), "inbound frame");
                        let before = self.controller.game_id();
                        let events = self.controller.handle_frame(&bytes);
                        self.emit_all(events);
                        self.drop_stale_plays(before);
                    }
                    None => {
                        tracing::info!("connection manager stopped, no further frames");
                        link_open = false;
                    }
                },
                changed = self.state_rx.changed(), if watching => match changed {
                    Ok(()) => {
                        let state = *self.state_rx.borrow_and_update();
                        self.on_connection(state);
                    }
                    Err(_) => {
                        watching = false;
                        self.on_connection(ConnectionState::Disconnected);
                    }
                },
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Shutdown { reply }) => break Some(reply),
                    Some(cmd) => self.handle_command(cmd),
                    // Every handle is gone.
                    None => break None,
                },
                due = self.scheduler.next_due() => {
                    tracing::debug!(key = %due.key, late_ms = due.late_by.as_millis() as u64, "deferred send due");
                    self.deferred.retain(|(key, _)| *key != due.key);
                    self.transmit(due.item);
                }
            }
            self.publish();
        };

        self.teardown().await;
        if let Some(reply) = reply {
            let _ = reply.send(());
        }
        tracing::info!("client stopped");
    }

    fn on_connection(&mut self, state: ConnectionState) {
        if state == self.connection {
            return;
        }
        tracing::info!(from = %self.connection, to = %state, "connection state changed");
        self.connection = state;
        self.emit(ClientEvent::Connection(state));

        if state == ConnectionState::Connected && self.refresh_lobby_on_connect {
            let outcome = self.controller.fetch_games();
            self.apply(outcome);
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        let before = self.controller.game_id();
        let outcome = match cmd {
            Command::ToggleCard(slot) => self.controller.toggle_card(slot),
            Command::PlaySelected => self.controller.play_selected(),
            Command::ChooseColor(color) => self.controller.choose_color(color),
            Command::CancelColor => self.controller.cancel_color(),
            Command::DrawCard => self.controller.draw_card(),
            Command::FetchGames => self.controller.fetch_games(),
            Command::CreateGame => self.controller.create_game(),
            Command::JoinGame(game_id) => self.controller.join_game(game_id),
            Command::LeaveGame => self.controller.leave_game(),
            Command::Shutdown { .. } => return,
        };
        self.apply(outcome);
        self.drop_stale_plays(before);
    }

    /// Cancels scheduled plays made in a game the client is no longer in.
    fn drop_stale_plays(&mut self, before: Option<GameId>) {
        let current = self.controller.game_id();
        if self.deferred.is_empty() || current == before {
            return;
        }
        let (stale, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred)
            .into_iter()
            .partition(|(_, game_id)| Some(*game_id) != current);
        self.deferred = kept;
        for (key, game_id) in stale {
            if self.scheduler.cancel(key).is_some() {
                tracing::debug!(%key, %game_id, "left game, pending play cancelled");
            }
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        self.emit_all(outcome.events);
        if let Some(action) = outcome.send {
            self.dispatch(action);
        }
    }

    /// Sends now, or parks a play on the scheduler when a delay is set.
    fn dispatch(&mut self, action: Action) {
        if action.is_play() && !self.scheduler.is_immediate() {
            if let Some(game_id) = action.game_id() {
                let key = self.scheduler.schedule(action);
                self.deferred.push((key, game_id));
                tracing::debug!(%key, %game_id, delay = ?self.scheduler.delay(), "play deferred");
                return;
            }
        }
        self.transmit(action);
    }

    fn transmit(&mut self, action: Action) {
        let bytes = match self.codec.encode(&action) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, action = action.kind(), "failed to encode action");
                self.controller.unsent(&action);
                return;
            }
        };

        if self.manager.send(bytes) {
            tracing::debug!(action = action.kind(), "action sent");
            self.controller.sent(&action);
            self.emit(ClientEvent::ActionSent(action));
        } else {
            tracing::debug!(action = action.kind(), "action dropped, not connected");
            self.controller.unsent(&action);
            self.emit(ClientEvent::Rejected(ClientError::NotConnected));
        }
    }

    fn emit_all(&mut self, events: Vec<ClientEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    fn emit(&mut self, event: ClientEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(?event, "event channel full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    fn publish(&mut self) {
        let view = self.controller.view(self.connection);
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }

    async fn teardown(&mut self) {
        self.deferred.clear();
        let cancelled = self.scheduler.cancel_all();
        if !cancelled.is_empty() {
            tracing::debug!(count = cancelled.len(), "cancelled pending sends");
        }
        for action in &cancelled {
            self.controller.unsent(action);
        }
        self.controller.reset();
        self.manager.shutdown().await;

        self.on_connection(ConnectionState::Disconnected);
        self.publish();
    }
}
