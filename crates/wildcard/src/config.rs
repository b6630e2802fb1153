//! Client configuration.

use std::time::Duration;

use wildcard_transport::ReconnectPolicy;

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:3030";

/// Settings for a [`GameClient`](crate::GameClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `ws://` or `wss://` URL of the authority.
    pub endpoint: String,

    /// What to do when the connection drops.
    pub reconnect: ReconnectPolicy,

    /// How long a submitted play waits before it is sent. Zero sends at
    /// once; otherwise the presentation layer gets this long to start its
    /// transition. Pending plays are cancelled on shutdown.
    pub play_delay: Duration,

    /// Capacity of the event channel. Events beyond it are dropped (and
    /// logged) rather than stalling the client.
    pub event_capacity: usize,

    /// Send `fetch_games` every time the connection comes up.
    pub refresh_lobby_on_connect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            reconnect: ReconnectPolicy::default(),
            play_delay: Duration::ZERO,
            event_capacity: 64,
            refresh_lobby_on_connect: true,
        }
    }
}
