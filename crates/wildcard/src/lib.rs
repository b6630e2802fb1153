//! # Wildcard
//!
//! Real-time client core for a multiplayer card game played against a
//! remote authority.
//!
//! Wildcard keeps a local mirror of the authority's game session, checks
//! candidate moves before they are sent, stages multi-card plays (including
//! Wild color choice), and manages the one duplex connection with
//! reconnection and malformed-frame tolerance. Rendering is somebody
//! else's job: it reads the published [`ClientView`] and listens for
//! [`ClientEvent`]s.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wildcard::prelude::*;
//!
//! # async fn run() -> Result<(), WildcardError> {
//! let (mut client, mut events) = GameClient::builder()
//!     .endpoint("ws://localhost:3030")
//!     .build();
//!
//! client.create_game()?;
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ClientEvent::ColorRequested => client.choose_color(Color::Red)?,
//!         ClientEvent::Navigate(_) => break,
//!         _ => {}
//!     }
//! }
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod controller;
mod error;

pub use client::{ClientEvents, GameClient, GameClientBuilder};
pub use config::{ClientConfig, DEFAULT_ENDPOINT};
pub use controller::{ClientEvent, ClientView, Controller, Outcome};
pub use error::{ClientError, WildcardError};

pub use wildcard_protocol as protocol;
pub use wildcard_session as session;
pub use wildcard_table as table;
pub use wildcard_timer as timer;
pub use wildcard_transport as transport;

/// The types most client code needs.
pub mod prelude {
    pub use crate::{
        ClientConfig, ClientError, ClientEvent, ClientEvents, ClientView,
        GameClient, GameClientBuilder, WildcardError,
    };
    pub use wildcard_protocol::{Action, Card, CardValue, Color, GameId, PlayerId};
    pub use wildcard_table::TableError;
    pub use wildcard_transport::{ConnectionState, ReconnectPolicy};
}
