//! The connection manager: owns the one live connection to the authority.
//!
//! A single background task runs the state machine
//!
//! ```text
//!   Disconnected ──→ Connecting ──→ Connected
//!        ↑               │              │
//!        └───(fail)──────┘              │
//!        └───(error / remote close)─────┘ ──→ reconnect per policy
//! ```
//!
//! and multiplexes the outbound queue, the inbound stream, and the shutdown
//! signal with `tokio::select!`. Callers never touch the socket directly:
//! [`ConnectionManager::send`] is the only way in, and inbound frames come
//! out of the receiver returned by [`ConnectionManager::start`].

use std::fmt;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::{Connection, Connector, ReconnectPolicy};

/// How long [`ConnectionManager::shutdown`] waits for the task to exit
/// before aborting it.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle state of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection. Either not started yet, between attempts, or stopped.
    #[default]
    Disconnected,
    /// A connect attempt is in progress.
    Connecting,
    /// The connection is live; `send` delivers frames.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// Handle to the background connection task.
///
/// Construct one per client session and dispose of it on teardown, either
/// with [`shutdown`](Self::shutdown) or by dropping it (which aborts the
/// task).
pub struct ConnectionManager {
    outbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// Starts the connection task and returns the handle plus the inbound
    /// frame receiver.
    ///
    /// The receiver yields frames in arrival order, across reconnects, and
    /// returns `None` once the task has stopped for good.
    pub fn start<C: Connector>(
        connector: C,
        policy: ReconnectPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run(
            connector,
            policy,
            outbound_rx,
            inbound_tx,
            state_tx,
            shutdown_rx,
        ));

        let manager = Self {
            outbound_tx,
            state_rx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        };
        (manager, inbound_rx)
    }

    /// Queues a frame for the live connection.
    ///
    /// Returns `false`, and drops the frame, if the manager is not
    /// `Connected`. Never blocks.
    pub fn send(&self, frame: Vec<u8>) -> bool {
        let state = *self.state_rx.borrow();
        if state != ConnectionState::Connected {
            tracing::debug!(%state, "send while not connected, frame dropped");
            return false;
        }
        if self.outbound_tx.send(frame).is_err() {
            tracing::debug!("connection task gone, frame dropped");
            return false;
        }
        true
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Returns a receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Closes the live connection, stops reconnecting, and waits for the
    /// task to exit. Safe to call twice.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "connection task failed");
                }
                Err(_) => {
                    tracing::warn!("connection task did not exit in time, aborting");
                    task.abort();
                }
            }
        }
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("running", &self.task.is_some())
            .finish()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        // Drop can't await a graceful close, so just stop the task.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Background task
// ---------------------------------------------------------------------------

/// Why a live connection stopped being pumped.
enum PumpEnd {
    /// Error or remote close. Reconnect per policy.
    Lost,
    /// Shutdown requested, or nobody is listening any more.
    Stop,
}

async fn run<C: Connector>(
    connector: C,
    policy: ReconnectPolicy,
    mut outbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    inbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    state_tx: watch::Sender<ConnectionState>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let endpoint = connector.endpoint().to_string();
    tracing::debug!(%endpoint, "connection task started");

    // Consecutive failures since the last live connection.
    let mut failures: u32 = 0;
    let mut first = true;

    loop {
        if !first {
            let Some(delay) = policy.delay_for(failures) else {
                tracing::info!(%endpoint, failures, "not reconnecting");
                break;
            };
            if !delay.is_zero() {
                tracing::debug!(%endpoint, ?delay, "waiting before reconnect");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = &mut shutdown_rx => break,
                }
            }
            tracing::info!(%endpoint, attempt = failures + 1, "reconnecting");
        }
        first = false;

        set_state(&state_tx, ConnectionState::Connecting);
        let connected = tokio::select! {
            res = connector.connect() => res,
            _ = &mut shutdown_rx => {
                set_state(&state_tx, ConnectionState::Disconnected);
                break;
            }
        };

        let conn = match connected {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(%endpoint, error = %e, "connect failed");
                set_state(&state_tx, ConnectionState::Disconnected);
                failures = failures.saturating_add(1);
                continue;
            }
        };

        failures = 0;
        let conn_id = conn.id();
        set_state(&state_tx, ConnectionState::Connected);

        let end = pump(&conn, &mut outbound_rx, &inbound_tx, &mut shutdown_rx).await;
        set_state(&state_tx, ConnectionState::Disconnected);

        // Anything queued for the dead connection is not replayed.
        let mut dropped = 0usize;
        while outbound_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(%conn_id, dropped, "discarded unsent frames");
        }

        if let PumpEnd::Stop = end {
            if let Err(e) = conn.close().await {
                tracing::debug!(%conn_id, error = %e, "close failed");
            }
            break;
        }
    }

    set_state(&state_tx, ConnectionState::Disconnected);
    tracing::debug!(%endpoint, "connection task exited");
}

async fn pump<T: Connection>(
    conn: &T,
    outbound_rx: &mut mpsc::UnboundedReceiver<Vec<u8>>,
    inbound_tx: &mpsc::UnboundedSender<Vec<u8>>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> PumpEnd {
    let conn_id = conn.id();
    loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else {
                    return PumpEnd::Stop;
                };
                if let Err(e) = conn.send(&frame).await {
                    tracing::warn!(%conn_id, error = %e, "send failed");
                    return PumpEnd::Lost;
                }
            }
            incoming = conn.recv() => {
                match incoming {
                    Ok(Some(data)) => {
                        if inbound_tx.send(data).is_err() {
                            return PumpEnd::Stop;
                        }
                    }
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed by remote");
                        return PumpEnd::Lost;
                    }
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "receive failed");
                        return PumpEnd::Lost;
                    }
                }
            }
            _ = &mut *shutdown_rx => return PumpEnd::Stop,
        }
    }
}

fn set_state(tx: &watch::Sender<ConnectionState>, next: ConnectionState) {
    let prev = tx.send_replace(next);
    if prev != next {
        tracing::info!(from = %prev, to = %next, "connection state changed");
    }
}

// =========================================================================
// Tests
// =========================================================================
