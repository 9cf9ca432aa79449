//! Long-poll loop.
//!
//! Draw-command batches are fetched with a single perpetual loop: one
//! request in flight at a time, the next issued as soon as the previous one
//! resolves. The server holds each request open until it has new data or
//! its own timeout elapses; "nothing new for a while" is a normal outcome,
//! not an error. Batches are handed to the control task over a bounded
//! channel so they are applied in arrival order by a single writer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Delay before re-polling after a transport error. No-data outcomes
/// re-poll immediately; this only keeps a dead server from producing a
/// hot loop.
const ERROR_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Outcome of one game-data request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A batch of draw-command bytes. May be empty.
    DataReceived(Vec<u8>),
    /// No new game state before the wait budget ran out.
    TimedOutNoData,
    /// The request itself failed.
    TransportError(String),
}

/// Source of game-data batches. The production implementation is the HTTP
/// client; tests script outcomes directly.
#[allow(async_fn_in_trait)]
pub trait GameTransport {
    async fn game_data(&self, instance: &str, player_id: &str) -> PollOutcome;
}

/// The perpetual poll loop for one joined session.
pub struct PollLoop<T> {
    transport: T,
    instance: String,
    player_id: String,
    running: Arc<AtomicBool>,
}

impl<T: GameTransport> PollLoop<T> {
    pub fn new(transport: T, instance: impl Into<String>, player_id: impl Into<String>) -> Self {
        Self {
            transport,
            instance: instance.into(),
            player_id: player_id.into(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag that stops the loop after the in-flight request resolves.
    /// There is no mid-flight cancellation.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Run until stopped or until the batch consumer goes away. Every
    /// completed request, whatever its outcome, triggers the next one.
    pub async fn run(self, batches: mpsc::Sender<Vec<u8>>) {
        while self.running.load(Ordering::SeqCst) {
            match self.transport.game_data(&self.instance, &self.player_id).await {
                PollOutcome::DataReceived(data) => {
                    if batches.send(data).await.is_err() {
                        debug!("batch consumer gone, poll loop stopping");
                        break;
                    }
                }
                PollOutcome::TimedOutNoData => {
                    // normal long-poll expiry, ask again right away
                }
                PollOutcome::TransportError(err) => {
                    warn!("game data poll failed: {}", err);
                    tokio::time::sleep(ERROR_RETRY_DELAY).await;
                }
            }
        }
        debug!("poll loop finished");
    }
}
