//! Gateway client — connection loop, heartbeat and reconnect backoff.

use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message, protocol::CloseFrame};
use tracing::{debug, error, info, warn};

use voicetime_core::config::GatewayConfig;
use voicetime_core::events::GatewayEvent;
use voicetime_core::result::AppResult;

use crate::directory::NameCache;
use crate::dispatcher::Dispatcher;
use crate::error::GatewayError;
use crate::protocol::{Dispatch, GatewayPayload, Hello, intents, opcode};

/// Close code reported when the server sent no close frame.
const NO_STATUS_RECEIVED: u16 = 1005;

/// Maintains a gateway session and forwards tracker events.
///
/// Each reconnect identifies a fresh session. The [`Dispatcher`] outlives
/// sessions, so the new session's guild listings are reconciled against
/// what was already reported.
pub struct GatewayClient {
    /// Connection settings
    config: GatewayConfig,
    /// Session-independent state
    dispatcher: Dispatcher,
    /// Last dispatch sequence number of the current session
    last_sequence: Option<u64>,
    /// Whether the current session received READY
    session_ready: bool,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("url", &self.config.url)
            .field("last_sequence", &self.last_sequence)
            .finish()
    }
}

impl GatewayClient {
    /// Create a client recording names into `names`.
    pub fn new(config: GatewayConfig, names: Arc<NameCache>) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::new(names),
            last_sequence: None,
            session_ready: false,
        }
    }

    /// Run sessions until shutdown, the event receiver is dropped, or the
    /// gateway rejects the connection permanently.
    pub async fn run(
        mut self,
        events: mpsc::Sender<GatewayEvent>,
        mut cancel: watch::Receiver<bool>,
    ) -> AppResult<()> {
        let mut backoff = self.config.initial_backoff();

        loop {
            match self.run_session(&events, &mut cancel).await {
                Ok(()) => {
                    info!("Gateway client stopped");
                    return Ok(());
                }
                Err(e) if e.is_fatal() => {
                    error!("Gateway rejected the session: {}", e);
                    return Err(e.into());
                }
                Err(e) => warn!("Gateway session ended: {}", e),
            }

            if self.session_ready {
                backoff = self.config.initial_backoff();
            }

            info!("Reconnecting to gateway in {:?}", backoff);
            tokio::select! {
                _ = time::sleep(backoff) => {}
                _ = cancelled(&mut cancel) => {
                    info!("Gateway client stopped");
                    return Ok(());
                }
            }
            backoff = next_backoff(backoff, self.config.max_backoff());
        }
    }

    /// Run one session. `Ok` means shutdown was requested.
    async fn run_session(
        &mut self,
        events: &mpsc::Sender<GatewayEvent>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), GatewayError> {
        self.last_sequence = None;
        self.session_ready = false;

        info!("Connecting to gateway at {}", self.config.url);
        let (socket, _) = connect_async(self.config.url.as_str()).await?;
        let (mut sink, mut stream) = socket.split();

        let hello = read_hello(&mut stream).await?;
        let period = Duration::from_millis(hello.heartbeat_interval);
        debug!(interval = ?period, "Received Hello");

        send(
            &mut sink,
            &GatewayPayload::identify(&self.config.token, intents::VOICE_TRACKING),
        )
        .await?;

        let mut heartbeat = time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut acknowledged = true;
        // armed by READY while listed guilds are still outstanding
        let mut guild_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = cancelled(cancel) => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(());
                }
                _ = time::sleep_until(guild_deadline.unwrap_or_else(Instant::now)), if guild_deadline.is_some() => {
                    guild_deadline = None;
                    if !emit(self.dispatcher.expire_pending(), events).await {
                        return Ok(());
                    }
                }
                _ = heartbeat.tick() => {
                    if !acknowledged {
                        return Err(GatewayError::HeartbeatTimeout);
                    }
                    acknowledged = false;
                    send(&mut sink, &GatewayPayload::heartbeat(self.last_sequence)).await?;
                }
                message = stream.next() => {
                    let payload = match message.ok_or(GatewayError::StreamEnded)?? {
                        Message::Text(text) => serde_json::from_str::<GatewayPayload>(text.as_str())?,
                        Message::Close(frame) => return Err(closed(frame)),
                        _ => continue,
                    };

                    if let Some(sequence) = payload.s {
                        self.last_sequence = Some(sequence);
                    }

                    match payload.op {
                        opcode::DISPATCH => {
                            if !self.forward(payload, events).await {
                                return Ok(());
                            }
                            if guild_deadline.is_none() && self.dispatcher.is_awaiting_guilds() {
                                guild_deadline =
                                    Some(Instant::now() + self.config.guild_ready_timeout());
                            }
                        }
                        opcode::HEARTBEAT => {
                            send(&mut sink, &GatewayPayload::heartbeat(self.last_sequence)).await?;
                        }
                        opcode::HEARTBEAT_ACK => acknowledged = true,
                        opcode::RECONNECT => return Err(GatewayError::ReconnectRequested),
                        opcode::INVALID_SESSION => return Err(GatewayError::InvalidSession),
                        other => debug!(op = other, "Ignoring opcode"),
                    }
                }
            }
        }
    }

    /// Decode a dispatch and forward the resulting events. Returns `false`
    /// once the tracker has stopped receiving.
    async fn forward(&mut self, payload: GatewayPayload, events: &mpsc::Sender<GatewayEvent>) -> bool {
        let Some(name) = payload.t else {
            return true;
        };

        let dispatch = match Dispatch::decode(&name, payload.d.unwrap_or(Value::Null)) {
            Ok(dispatch) => dispatch,
            Err(e) => {
                warn!(event = %name, "Failed to decode dispatch: {}", e);
                return true;
            }
        };
        if matches!(dispatch, Dispatch::Ready(_)) {
            self.session_ready = true;
        }

        emit(self.dispatcher.handle(dispatch), events).await
    }
}

/// Send events to the tracker. Returns `false` once it stopped receiving.
async fn emit(produced: Vec<GatewayEvent>, events: &mpsc::Sender<GatewayEvent>) -> bool {
    for event in produced {
        if events.send(event).await.is_err() {
            info!("Tracker stopped receiving gateway events");
            return false;
        }
    }
    true
}

/// Wait for the first payload, which must be Hello.
async fn read_hello<S>(stream: &mut S) -> Result<Hello, GatewayError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        match stream.next().await.ok_or(GatewayError::StreamEnded)?? {
            Message::Text(text) => {
                let payload: GatewayPayload = serde_json::from_str(text.as_str())?;
                if payload.op != opcode::HELLO {
                    return Err(GatewayError::MissingHello { op: payload.op });
                }
                return Ok(serde_json::from_value(payload.d.unwrap_or(Value::Null))?);
            }
            Message::Close(frame) => return Err(closed(frame)),
            _ => continue,
        }
    }
}

async fn send<S>(sink: &mut S, payload: &GatewayPayload) -> Result<(), GatewayError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(payload)?;
    sink.send(Message::Text(text.into())).await?;
    Ok(())
}

fn closed(frame: Option<CloseFrame>) -> GatewayError {
    match frame {
        Some(frame) => GatewayError::Closed {
            code: u16::from(frame.code),
            reason: frame.reason.as_str().to_string(),
        },
        None => GatewayError::Closed {
            code: NO_STATUS_RECEIVED,
            reason: String::new(),
        },
    }
}

/// Resolve once shutdown is signalled or the signal sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow_and_update() {
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

/// Double the delay, capped at `max`.
fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}
