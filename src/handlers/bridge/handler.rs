//! Bridge WebSocket handler
//!
//! This module provides the WebSocket handler that bridges browser
//! microphone audio to the Gemini Live API and streams synthesized
//! voice back.
//!
//! Both legs carry raw PCM16-LE mono audio in binary frames. The bridge
//! resamples between the client capture rate and the fixed model rates
//! (16kHz in, 24kHz out) and paces model audio into uniform 20ms frames.

use axum::{
    Extension,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::{select, time::Duration};
use tracing::{debug, error, info, warn};

use crate::core::audio::{
    DEFAULT_CLIENT_SAMPLE_RATE, FrameChunker, MODEL_INPUT_SAMPLE_RATE, MODEL_OUTPUT_SAMPLE_RATE,
    StreamResampler, WavTap, bytes_to_samples, is_supported_client_rate, samples_to_bytes,
};
use crate::core::live::{
    BaseLive, LiveAudioData, LiveConfig, LiveError, TranscriptResult, TranscriptRole, TurnEvent,
    create_live_provider,
};
use crate::middleware::ClientIp;
use crate::state::AppState;

use super::messages::{
    BridgeIncomingMessage, BridgeMessageRoute, BridgeOutgoingMessage, BridgeSessionConfig,
};

/// Optimized channel buffer size for audio workloads
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Provider backing the bridge
const BRIDGE_PROVIDER: &str = "gemini";

/// Query parameters accepted on the upgrade request
#[derive(Debug, Deserialize)]
pub struct BridgeQuery {
    /// Client capture rate hint, e.g. `/ws/audio?sample-rate=16000`
    #[serde(rename = "sample-rate")]
    pub sample_rate: Option<u32>,
}

/// Outbound audio pipeline shared between provider callbacks.
///
/// Model audio arrives at 24kHz on the provider's read task; the
/// callbacks resample it to the client rate, pace it into uniform
/// frames and optionally tee it into a WAV file for debugging.
struct OutboundPipeline {
    resampler: StreamResampler,
    chunker: FrameChunker,
    tap: Option<WavTap>,
}

impl OutboundPipeline {
    fn new(client_rate: u32, tap: Option<WavTap>) -> Self {
        Self {
            resampler: StreamResampler::new(MODEL_OUTPUT_SAMPLE_RATE, client_rate),
            chunker: FrameChunker::new(client_rate),
            tap,
        }
    }
}

/// Per-connection session state
struct BridgeSession {
    provider: Option<Box<dyn BaseLive>>,
    session_id: Option<String>,
    /// Client audio -> model input rate
    inbound: StreamResampler,
    /// Model output rate -> client audio, shared with provider callbacks
    outbound: Arc<Mutex<OutboundPipeline>>,
    /// Effective client capture rate (query hint until `start` overrides it)
    client_input_rate: u32,
}

/// Bridge WebSocket handler
///
/// Upgrades the HTTP connection to WebSocket for bidirectional audio
/// streaming against the Gemini Live API.
///
/// # Arguments
/// * `ws` - The WebSocket upgrade request from Axum
/// * `query` - Optional `sample-rate` hint for the client capture rate
/// * `state` - Application state containing configuration
/// * `client_ip` - Set by the connection-limit middleware; used to release the slot
///
/// # Returns
/// * `Response` - HTTP response that upgrades the connection to WebSocket
pub async fn bridge_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<BridgeQuery>,
    State(state): State<Arc<AppState>>,
    client_ip: Option<Extension<ClientIp>>,
) -> Response {
    let client_rate = match query.sample_rate {
        Some(rate) if is_supported_client_rate(rate) => rate,
        Some(rate) => {
            warn!(
                rate,
                "Unsupported sample-rate hint, falling back to {} Hz", DEFAULT_CLIENT_SAMPLE_RATE
            );
            DEFAULT_CLIENT_SAMPLE_RATE
        }
        None => DEFAULT_CLIENT_SAMPLE_RATE,
    };

    info!(
        sample_rate = client_rate,
        "Bridge WebSocket connection upgrade requested"
    );

    let ip = client_ip.map(|Extension(ClientIp(ip))| ip);

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_bridge_socket(socket, state, ip, client_rate))
}

/// Idle timeout of `base_secs` with up to ±`jitter_range` seconds of
/// jitter, seeded from the wall clock's subsecond nanos.
fn jittered_idle_timeout(base_secs: u64, jitter_range: u64) -> Duration {
    let entropy = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
    let jitter_offset = (entropy % (jitter_range * 2)) as i64 - jitter_range as i64;
    Duration::from_secs((base_secs as i64 + jitter_offset).max(1) as u64)
}

/// Handle the bridge WebSocket connection
async fn handle_bridge_socket(
    socket: WebSocket,
    app_state: Arc<AppState>,
    client_ip: Option<IpAddr>,
    client_rate: u32,
) {
    info!("Bridge WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<BridgeMessageRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing messages
    let sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let should_close = matches!(route, BridgeMessageRoute::Close);

            let result = match route {
                BridgeMessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                },
                BridgeMessageRoute::Audio(data) => sender.send(Message::Binary(data)).await,
                BridgeMessageRoute::Close => {
                    info!("Closing bridge WebSocket connection");
                    sender.send(Message::Close(None)).await
                }
            };

            if let Err(e) = result {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }

            if should_close {
                break;
            }
        }
    });

    let mut session = BridgeSession {
        provider: None,
        session_id: None,
        inbound: StreamResampler::new(client_rate, MODEL_INPUT_SAMPLE_RATE),
        outbound: Arc::new(Mutex::new(OutboundPipeline::new(client_rate, None))),
        client_input_rate: client_rate,
    };

    // How often we check if the connection is stale
    let processing_timeout = Duration::from_secs(30);

    // Maximum idle time before closing the connection (5 minutes with ±10% jitter)
    // Jitter prevents thundering herd when many connections timeout simultaneously
    let idle_timeout = jittered_idle_timeout(300, 30);

    // Track last activity time for idle connection detection
    let mut last_activity = std::time::Instant::now();

    loop {
        select! {
            msg_result = receiver.next() => {
                // Update activity time on any message
                last_activity = std::time::Instant::now();

                match msg_result {
                    Some(Ok(msg)) => {
                        let continue_processing = process_bridge_message(
                            msg,
                            &mut session,
                            &message_tx,
                            &app_state,
                        ).await;

                        if !continue_processing {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Bridge WebSocket error: {}", e);
                        let _ = message_tx
                            .send(BridgeMessageRoute::Outgoing(
                                BridgeOutgoingMessage::Error {
                                    code: Some("websocket_error".to_string()),
                                    message: format!("WebSocket error: {e}"),
                                },
                            ))
                            .await;
                        break;
                    }
                    None => {
                        info!("Bridge WebSocket connection closed by client");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep(processing_timeout) => {
                // Check if connection has been idle too long
                if last_activity.elapsed() > idle_timeout {
                    warn!(
                        "Bridge WebSocket connection idle for {}s, closing stale connection",
                        last_activity.elapsed().as_secs()
                    );
                    let _ = message_tx
                        .send(BridgeMessageRoute::Outgoing(
                            BridgeOutgoingMessage::Error {
                                code: Some("idle_timeout".to_string()),
                                message: "Connection closed due to inactivity".to_string(),
                            },
                        ))
                        .await;
                    break;
                }
                debug!("Bridge WebSocket connection idle check - still active");
            }
        }
    }

    // Cleanup
    sender_task.abort();

    // Disconnect the live provider if connected
    if let Some(mut provider) = session.provider
        && let Err(e) = provider.disconnect().await
    {
        error!("Failed to disconnect live provider: {:?}", e);
    }

    // Finalize the debug recording, if any
    {
        let mut pipeline = session.outbound.lock().await;
        if let Some(tap) = pipeline.tap.as_mut()
            && let Err(e) = tap.finish()
        {
            warn!("Failed to finalize recording: {}", e);
        }
    }

    // Release the connection-limit slot acquired by the middleware
    if let Some(ip) = client_ip {
        app_state.release_connection(ip);
    }

    info!(session_id = ?session.session_id, "Bridge WebSocket connection terminated");
}

/// Process incoming WebSocket message
#[inline(always)]
async fn process_bridge_message(
    msg: Message,
    session: &mut BridgeSession,
    message_tx: &mpsc::Sender<BridgeMessageRoute>,
    app_state: &Arc<AppState>,
) -> bool {
    match msg {
        Message::Text(text) => {
            debug!("Received text message: {} bytes", text.len());

            let incoming_msg: BridgeIncomingMessage = match serde_json::from_str(&text) {
                Ok(msg) => msg,
                Err(e) => {
                    error!("Failed to parse bridge message: {}", e);
                    let _ = message_tx
                        .send(BridgeMessageRoute::Outgoing(BridgeOutgoingMessage::Error {
                            code: Some("parse_error".to_string()),
                            message: format!("Invalid message format: {e}"),
                        }))
                        .await;
                    return true;
                }
            };

            // Validate message sizes and rates
            if let Err(e) = incoming_msg.validate() {
                warn!("Message validation failed: {}", e);
                let _ = message_tx
                    .send(BridgeMessageRoute::Outgoing(BridgeOutgoingMessage::Error {
                        code: Some("validation_error".to_string()),
                        message: e.to_string(),
                    }))
                    .await;
                return true;
            }

            handle_bridge_incoming(incoming_msg, session, message_tx, app_state).await
        }
        Message::Binary(data) => {
            debug!("Received binary audio: {} bytes", data.len());

            let Some(provider) = session.provider.as_mut() else {
                debug!("No session started, dropping audio");
                return true;
            };
            if !provider.is_ready() {
                debug!("Provider not ready, dropping audio");
                return true;
            }

            // Resample client audio to the model input rate
            let samples = bytes_to_samples(&data);
            let resampled = session.inbound.process(&samples);
            if resampled.is_empty() {
                return true;
            }

            let model_audio = bytes::Bytes::from(samples_to_bytes(&resampled));
            if let Err(e) = provider.send_audio(model_audio).await {
                warn!("Failed to send audio to provider: {:?}", e);
                let _ = message_tx
                    .send(BridgeMessageRoute::Outgoing(BridgeOutgoingMessage::Error {
                        code: Some("audio_error".to_string()),
                        message: format!("Failed to send audio: {e}"),
                    }))
                    .await;
            }
            true
        }
        Message::Ping(_) => {
            debug!("Received ping");
            true
        }
        Message::Pong(_) => {
            debug!("Received pong");
            true
        }
        Message::Close(_) => {
            info!("Bridge WebSocket close received");
            false
        }
    }
}

/// Handle typed incoming messages
async fn handle_bridge_incoming(
    msg: BridgeIncomingMessage,
    session: &mut BridgeSession,
    message_tx: &mpsc::Sender<BridgeMessageRoute>,
    app_state: &Arc<AppState>,
) -> bool {
    match msg {
        BridgeIncomingMessage::Start(config) => {
            handle_start(config, session, message_tx, app_state).await
        }
        BridgeIncomingMessage::Text { text } => {
            if let Some(provider) = session.provider.as_mut()
                && provider.is_ready()
                && let Err(e) = provider.send_text(&text).await
            {
                let _ = message_tx
                    .send(BridgeMessageRoute::Outgoing(BridgeOutgoingMessage::Error {
                        code: Some("text_error".to_string()),
                        message: format!("Failed to send text: {e}"),
                    }))
                    .await;
            }
            true
        }
        BridgeIncomingMessage::Stop => {
            info!("Client requested stop");
            let _ = message_tx
                .send(BridgeMessageRoute::Outgoing(
                    BridgeOutgoingMessage::Closing {
                        reason: "client requested stop".to_string(),
                    },
                ))
                .await;
            let _ = message_tx.send(BridgeMessageRoute::Close).await;
            false
        }
    }
}

/// Handle the start message - create and connect the live provider
async fn handle_start(
    config: BridgeSessionConfig,
    session: &mut BridgeSession,
    message_tx: &mpsc::Sender<BridgeMessageRoute>,
    app_state: &Arc<AppState>,
) -> bool {
    if session.provider.is_some() {
        let _ = message_tx
            .send(BridgeMessageRoute::Outgoing(BridgeOutgoingMessage::Error {
                code: Some("already_started".to_string()),
                message: "Session already started".to_string(),
            }))
            .await;
        return true;
    }

    let api_key = match app_state.config.get_gemini_api_key() {
        Ok(key) => key,
        Err(e) => {
            let _ = message_tx
                .send(BridgeMessageRoute::Outgoing(BridgeOutgoingMessage::Error {
                    code: Some("missing_api_key".to_string()),
                    message: e,
                }))
                .await;
            return true;
        }
    };

    // Session overrides win over the query hint and server defaults
    let input_rate = config.input_sample_rate.unwrap_or(session.client_input_rate);
    let output_rate = config.output_sample_rate.unwrap_or(input_rate);
    session.client_input_rate = input_rate;
    session.inbound = StreamResampler::new(input_rate, MODEL_INPUT_SAMPLE_RATE);

    let live_config = build_live_config(api_key, &app_state.config, &config);
    let model = live_config.model.clone();
    let voice = live_config
        .voice
        .clone()
        .unwrap_or_else(|| app_state.config.default_voice.clone());
    let greeting = live_config.greeting.clone();

    let new_session_id = uuid::Uuid::new_v4().to_string();

    // Optional debug recording of the synthesized audio
    let tap = match app_state.config.record_dir.as_ref() {
        Some(dir) => {
            let path = dir.join(format!("{new_session_id}.wav"));
            match WavTap::create(&path, output_rate) {
                Ok(tap) => {
                    info!(path = %path.display(), "Recording synthesized audio");
                    Some(tap)
                }
                Err(e) => {
                    warn!("Failed to create recording file: {}", e);
                    None
                }
            }
        }
        None => None,
    };
    session.outbound = Arc::new(Mutex::new(OutboundPipeline::new(output_rate, tap)));

    // Create provider
    let mut provider = match create_live_provider(BRIDGE_PROVIDER, live_config) {
        Ok(p) => p,
        Err(e) => {
            let _ = message_tx
                .send(BridgeMessageRoute::Outgoing(BridgeOutgoingMessage::Error {
                    code: Some("provider_error".to_string()),
                    message: format!("Failed to create provider: {e}"),
                }))
                .await;
            return true;
        }
    };

    // Register callbacks before connecting
    let tx_clone = message_tx.clone();
    provider
        .on_transcript(Arc::new(move |result: TranscriptResult| {
            let tx = tx_clone.clone();
            Box::pin(async move {
                let role = match result.role {
                    TranscriptRole::User => "user",
                    TranscriptRole::Assistant => "assistant",
                };
                let _ = tx
                    .send(BridgeMessageRoute::Outgoing(
                        BridgeOutgoingMessage::Transcript {
                            text: result.text,
                            role: role.to_string(),
                            is_final: result.is_final,
                        },
                    ))
                    .await;
            })
        }))
        .ok();

    let tx_clone = message_tx.clone();
    let pipeline = session.outbound.clone();
    provider
        .on_audio(Arc::new(move |audio: LiveAudioData| {
            let tx = tx_clone.clone();
            let pipeline = pipeline.clone();
            Box::pin(async move {
                let samples = bytes_to_samples(&audio.data);
                let mut pipeline = pipeline.lock().await;
                let resampled = pipeline.resampler.process(&samples);
                if let Some(tap) = pipeline.tap.as_mut()
                    && let Err(e) = tap.write_samples(&resampled)
                {
                    warn!("Failed to write recording: {}", e);
                }
                let frames = pipeline.chunker.push(&samples_to_bytes(&resampled));
                drop(pipeline);
                for frame in frames {
                    let _ = tx.send(BridgeMessageRoute::Audio(frame)).await;
                }
            })
        }))
        .ok();

    let tx_clone = message_tx.clone();
    let pipeline = session.outbound.clone();
    provider
        .on_turn_event(Arc::new(move |event: TurnEvent| {
            let tx = tx_clone.clone();
            let pipeline = pipeline.clone();
            Box::pin(async move {
                match event {
                    TurnEvent::Interrupted => {
                        // Barge-in: stale audio for the cancelled turn must
                        // not reach the client after the event
                        pipeline.lock().await.chunker.clear();
                    }
                    TurnEvent::Complete | TurnEvent::GenerationComplete => {
                        let remainder = pipeline.lock().await.chunker.drain();
                        if let Some(frame) = remainder {
                            let _ = tx.send(BridgeMessageRoute::Audio(frame)).await;
                        }
                    }
                    TurnEvent::Started => {}
                }
                let _ = tx
                    .send(BridgeMessageRoute::Outgoing(
                        BridgeOutgoingMessage::TurnEvent {
                            event: event.to_string(),
                        },
                    ))
                    .await;
            })
        }))
        .ok();

    let tx_clone = message_tx.clone();
    provider
        .on_error(Arc::new(move |error: LiveError| {
            let tx = tx_clone.clone();
            Box::pin(async move {
                // ConnectionFailed is terminal here: the provider only
                // reports it once its reconnection attempts are exhausted
                let fatal = matches!(error, LiveError::ConnectionFailed(_));
                let _ = tx
                    .send(BridgeMessageRoute::Outgoing(BridgeOutgoingMessage::Error {
                        code: Some("provider_error".to_string()),
                        message: error.to_string(),
                    }))
                    .await;
                if fatal {
                    let _ = tx.send(BridgeMessageRoute::Close).await;
                }
            })
        }))
        .ok();

    provider
        .on_reconnection(Arc::new(move |event| {
            Box::pin(async move {
                if event.success {
                    info!(attempt = event.attempt, "Live session reconnected");
                } else {
                    warn!(
                        attempt = event.attempt,
                        error = ?event.error,
                        "Live session reconnection attempt failed"
                    );
                }
            })
        }))
        .ok();

    // Connect to the provider
    info!(
        model = %model,
        voice = %voice,
        api_key = %app_state.config.redacted_api_key(),
        "Connecting to Gemini Live"
    );
    if let Err(e) = provider.connect().await {
        let _ = message_tx
            .send(BridgeMessageRoute::Outgoing(BridgeOutgoingMessage::Error {
                code: Some("connection_error".to_string()),
                message: format!("Failed to connect: {e}"),
            }))
            .await;
        return true;
    }

    // Kick off the conversation with the configured greeting, if any
    if let Some(greeting) = greeting
        && let Err(e) = provider.send_text(&greeting).await
    {
        warn!("Failed to send greeting: {:?}", e);
    }

    session.session_id = Some(new_session_id.clone());
    session.provider = Some(provider);

    let _ = message_tx
        .send(BridgeMessageRoute::Outgoing(
            BridgeOutgoingMessage::SessionCreated {
                session_id: new_session_id,
                model,
                voice,
            },
        ))
        .await;

    info!("Bridge session created");
    true
}

/// Build LiveConfig from server defaults and session overrides
fn build_live_config(
    api_key: String,
    defaults: &crate::config::ServerConfig,
    config: &BridgeSessionConfig,
) -> LiveConfig {
    LiveConfig {
        api_key,
        endpoint: None,
        provider: BRIDGE_PROVIDER.to_string(),
        model: config
            .model
            .clone()
            .unwrap_or_else(|| defaults.default_model.clone()),
        voice: config
            .voice
            .clone()
            .or_else(|| Some(defaults.default_voice.clone())),
        language_code: config
            .language_code
            .clone()
            .or_else(|| defaults.default_language_code.clone()),
        instructions: config
            .instructions
            .clone()
            .or_else(|| defaults.default_instructions.clone()),
        greeting: config.greeting.clone().or_else(|| defaults.greeting.clone()),
        transcribe_input: true,
        transcribe_output: true,
        reconnection: None,
    }
}
