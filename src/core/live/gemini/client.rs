//! Gemini Live API client implementation.
//!
//! This module provides the Gemini Live client that implements the
//! `BaseLive` trait using Google's WebSocket-based `BidiGenerateContent`
//! protocol.
//!
//! # API Reference
//!
//! - Endpoint: `wss://generativelanguage.googleapis.com/ws/...BidiGenerateContent?key=<api_key>`
//! - Protocol: WebSocket with JSON messages (text or binary frames)
//! - Audio in: PCM 16-bit, 16kHz, mono, little-endian, base64 encoded
//! - Audio out: PCM 16-bit, 24kHz, mono, little-endian, base64 encoded

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, Notify, RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use super::config::{
    GEMINI_INPUT_SAMPLE_RATE, GEMINI_LIVE_URL, GEMINI_OUTPUT_SAMPLE_RATE, GeminiLiveModel,
    GeminiVoice,
};
use super::messages::{
    AudioTranscriptionConfig, ClientMessage, Content, GenerationConfig, PrebuiltVoiceConfig,
    ServerMessage, Setup, SpeechConfig, VoiceConfig,
};
use crate::core::live::base::{
    AudioOutputCallback, BaseLive, ConnectionState, LiveAudioData, LiveConfig, LiveError,
    LiveErrorCallback, LiveResult, ReconnectionCallback, ReconnectionConfig, ReconnectionEvent,
    TranscriptCallback, TranscriptResult, TranscriptRole, TurnEvent, TurnEventCallback,
};

/// Channel capacity for WebSocket message sending.
const WS_CHANNEL_CAPACITY: usize = 256;

/// How long to wait for the server to acknowledge `setup`.
const SETUP_ACK_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Gemini Live Client
// =============================================================================

/// Gemini Live API client implementation.
///
/// # Thread Safety
///
/// This struct uses `Arc` wrappers for all mutable state so it can be
/// shared with the spawned WebSocket task. The `connected` flag uses
/// `Arc<AtomicBool>` for lock-free status checks.
///
/// # Automatic Reconnection
///
/// When the upstream connection drops unexpectedly the client reconnects
/// with exponential backoff and replays the `setup` message, so a
/// transient vendor outage does not terminate the caller's session.
/// Configure via `ReconnectionConfig` in the `LiveConfig`.
pub struct GeminiLive {
    /// Configuration
    config: LiveConfig,
    /// Parsed model
    model: GeminiLiveModel,
    /// Parsed voice
    voice: GeminiVoice,
    /// Connection state
    state: Arc<RwLock<ConnectionState>>,
    /// Connected flag for fast checks (shared with connection task)
    connected: Arc<AtomicBool>,
    /// Set once the server acknowledges setup
    session_ready: Arc<AtomicBool>,
    /// Wakes the `connect` waiter when setup is acknowledged
    ready_notify: Arc<Notify>,

    /// WebSocket sender channel
    ws_sender: Arc<Mutex<Option<mpsc::Sender<ClientMessage>>>>,

    /// Callbacks
    transcript_callback: Arc<Mutex<Option<TranscriptCallback>>>,
    audio_callback: Arc<Mutex<Option<AudioOutputCallback>>>,
    error_callback: Arc<Mutex<Option<LiveErrorCallback>>>,
    turn_event_callback: Arc<Mutex<Option<TurnEventCallback>>>,
    reconnection_callback: Arc<Mutex<Option<ReconnectionCallback>>>,

    /// Connection task handle
    connection_handle: Arc<Mutex<Option<JoinHandle<()>>>>,

    /// Reconnection configuration
    reconnection_config: ReconnectionConfig,

    /// Flag to indicate intentional disconnection (suppress reconnection)
    intentional_disconnect: Arc<AtomicBool>,

    /// Setup message sent at session start (replayed after reconnection)
    last_setup: Arc<RwLock<Option<Setup>>>,

    /// Whether the model is mid-turn (for emitting turn-started events)
    turn_active: Arc<AtomicBool>,
}

impl GeminiLive {
    /// Get the configured model.
    pub fn model(&self) -> GeminiLiveModel {
        self.model
    }

    /// Get the configured voice.
    pub fn voice(&self) -> GeminiVoice {
        self.voice
    }

    /// Build the WebSocket URL with the API key as a query parameter.
    ///
    /// The returned string contains the key and must never be logged.
    fn build_ws_url(&self) -> LiveResult<String> {
        let base = self.config.endpoint.as_deref().unwrap_or(GEMINI_LIVE_URL);
        let mut url = url::Url::parse(base)
            .map_err(|e| LiveError::InvalidConfiguration(format!("Invalid endpoint URL: {e}")))?;
        url.query_pairs_mut().append_pair("key", &self.config.api_key);
        Ok(url.to_string())
    }

    /// Build the session setup message.
    fn build_setup(&self) -> Setup {
        Setup {
            model: self.model.as_str().to_string(),
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: Some(SpeechConfig {
                    voice_config: Some(VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.voice.as_str().to_string(),
                        },
                    }),
                    language_code: self.config.language_code.clone(),
                }),
            }),
            system_instruction: self
                .config
                .instructions
                .as_deref()
                .map(Content::from_text),
            output_audio_transcription: self
                .config
                .transcribe_output
                .then(AudioTranscriptionConfig::default),
            input_audio_transcription: self
                .config
                .transcribe_input
                .then(AudioTranscriptionConfig::default),
        }
    }

    /// Handle a server message.
    ///
    /// Processes one incoming frame from the Live API and dispatches it
    /// to the registered callbacks.
    async fn handle_server_message(
        msg: ServerMessage,
        transcript_cb: &Arc<Mutex<Option<TranscriptCallback>>>,
        audio_cb: &Arc<Mutex<Option<AudioOutputCallback>>>,
        error_cb: &Arc<Mutex<Option<LiveErrorCallback>>>,
        turn_event_cb: &Arc<Mutex<Option<TurnEventCallback>>>,
        session_ready: &Arc<AtomicBool>,
        ready_notify: &Arc<Notify>,
        turn_active: &Arc<AtomicBool>,
    ) {
        if msg.setup_complete.is_some() {
            tracing::info!("Gemini Live session established");
            session_ready.store(true, Ordering::SeqCst);
            ready_notify.notify_one();
            return;
        }

        if let Some(content) = msg.server_content {
            if content.interrupted.unwrap_or(false) {
                tracing::debug!("Model turn interrupted by user speech");
                turn_active.store(false, Ordering::SeqCst);
                if let Some(cb) = turn_event_cb.lock().await.as_ref() {
                    cb(TurnEvent::Interrupted).await;
                }
            }

            if let Some(transcription) = content.input_transcription {
                if let Some(cb) = transcript_cb.lock().await.as_ref() {
                    cb(TranscriptResult {
                        text: transcription.text,
                        role: TranscriptRole::User,
                        is_final: transcription.finished.unwrap_or(false),
                    })
                    .await;
                }
            }

            if let Some(transcription) = content.output_transcription {
                if let Some(cb) = transcript_cb.lock().await.as_ref() {
                    cb(TranscriptResult {
                        text: transcription.text,
                        role: TranscriptRole::Assistant,
                        is_final: transcription.finished.unwrap_or(false),
                    })
                    .await;
                }
            }

            if let Some(turn) = content.model_turn {
                if !turn_active.swap(true, Ordering::SeqCst) {
                    if let Some(cb) = turn_event_cb.lock().await.as_ref() {
                        cb(TurnEvent::Started).await;
                    }
                }

                for part in turn.parts {
                    if let Some(blob) = part.inline_data {
                        match BASE64_STANDARD.decode(&blob.data) {
                            Ok(audio_bytes) => {
                                if let Some(cb) = audio_cb.lock().await.as_ref() {
                                    cb(LiveAudioData {
                                        data: Bytes::from(audio_bytes),
                                        sample_rate: GEMINI_OUTPUT_SAMPLE_RATE,
                                    })
                                    .await;
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to decode audio part: {}", e);
                                if let Some(cb) = error_cb.lock().await.as_ref() {
                                    cb(LiveError::SerializationError(e.to_string())).await;
                                }
                            }
                        }
                    } else if let Some(text) = part.text {
                        // Audio-native models can still emit text parts
                        if let Some(cb) = transcript_cb.lock().await.as_ref() {
                            cb(TranscriptResult {
                                text,
                                role: TranscriptRole::Assistant,
                                is_final: false,
                            })
                            .await;
                        }
                    }
                }
            }

            if content.generation_complete.unwrap_or(false) {
                if let Some(cb) = turn_event_cb.lock().await.as_ref() {
                    cb(TurnEvent::GenerationComplete).await;
                }
            }

            if content.turn_complete.unwrap_or(false) {
                turn_active.store(false, Ordering::SeqCst);
                if let Some(cb) = turn_event_cb.lock().await.as_ref() {
                    cb(TurnEvent::Complete).await;
                }
            }
        }

        if let Some(usage) = msg.usage_metadata {
            tracing::debug!(
                prompt = ?usage.prompt_token_count,
                response = ?usage.response_token_count,
                total = ?usage.total_token_count,
                "Gemini usage metadata"
            );
        }

        if let Some(go_away) = msg.go_away {
            tracing::warn!(
                "Gemini server is closing the connection (time left: {})",
                go_away.time_left.as_deref().unwrap_or("unknown")
            );
        }
    }

    /// Send a message to the WebSocket.
    async fn send_message(&self, msg: ClientMessage) -> LiveResult<()> {
        if let Some(sender) = self.ws_sender.lock().await.as_ref() {
            sender
                .send(msg)
                .await
                .map_err(|e| LiveError::WebSocketError(e.to_string()))?;
            Ok(())
        } else {
            Err(LiveError::NotConnected)
        }
    }
}

#[async_trait]
impl BaseLive for GeminiLive {
    fn new(config: LiveConfig) -> LiveResult<Self> {
        if config.api_key.is_empty() {
            return Err(LiveError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let model = if config.model.is_empty() {
            GeminiLiveModel::default()
        } else {
            GeminiLiveModel::from_str_or_default(&config.model)
        };

        let voice = if let Some(ref v) = config.voice {
            GeminiVoice::from_str_or_default(v)
        } else {
            GeminiVoice::default()
        };

        let reconnection_config = config.reconnection.clone().unwrap_or_default();

        Ok(Self {
            config,
            model,
            voice,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            connected: Arc::new(AtomicBool::new(false)),
            session_ready: Arc::new(AtomicBool::new(false)),
            ws_sender: Arc::new(Mutex::new(None)),
            transcript_callback: Arc::new(Mutex::new(None)),
            audio_callback: Arc::new(Mutex::new(None)),
            error_callback: Arc::new(Mutex::new(None)),
            turn_event_callback: Arc::new(Mutex::new(None)),
            reconnection_callback: Arc::new(Mutex::new(None)),
            ready_notify: Arc::new(Notify::new()),
            connection_handle: Arc::new(Mutex::new(None)),
            reconnection_config,
            intentional_disconnect: Arc::new(AtomicBool::new(false)),
            last_setup: Arc::new(RwLock::new(None)),
            turn_active: Arc::new(AtomicBool::new(false)),
        })
    }

    async fn connect(&mut self) -> LiveResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.intentional_disconnect.store(false, Ordering::SeqCst);
        self.session_ready.store(false, Ordering::SeqCst);
        *self.state.write().await = ConnectionState::Connecting;

        // Contains the API key, never logged
        let url = self.build_ws_url()?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| LiveError::ConnectionFailed(e.to_string()))?;

        tracing::info!(model = %self.model, voice = %self.voice, "Connected to Gemini Live API");

        let (ws_sink, ws_stream) = ws_stream.split();

        let (tx, mut rx) = mpsc::channel::<ClientMessage>(WS_CHANNEL_CAPACITY);
        *self.ws_sender.lock().await = Some(tx);

        // Clone references for the connection task
        let transcript_cb = self.transcript_callback.clone();
        let audio_cb = self.audio_callback.clone();
        let error_cb = self.error_callback.clone();
        let turn_event_cb = self.turn_event_callback.clone();
        let state = self.state.clone();
        let ws_sender = self.ws_sender.clone();
        let connected = self.connected.clone();
        let session_ready = self.session_ready.clone();
        let ready_notify = self.ready_notify.clone();
        let turn_active = self.turn_active.clone();

        let reconnection_config = self.reconnection_config.clone();
        let intentional_disconnect = self.intentional_disconnect.clone();
        let ws_url = url.clone();
        let last_setup = self.last_setup.clone();
        let reconnection_callback = self.reconnection_callback.clone();

        self.connected.store(true, Ordering::SeqCst);
        *self.state.write().await = ConnectionState::Connected;

        let handle = tokio::spawn(async move {
            let mut current_ws_sink = ws_sink;
            let mut current_ws_stream = ws_stream;
            let mut reconnect_attempt: u32 = 0;

            'outer: loop {
                // Main message processing loop
                loop {
                    tokio::select! {
                        // Handle outgoing messages
                        Some(msg) = rx.recv() => {
                            let json = match serde_json::to_string(&msg) {
                                Ok(j) => j,
                                Err(e) => {
                                    tracing::error!("Failed to serialize client message: {}", e);
                                    continue;
                                }
                            };

                            if let Err(e) = current_ws_sink.send(Message::Text(json.into())).await {
                                tracing::error!("Failed to send WebSocket message: {}", e);
                                break;
                            }
                        }

                        // Handle incoming messages
                        Some(msg) = current_ws_stream.next() => {
                            match msg {
                                // Gemini delivers JSON in either text or binary frames
                                Ok(Message::Text(text)) => {
                                    reconnect_attempt = 0;
                                    match serde_json::from_str::<ServerMessage>(&text) {
                                        Ok(server_msg) => {
                                            Self::handle_server_message(
                                                server_msg,
                                                &transcript_cb,
                                                &audio_cb,
                                                &error_cb,
                                                &turn_event_cb,
                                                &session_ready,
                                                &ready_notify,
                                                &turn_active,
                                            ).await;
                                        }
                                        Err(e) => {
                                            tracing::warn!("Failed to parse server message: {}", e);
                                        }
                                    }
                                }
                                Ok(Message::Binary(data)) => {
                                    reconnect_attempt = 0;
                                    match serde_json::from_slice::<ServerMessage>(&data) {
                                        Ok(server_msg) => {
                                            Self::handle_server_message(
                                                server_msg,
                                                &transcript_cb,
                                                &audio_cb,
                                                &error_cb,
                                                &turn_event_cb,
                                                &session_ready,
                                                &ready_notify,
                                                &turn_active,
                                            ).await;
                                        }
                                        Err(e) => {
                                            tracing::warn!("Failed to parse binary server message: {}", e);
                                        }
                                    }
                                }
                                Ok(Message::Close(frame)) => {
                                    tracing::info!("WebSocket closed by server: {:?}", frame);
                                    break;
                                }
                                Ok(Message::Ping(data)) => {
                                    if let Err(e) = current_ws_sink.send(Message::Pong(data)).await {
                                        tracing::error!("Failed to send pong: {}", e);
                                    }
                                }
                                Err(e) => {
                                    tracing::error!("WebSocket error: {}", e);
                                    break;
                                }
                                _ => {}
                            }
                        }

                        else => break,
                    }
                }

                // Connection ended - check if we should reconnect
                connected.store(false, Ordering::SeqCst);
                session_ready.store(false, Ordering::SeqCst);
                turn_active.store(false, Ordering::SeqCst);

                if intentional_disconnect.load(Ordering::SeqCst) {
                    tracing::info!("Intentional disconnect, not attempting reconnection");
                    *state.write().await = ConnectionState::Disconnected;
                    break 'outer;
                }

                // Keep dialing until a connection is established. Re-entering
                // the message loop on the dead stream would stall the retry
                // schedule until the next outbound send fails.
                loop {
                    if !reconnection_config.should_retry(reconnect_attempt) {
                        tracing::warn!(
                            "Reconnection disabled or max attempts ({}) reached",
                            reconnection_config.max_attempts
                        );

                        if let Some(cb) = error_cb.lock().await.as_ref() {
                            let err = LiveError::ConnectionFailed(format!(
                                "Connection lost after {} reconnection attempts",
                                reconnect_attempt
                            ));
                            cb(err).await;
                        }

                        *state.write().await = ConnectionState::Failed;
                        break 'outer;
                    }

                    reconnect_attempt += 1;
                    *state.write().await = ConnectionState::Reconnecting;

                    let delay_ms = reconnection_config.calculate_delay(reconnect_attempt);
                    tracing::info!(
                        "Attempting reconnection {}/{} in {}ms",
                        reconnect_attempt,
                        if reconnection_config.max_attempts == 0 {
                            "∞".to_string()
                        } else {
                            reconnection_config.max_attempts.to_string()
                        },
                        delay_ms
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                    if intentional_disconnect.load(Ordering::SeqCst) {
                        tracing::info!("Disconnect requested during reconnection delay");
                        *state.write().await = ConnectionState::Disconnected;
                        break 'outer;
                    }

                    match tokio_tungstenite::connect_async(&ws_url).await {
                        Ok((new_ws_stream, _)) => {
                            tracing::info!("Reconnected to Gemini Live API");

                            let (new_sink, new_stream) = new_ws_stream.split();
                            current_ws_sink = new_sink;
                            current_ws_stream = new_stream;

                            connected.store(true, Ordering::SeqCst);
                            *state.write().await = ConnectionState::Connected;

                            // Replay setup so the new session matches the old one
                            if let Some(setup) = last_setup.read().await.clone() {
                                let msg = ClientMessage::Setup { setup };
                                match serde_json::to_string(&msg) {
                                    Ok(json) => {
                                        if let Err(e) =
                                            current_ws_sink.send(Message::Text(json.into())).await
                                        {
                                            tracing::error!(
                                                "Failed to replay setup after reconnection: {}",
                                                e
                                            );
                                        }
                                    }
                                    Err(e) => {
                                        tracing::error!("Failed to serialize setup replay: {}", e);
                                    }
                                }
                            }

                            if let Some(cb) = reconnection_callback.lock().await.as_ref() {
                                cb(ReconnectionEvent {
                                    attempt: reconnect_attempt,
                                    success: true,
                                    error: None,
                                })
                                .await;
                            }

                            break;
                        }
                        Err(e) => {
                            tracing::error!(
                                "Reconnection attempt {} failed: {}",
                                reconnect_attempt,
                                e
                            );
                            if let Some(cb) = reconnection_callback.lock().await.as_ref() {
                                cb(ReconnectionEvent {
                                    attempt: reconnect_attempt,
                                    success: false,
                                    error: Some(e.to_string()),
                                })
                                .await;
                            }
                        }
                    }
                }
            }

            // Final cleanup - clear sender
            *ws_sender.lock().await = None;
            tracing::info!("Gemini Live connection task ended");
        });

        *self.connection_handle.lock().await = Some(handle);

        // First message of the session
        let setup = self.build_setup();
        *self.last_setup.write().await = Some(setup.clone());
        self.send_message(ClientMessage::Setup { setup }).await?;

        // Audio may only flow once the server acknowledges setup with
        // `setupComplete`; block here until the read task sees it
        let acknowledged = async {
            while !self.session_ready.load(Ordering::SeqCst) {
                self.ready_notify.notified().await;
            }
        };
        if tokio::time::timeout(SETUP_ACK_TIMEOUT, acknowledged)
            .await
            .is_err()
        {
            self.disconnect().await?;
            return Err(LiveError::SessionError(
                "No setup acknowledgement from server".to_string(),
            ));
        }

        Ok(())
    }

    async fn disconnect(&mut self) -> LiveResult<()> {
        self.intentional_disconnect.store(true, Ordering::SeqCst);

        // Clear sender to stop the connection loop
        *self.ws_sender.lock().await = None;

        if let Some(handle) = self.connection_handle.lock().await.take() {
            handle.abort();
        }

        self.connected.store(false, Ordering::SeqCst);
        self.session_ready.store(false, Ordering::SeqCst);
        *self.state.write().await = ConnectionState::Disconnected;

        tracing::info!("Disconnected from Gemini Live API");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        // Ready means the transport is up AND the server has acknowledged
        // setup; between reconnect and the replayed ack, audio is refused
        self.connected.load(Ordering::SeqCst) && self.session_ready.load(Ordering::SeqCst)
    }

    fn get_connection_state(&self) -> ConnectionState {
        if self.connected.load(Ordering::SeqCst) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    async fn send_audio(&mut self, audio_data: Bytes) -> LiveResult<()> {
        if !self.is_ready() {
            return Err(LiveError::NotConnected);
        }

        self.send_message(ClientMessage::audio_chunk(&audio_data))
            .await
    }

    async fn send_text(&mut self, text: &str) -> LiveResult<()> {
        if !self.is_ready() {
            return Err(LiveError::NotConnected);
        }

        self.send_message(ClientMessage::user_text(text)).await
    }

    fn on_transcript(&mut self, callback: TranscriptCallback) -> LiveResult<()> {
        // Use try_lock to register synchronously when possible so messages
        // arriving right after connect still find the callback in place
        if let Ok(mut guard) = self.transcript_callback.try_lock() {
            *guard = Some(callback);
        } else {
            let cb = self.transcript_callback.clone();
            tokio::spawn(async move {
                *cb.lock().await = Some(callback);
            });
        }
        Ok(())
    }

    fn on_audio(&mut self, callback: AudioOutputCallback) -> LiveResult<()> {
        if let Ok(mut guard) = self.audio_callback.try_lock() {
            *guard = Some(callback);
        } else {
            let cb = self.audio_callback.clone();
            tokio::spawn(async move {
                *cb.lock().await = Some(callback);
            });
        }
        Ok(())
    }

    fn on_error(&mut self, callback: LiveErrorCallback) -> LiveResult<()> {
        if let Ok(mut guard) = self.error_callback.try_lock() {
            *guard = Some(callback);
        } else {
            let cb = self.error_callback.clone();
            tokio::spawn(async move {
                *cb.lock().await = Some(callback);
            });
        }
        Ok(())
    }

    fn on_turn_event(&mut self, callback: TurnEventCallback) -> LiveResult<()> {
        if let Ok(mut guard) = self.turn_event_callback.try_lock() {
            *guard = Some(callback);
        } else {
            let cb = self.turn_event_callback.clone();
            tokio::spawn(async move {
                *cb.lock().await = Some(callback);
            });
        }
        Ok(())
    }

    fn on_reconnection(&mut self, callback: ReconnectionCallback) -> LiveResult<()> {
        if let Ok(mut guard) = self.reconnection_callback.try_lock() {
            *guard = Some(callback);
        } else {
            let cb = self.reconnection_callback.clone();
            tokio::spawn(async move {
                *cb.lock().await = Some(callback);
            });
        }
        Ok(())
    }

    fn get_provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": "gemini",
            "api_type": "WebSocket BidiGenerateContent",
            "endpoint": GEMINI_LIVE_URL,
            "supported_models": [
                "gemini-2.5-flash-native-audio-preview-09-2025",
                "gemini-2.5-flash-preview-native-audio-dialog",
                "gemini-2.0-flash-live-001"
            ],
            "supported_voices": GeminiVoice::all()
                .iter()
                .map(|v| v.as_str())
                .collect::<Vec<_>>(),
            "input_sample_rate": GEMINI_INPUT_SAMPLE_RATE,
            "output_sample_rate": GEMINI_OUTPUT_SAMPLE_RATE,
            "features": {
                "bidirectional_audio": true,
                "vad": true,
                "barge_in": true,
                "transcription": true
            },
            "documentation": "https://ai.google.dev/api/live"
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
