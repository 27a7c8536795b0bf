//! Slack socket runtime that feeds channel messages into the command registry.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use triage_commands::CommandRegistry;
use triage_contract::{EventKind, IncomingMessage, Messenger, RichMessage};
use triage_core::current_unix_timestamp_ms;

mod slack_api_client;

use slack_api_client::SlackApiClient;

/// Runtime configuration for the Slack socket transport loop.
#[derive(Debug, Clone)]
pub struct SlackSocketRuntimeConfig {
    pub api_base: String,
    pub app_token: String,
    pub bot_token: String,
    pub bot_user_id: Option<String>,
    pub request_timeout_ms: u64,
    pub max_event_age_seconds: u64,
    pub reconnect_delay: Duration,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackSocketEnvelope {
    #[serde(default)]
    envelope_id: String,
    #[serde(rename = "type")]
    envelope_type: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct SlackEventCallbackEnvelope {
    #[serde(rename = "type")]
    callback_type: String,
    event_time: u64,
    event: SlackEventPayload,
}

#[derive(Debug, Deserialize)]
struct SlackEventPayload {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
}

#[derive(Debug, Clone)]
struct SlackInboundMessage {
    occurred_unix_ms: u64,
    payload: IncomingMessage,
}

enum SocketSessionEnd {
    Shutdown,
    Disconnected,
}

/// Runs the Slack socket transport until shutdown is requested.
pub async fn run_slack_socket(
    config: SlackSocketRuntimeConfig,
    registry: CommandRegistry,
) -> Result<()> {
    let runtime = SlackSocketRuntime::new(config, registry).await?;
    runtime.run().await
}

struct SlackSocketRuntime {
    config: SlackSocketRuntimeConfig,
    slack_client: SlackApiClient,
    registry: CommandRegistry,
    bot_user_id: String,
}

impl SlackSocketRuntime {
    async fn new(config: SlackSocketRuntimeConfig, registry: CommandRegistry) -> Result<Self> {
        let slack_client = SlackApiClient::new(
            config.api_base.clone(),
            config.app_token.clone(),
            config.bot_token.clone(),
            config.request_timeout_ms,
        )?;

        let bot_user_id = match config.bot_user_id.clone() {
            Some(user_id) if !user_id.trim().is_empty() => user_id.trim().to_string(),
            _ => slack_client.resolve_bot_user_id().await?,
        };

        Ok(Self {
            config,
            slack_client,
            registry,
            bot_user_id,
        })
    }

    async fn run(&self) -> Result<()> {
        loop {
            let socket_url = match self.slack_client.open_socket_connection().await {
                Ok(url) => url,
                Err(error) => {
                    tracing::warn!(error = %error, "failed to open slack socket connection");
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            tracing::info!("slack socket shutdown requested");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                    }
                    continue;
                }
            };

            match self.run_socket_session(&socket_url).await {
                Ok(SocketSessionEnd::Shutdown) => {
                    tracing::info!("slack socket shutdown requested");
                    return Ok(());
                }
                Ok(SocketSessionEnd::Disconnected) => {
                    tracing::info!("slack socket disconnected, reconnecting");
                }
                Err(error) => {
                    tracing::warn!(error = %error, "slack socket session error");
                }
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("slack socket shutdown requested");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
    }

    async fn run_socket_session(&self, socket_url: &str) -> Result<SocketSessionEnd> {
        let (stream, _response) = connect_async(socket_url)
            .await
            .context("failed to connect slack socket mode websocket")?;
        let (mut sink, mut source) = stream.split();
        tracing::info!("slack socket connected");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    return Ok(SocketSessionEnd::Shutdown);
                }
                maybe_message = source.next() => {
                    let Some(message_result) = maybe_message else {
                        return Ok(SocketSessionEnd::Disconnected);
                    };
                    let message = message_result.context("failed reading slack websocket message")?;
                    let Some(envelope) = parse_socket_envelope(message)? else {
                        continue;
                    };
                    if envelope.envelope_type == "disconnect" {
                        return Ok(SocketSessionEnd::Disconnected);
                    }
                    if !envelope.envelope_id.is_empty() {
                        self.ack_envelope(&mut sink, &envelope.envelope_id).await?;
                    }
                    self.handle_envelope(&envelope).await?;
                }
            }
        }
    }

    async fn ack_envelope<S>(&self, sink: &mut S, envelope_id: &str) -> Result<()>
    where
        S: futures_util::Sink<WsMessage> + Unpin,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let ack = serde_json::json!({ "envelope_id": envelope_id }).to_string();
        sink.send(WsMessage::Text(ack.into()))
            .await
            .context("failed to send slack socket ack")
    }

    async fn handle_envelope(&self, envelope: &SlackSocketEnvelope) -> Result<()> {
        let Some(inbound) = normalize_socket_envelope(envelope, &self.bot_user_id)? else {
            return Ok(());
        };

        let now_unix_ms = current_unix_timestamp_ms();
        if event_is_stale(
            inbound.occurred_unix_ms,
            self.config.max_event_age_seconds,
            now_unix_ms,
        ) {
            tracing::debug!(
                channel = %inbound.payload.channel_id,
                "skipping stale slack event"
            );
            return Ok(());
        }

        self.registry
            .dispatch(EventKind::Message, &inbound.payload)
            .await;
        Ok(())
    }
}

/// Posts command replies back to Slack, threaded under the triggering message.
pub struct SlackMessenger {
    slack_client: SlackApiClient,
}

impl SlackMessenger {
    pub fn new(config: &SlackSocketRuntimeConfig) -> Result<Self> {
        Ok(Self {
            slack_client: SlackApiClient::new(
                config.api_base.clone(),
                config.app_token.clone(),
                config.bot_token.clone(),
                config.request_timeout_ms,
            )?,
        })
    }
}

#[async_trait]
impl Messenger for SlackMessenger {
    async fn send_message(&self, text: &str, payload: &IncomingMessage) -> Result<()> {
        self.slack_client
            .post_message(&payload.channel_id, text, payload.thread_id.as_deref())
            .await
    }

    async fn send_rich_message(
        &self,
        message: &RichMessage,
        payload: &IncomingMessage,
    ) -> Result<()> {
        self.slack_client
            .post_rich_message(&payload.channel_id, message, payload.thread_id.as_deref())
            .await
    }
}

fn parse_socket_envelope(message: WsMessage) -> Result<Option<SlackSocketEnvelope>> {
    match message {
        WsMessage::Text(text) => {
            let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Binary(bytes) => {
            let text =
                String::from_utf8(bytes.to_vec()).context("invalid utf-8 slack socket payload")?;
            let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Ping(_) | WsMessage::Pong(_) => Ok(None),
        WsMessage::Close(_) => Ok(None),
        WsMessage::Frame(_) => Ok(None),
    }
}

fn normalize_socket_envelope(
    envelope: &SlackSocketEnvelope,
    bot_user_id: &str,
) -> Result<Option<SlackInboundMessage>> {
    if envelope.envelope_type != "events_api" {
        return Ok(None);
    }

    let callback = serde_json::from_value::<SlackEventCallbackEnvelope>(envelope.payload.clone())
        .context("failed to decode slack event callback payload")?;
    if callback.callback_type != "event_callback" {
        return Ok(None);
    }

    let event = callback.event;
    if event.event_type != "message" {
        return Ok(None);
    }
    let user_id = match event.user {
        Some(user) if !user.trim().is_empty() => user,
        _ => return Ok(None),
    };
    if user_id == bot_user_id {
        return Ok(None);
    }
    let channel_id = match event.channel {
        Some(channel) if !channel.trim().is_empty() => channel,
        _ => return Ok(None),
    };
    let message_ts = match event.ts {
        Some(ts) if !ts.trim().is_empty() => ts,
        _ => return Ok(None),
    };

    // Replies thread under the parent when the message is already in a
    // thread, otherwise under the message itself. The subtype is carried
    // through untouched so commands can refuse edited/system messages.
    let thread_id = event.thread_ts.unwrap_or_else(|| message_ts.clone());

    Ok(Some(SlackInboundMessage {
        occurred_unix_ms: callback.event_time.saturating_mul(1000),
        payload: IncomingMessage {
            text: event.text.unwrap_or_default(),
            user_id,
            channel_id,
            thread_id: Some(thread_id),
            subtype: event.subtype,
        },
    }))
}

fn event_is_stale(occurred_unix_ms: u64, max_event_age_seconds: u64, now_unix_ms: u64) -> bool {
    if max_event_age_seconds == 0 {
        return false;
    }
    let max_age_ms = max_event_age_seconds.saturating_mul(1000);
    now_unix_ms.saturating_sub(occurred_unix_ms) > max_age_ms
}
