use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

use crate::browser::session::SessionManager;
use crate::service::agent_service::AgentService;
use crate::service::speech_service::SpeechClient;

pub struct WsDeps {
    pub agent: Arc<AgentService>,
    /// Absent when no speech credential is configured; the connection then
    /// runs text-only.
    pub speech: Option<Arc<dyn SpeechClient>>,
    pub sessions: Arc<SessionManager>,
}

/// One conversation per connection. Text frames are turns, binary frames are
/// recorded audio; every reply goes out as text, followed by a synthesized
/// audio frame when speech is available. The connection owns its session:
/// when it closes, the profile's browser context is torn down.
pub async fn handle_connection(socket: WebSocket, profile_id: String, deps: Arc<WsDeps>) {
    let connection_id = Uuid::new_v4();
    let (mut tx, mut rx) = socket.split();
    let mut history = deps.agent.new_history();
    tracing::info!(profile_id, %connection_id, "client connected");

    while let Some(result) = rx.next().await {
        let message = match result {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(profile_id, %err, "websocket receive error");
                break;
            }
        };

        let text = if message.is_text() {
            message.to_str().unwrap_or_default().to_string()
        } else if message.is_binary() {
            match &deps.speech {
                Some(speech) => match speech.transcribe(message.as_bytes()).await {
                    Ok(text) => text,
                    Err(err) => {
                        // Upstream speech failure degrades to a chat message,
                        // the turn itself is not lost.
                        tracing::warn!(profile_id, %err, "transcription failed");
                        let _ = tx
                            .send(Message::text(
                                "I could not transcribe that audio. Please try again or type your request.",
                            ))
                            .await;
                        continue;
                    }
                },
                None => {
                    let _ = tx
                        .send(Message::text(
                            "Voice input is not configured on this server. Please type your request.",
                        ))
                        .await;
                    continue;
                }
            }
        } else if message.is_close() {
            break;
        } else {
            continue;
        };

        if text.trim().is_empty() {
            continue;
        }

        let reply = deps.agent.run_turn(&profile_id, &mut history, &text).await;
        if tx.send(Message::text(reply.clone())).await.is_err() {
            break;
        }

        if let Some(speech) = &deps.speech {
            match speech.synthesize(&reply).await {
                Ok(audio) => {
                    if tx.send(Message::binary(audio)).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(profile_id, %err, "speech synthesis failed, text-only reply");
                }
            }
        }
    }

    deps.sessions.shutdown(&profile_id).await;
    tracing::info!(profile_id, %connection_id, "client disconnected, session torn down");
}
