//! WebSocket bridge between a host page and one embedded slide view.
//!
//! Text frames carry `{action, params}` commands; the handler's response is
//! written back, and events are forwarded as they are emitted.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use deck_core::Presentation;
use deck_protocol::ProtocolHandler;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::{
    dec_view_connections, inc_view_connections, record_event, record_frame_rejected,
};
use crate::AppState;

/// Upper bound on the `slides` query parameter.
pub const MAX_SLIDES: usize = 1000;

const DEFAULT_PRESENTATION: &str = "default";

/// Query parameters of a view connection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewParams {
    /// Presentation id.
    pub presentation: Option<String>,
    /// Number of slides.
    pub slides: Option<usize>,
    /// Theme id.
    pub theme: Option<String>,
}

/// Upgrade `/ws` into a view.
#[tracing::instrument(name = "view_connect", skip(ws, state))]
pub async fn view_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ViewParams>,
    State(state): State<AppState>,
) -> Response {
    let slides = params.slides.unwrap_or(1);
    if slides == 0 || slides > MAX_SLIDES {
        return (
            StatusCode::BAD_REQUEST,
            format!("slides must be between 1 and {MAX_SLIDES}"),
        )
            .into_response();
    }
    let presentation = Presentation::new(
        params
            .presentation
            .unwrap_or_else(|| DEFAULT_PRESENTATION.to_string()),
        params
            .theme
            .unwrap_or_else(|| state.default_theme.clone()),
        slides,
    );
    ws.on_upgrade(move |socket| run_view(socket, state, presentation))
}

/// Drive one view until the socket closes, then flush.
pub async fn run_view(socket: WebSocket, state: AppState, presentation: Presentation) {
    let view_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let presentation_id = presentation.id.clone();

    let (mut handler, mut events) = ProtocolHandler::open(
        presentation,
        state.resolver.clone(),
        Arc::clone(&state.store),
        state.autosave,
    )
    .await;
    inc_view_connections();
    tracing::info!(view = %view_id, presentation = %presentation_id, "view opened");

    loop {
        tokio::select! {
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let response = handler.handle_json(text.as_str()).await;
                        if send_json(&mut sender, &response).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        record_frame_rejected("binary");
                        let response = deck_protocol::Response::failure(
                            "unknown",
                            "Binary frames are not supported",
                        );
                        if send_json(&mut sender, &response).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(view = %view_id, "view disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(view = %view_id, error = %e, "websocket error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }

            event = events.recv() => {
                let Some(event) = event else { break };
                record_event(event.kind());
                if send_json(&mut sender, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    handler.close().await;
    dec_view_connections();
    tracing::info!(view = %view_id, presentation = %presentation_id, "view closed");
}

async fn send_json<T: Serialize>(
    sender: &mut SplitSink<WebSocket, Message>,
    value: &T,
) -> Result<(), axum::Error> {
    match serde_json::to_string(value) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize outbound message");
            Ok(())
        }
    }
}
