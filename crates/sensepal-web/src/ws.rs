/// Search-as-you-type over a WebSocket.
///
/// Each connection owns one `SearchBar`. The client sends the input field's
/// value on every keystroke and the server pushes a `SearchState` snapshot
/// whenever the suggestions, loading flag, or selection change.
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use sensepal_common::model::{Prediction, SearchResult};
use sensepal_common::places::PlacesProvider;
use sensepal_common::search_bar::{SearchBar, SuggestionMode};

use crate::error::AppError;
use crate::state::{AppState, SharedProvider};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Input { text: String },
    Select { prediction: Prediction },
    SelectResult { result: SearchResult },
}

pub async fn search_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let provider = state.places()?.provider.clone();
    let debounce = state.config.debounce;
    Ok(ws.on_upgrade(move |socket| run_session(socket, provider, debounce)))
}

async fn run_session(socket: WebSocket, provider: SharedProvider, debounce: Duration) {
    info!("search session opened");
    let (mut sender, mut receiver) = socket.split();
    let mut bar = SearchBar::new(provider, SuggestionMode::Autocomplete, debounce);
    let mut updates = bar.subscribe();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let message = match incoming {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        debug!(error = %e, "search socket read failed");
                        break;
                    }
                    None => break,
                };
                match message {
                    Message::Text(text) => handle_message(&mut bar, text.as_str()),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                let json = match serde_json::to_string(&snapshot) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "failed to encode search state");
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    }
    info!("search session closed");
}

/// Apply one client message. Lookups run in the background so the session keeps
/// pushing snapshots, including `loading`, while they are in flight.
pub fn handle_message<P: PlacesProvider + ?Sized>(bar: &mut SearchBar<P>, raw: &str) {
    let message: ClientMessage = match serde_json::from_str(raw) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "ignoring malformed search message");
            return;
        }
    };
    match message {
        ClientMessage::Input { text } => bar.input(&text),
        ClientMessage::Select { prediction } => bar.begin_select(&prediction),
        ClientMessage::SelectResult { result } => {
            bar.select_result(result);
        }
    }
}
