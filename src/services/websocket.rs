use std::sync::Arc;

use axum::{
    extract::{Extension, Path, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{error, info};

use crate::dto::draft_dto::{MatchDraft, UpdateDraft};
use crate::store::{DraftStore, FeedEvent};

pub fn draft_update_message(match_id: &str, draft: MatchDraft) -> Option<String> {
    let update_msg = UpdateDraft {
        r#type: "draft_update".to_string(),
        match_id: match_id.to_string(),
        draft,
    };

    match serde_json::to_string(&update_msg) {
        Ok(json) => Some(json),
        Err(e) => {
            error!("Failed to serialize draft update message: {}", e);
            None
        }
    }
}

/* Web Socket stuff */
pub async fn websocket_handler<S: DraftStore>(
    ws: WebSocketUpgrade,
    Path(match_id): Path<String>,
    Extension(store): Extension<Arc<S>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, store, match_id))
}

async fn handle_socket<S: DraftStore>(socket: WebSocket, store: Arc<S>, match_id: String) {
    let (mut sender, mut receiver) = socket.split();
    let mut feed = store.subscribe(&match_id);
    info!(match_id = %match_id, "Client subscribed to draft.");

    // Task to push every committed snapshot of this match to the client
    let send_task = tokio::spawn(async move {
        let mut latest = store.get(&match_id).await.ok().flatten();
        loop {
            if let Some(draft) = latest.take() {
                let Some(msg) = draft_update_message(&match_id, draft) else {
                    continue;
                };
                if sender.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }

            latest = match feed.next().await {
                Some(FeedEvent::Changed(change)) => Some(change.draft),
                Some(FeedEvent::Lagged(_)) => store.get(&match_id).await.ok().flatten(),
                None => break,
            };
        }
    });

    // Clients only listen; anything they send is dropped until they close.
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Close(_) = msg {
            break;
        }
    }

    // Clean up
    send_task.abort();
}
