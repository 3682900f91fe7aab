use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc::Receiver;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration};

/// Latest rendered status payload, shared between the feed task and every
/// websocket client.
pub type FeedState = Arc<RwLock<Option<String>>>;

pub fn feed_state() -> FeedState {
    Arc::new(RwLock::new(None))
}

/// Feed task: keeps only the most recent published payload. Clients that
/// connect late see the current state immediately instead of a backlog.
pub async fn feed_loop(mut rx: Receiver<String>, state: FeedState) {
    while let Some(payload) = rx.recv().await {
        *state.write().await = Some(payload);
    }
    log::info!("feed channel closed");
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><title>liftwatch</title></head>
<body>
<h1>liftwatch</h1>
<pre id="status">connecting...</pre>
<script>
const ws = new WebSocket(`ws://${location.host}/ws`);
ws.onmessage = (ev) => {
  document.getElementById("status").textContent =
    JSON.stringify(JSON.parse(ev.data), null, 2);
};
ws.onclose = () => {
  document.getElementById("status").textContent = "disconnected";
};
</script>
</body>
</html>
"#;

/// Embedded status server: `/` renders the page, `/ws` streams snapshots.
pub async fn serve_dashboard(state: FeedState, port: u16) -> Result<()> {
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    log::info!("dashboard listening on http://{}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("could not bind dashboard to {}", addr))?;
    axum::serve(listener, app)
        .await
        .context("dashboard server stopped")?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<FeedState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: FeedState) {
    let (mut sender, mut receiver) = socket.split();

    // Drain (and ignore) anything the client sends so pings get answered.
    tokio::spawn(async move { while receiver.next().await.is_some() {} });

    loop {
        let payload = state.read().await.clone();
        if let Some(payload) = payload {
            if sender.send(Message::Text(payload)).await.is_err() {
                // Client disconnected
                break;
            }
        }
        sleep(Duration::from_millis(500)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_feed_keeps_latest_payload() {
        let state = feed_state();
        let (tx, rx) = mpsc::channel(8);

        tx.send("first".to_string()).await.unwrap();
        tx.send("second".to_string()).await.unwrap();
        drop(tx);
        feed_loop(rx, state.clone()).await;

        assert_eq!(state.read().await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_feed_state_starts_empty() {
        let state = feed_state();
        assert!(state.read().await.is_none());
    }
}
