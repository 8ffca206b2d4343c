use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use tracing::{info, warn};

use crate::telegram::Update;
use crate::worker::{JobQueue, ScrapeJob};

#[derive(Clone)]
pub struct AppState {
    pub jobs: JobQueue,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health).post(webhook))
        .with_state(state)
}

/// Bind and serve until the process is killed. Failing to bind is the one
/// fatal error in the system.
pub async fn run(state: AppState, port: u16) -> Result<()> {
    let app = router(state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Server is listening on port {}", port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn health() -> &'static str {
    "Server is running"
}

/// Webhook endpoint. Malformed envelopes and textless messages are logged
/// and discarded; Telegram expects a 200 either way, so the handler never
/// answers with an error status.
async fn webhook(State(state): State<AppState>, body: String) {
    info!("Received a webhook request");

    let update: Update = match serde_json::from_str(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Could not decode update: {}", e);
            return;
        }
    };

    let Some(message) = update.message else {
        warn!("Update carries no message");
        return;
    };

    info!("Received message: {}", message.text);
    if message.text.is_empty() {
        warn!("No text found in the message");
        return;
    }

    state.jobs.enqueue(ScrapeJob {
        chat_id: message.chat.id,
        website: message.text,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::test_queue;
    use std::time::Duration;

    async fn spawn_app(queue: JobQueue) -> String {
        let app = router(AppState { jobs: queue });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (queue, _rx) = test_queue(4);
        let base = spawn_app(queue).await;

        let response = reqwest::get(&base).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "Server is running");
    }

    #[tokio::test]
    async fn test_webhook_enqueues_text_message() {
        let (queue, mut rx) = test_queue(4);
        let base = spawn_app(queue).await;

        let update = r#"{
            "update_id": 1,
            "message": {
                "message_id": 2,
                "chat": {"id": 31337, "type": "private"},
                "text": "example.com"
            }
        }"#;
        let response = reqwest::Client::new()
            .post(&base)
            .body(update.to_string())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let job = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.chat_id, 31337);
        assert_eq!(job.website, "example.com");
    }

    #[tokio::test]
    async fn test_webhook_discards_garbage_with_200() {
        let (queue, mut rx) = test_queue(4);
        let base = spawn_app(queue).await;

        let response = reqwest::Client::new()
            .post(&base)
            .body("not json at all")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_webhook_discards_empty_text() {
        let (queue, mut rx) = test_queue(4);
        let base = spawn_app(queue).await;

        let update = r#"{
            "update_id": 1,
            "message": {"message_id": 2, "chat": {"id": 5, "type": "private"}, "text": ""}
        }"#;
        let response = reqwest::Client::new()
            .post(&base)
            .body(update.to_string())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert!(rx.try_recv().is_err());
    }
}
