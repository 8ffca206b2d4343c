use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use crate::report;
use crate::scrape::Scraper;
use crate::telegram::TelegramClient;

/// One accepted webhook message, waiting for a worker.
#[derive(Debug, PartialEq, Eq)]
pub struct ScrapeJob {
    pub chat_id: i64,
    pub website: String,
}

/// Handle held by the webhook handler. Enqueueing never blocks: a full
/// queue drops the job and Telegram redelivers the update later.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<ScrapeJob>,
}

impl JobQueue {
    pub fn enqueue(&self, job: ScrapeJob) {
        if let Err(e) = self.tx.try_send(job) {
            warn!("Job queue full, dropping job: {}", e);
        }
    }
}

/// Spawn `count` workers draining a queue of at most `queue_depth` pending
/// jobs. Each worker fetches the report with retries and posts the reply.
pub fn spawn_pool(
    count: usize,
    queue_depth: usize,
    scraper: Arc<Scraper>,
    telegram: Arc<TelegramClient>,
) -> JobQueue {
    let (tx, rx) = mpsc::channel(queue_depth);
    let rx = Arc::new(Mutex::new(rx));

    for worker_id in 0..count {
        let rx = rx.clone();
        let scraper = scraper.clone();
        let telegram = telegram.clone();
        tokio::spawn(async move {
            loop {
                // Hold the lock only while waiting for the next job.
                let job = rx.lock().await.recv().await;
                let Some(job) = job else { break };
                run_job(worker_id, &scraper, &telegram, job).await;
            }
        });
    }

    JobQueue { tx }
}

async fn run_job(worker_id: usize, scraper: &Scraper, telegram: &TelegramClient, job: ScrapeJob) {
    info!(
        "Worker {} fetching info for website: {}",
        worker_id, job.website
    );
    let outcome = scraper.fetch_with_retry(&job.website).await;
    if let Err(e) = &outcome {
        warn!("Scrape failed for {}: {}", job.website, e);
    }
    let reply = report::render_outcome(&outcome);
    if let Err(e) = telegram.send_message(job.chat_id, &reply).await {
        error!("Could not send message: {:#}", e);
    }
}

#[cfg(test)]
pub fn test_queue(queue_depth: usize) -> (JobQueue, mpsc::Receiver<ScrapeJob>) {
    let (tx, rx) = mpsc::channel(queue_depth);
    (JobQueue { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ScrapeConfig, TelegramConfig};
    use axum::http::StatusCode;
    use axum::Router;
    use std::time::Duration;

    #[tokio::test]
    async fn test_full_queue_drops_jobs() {
        let (queue, mut rx) = test_queue(1);
        queue.enqueue(ScrapeJob {
            chat_id: 1,
            website: "a.com".to_string(),
        });
        queue.enqueue(ScrapeJob {
            chat_id: 2,
            website: "b.com".to_string(),
        });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.chat_id, 1);
        assert!(rx.try_recv().is_err());
    }

    // End-to-end through the pool: a local analytics page on one server,
    // a capture endpoint standing in for Telegram on another.
    #[tokio::test]
    async fn test_pool_scrapes_and_replies() {
        let page = r#"
            <p class="engagement-list__item-value">5.5M</p>
            <div class="wa-competitors-card">
              <a class="wa-competitors-card__website-title">rival.com</a>
              <p class="wa-competitors-card__website-description">Rival.</p>
              <p class="engagement-list__item-value">1M</p>
            </div>
        "#;
        let analytics = Router::new().fallback(move || async move { (StatusCode::OK, page) });
        let analytics_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let analytics_base = format!("http://{}", analytics_listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(analytics_listener, analytics).await.unwrap();
        });

        let (sent_tx, mut sent_rx) = mpsc::channel::<String>(1);
        let telegram_app = Router::new().fallback(move |body: String| {
            let sent_tx = sent_tx.clone();
            async move {
                sent_tx.send(body).await.unwrap();
                r#"{"ok":true}"#
            }
        });
        let telegram_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let telegram_base = format!("http://{}", telegram_listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(telegram_listener, telegram_app).await.unwrap();
        });

        let scraper = Arc::new(Scraper::new(ScrapeConfig {
            base_url: analytics_base,
            ..ScrapeConfig::default()
        }));
        let telegram = Arc::new(TelegramClient::new(TelegramConfig {
            bot_token: "t".to_string(),
            api_base_url: telegram_base,
        }));

        let queue = spawn_pool(2, 8, scraper, telegram);
        queue.enqueue(ScrapeJob {
            chat_id: 77,
            website: "example.com".to_string(),
        });

        let body = tokio::time::timeout(Duration::from_secs(5), sent_rx.recv())
            .await
            .expect("worker did not reply in time")
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["chat_id"], 77);
        let text = json["text"].as_str().unwrap();
        assert!(text.contains("Number of Visitors: 5.5M"));
        assert!(text.contains("Title: rival.com"));
    }
}
