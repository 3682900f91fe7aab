use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::mpsc::Receiver;

use crate::measurement::Measurement;

/// Durable metrics sink. Forwarding is best-effort: the writer task logs
/// failures and keeps draining, it never pushes back on the tracker.
pub trait PersistenceSink: Send {
    fn write(
        &self,
        m: &Measurement,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Posts each forwarded measurement as JSON to a metrics endpoint.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
}

impl HttpSink {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        HttpSink {
            client,
            url: url.into(),
        }
    }
}

impl PersistenceSink for HttpSink {
    async fn write(&self, m: &Measurement) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(m)
            .send()
            .await
            .context("metrics endpoint unreachable")?;
        response
            .error_for_status()
            .context("metrics endpoint rejected write")?;
        Ok(())
    }
}

/// Sink for runs without a metrics endpoint configured.
pub struct LogSink;

impl PersistenceSink for LogSink {
    async fn write(&self, m: &Measurement) -> Result<()> {
        log::debug!(
            "would persist height={:.1} at {}",
            m.height,
            m.timestamp.to_rfc3339()
        );
        Ok(())
    }
}

/// Writer task: drains the forward channel for the process lifetime.
pub async fn sink_loop<S: PersistenceSink>(mut rx: Receiver<Measurement>, sink: S) {
    let mut written = 0u64;
    let mut failed = 0u64;

    while let Some(m) = rx.recv().await {
        match sink.write(&m).await {
            Ok(_) => {
                written += 1;
                if written % 100 == 0 {
                    log::debug!("persisted {} measurements ({} failed)", written, failed);
                }
            }
            Err(e) => {
                failed += 1;
                log::warn!("dropping measurement, persist failed: {e:#}");
            }
        }
    }
    log::info!(
        "persistence channel closed, {} written, {} failed",
        written,
        failed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct CountingSink {
        writes: Arc<AtomicU64>,
        fail: bool,
    }

    impl PersistenceSink for CountingSink {
        async fn write(&self, _m: &Measurement) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("sink down");
            }
            Ok(())
        }
    }

    fn sample(secs: i64) -> Measurement {
        Measurement::new(100.0, None, Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[tokio::test]
    async fn test_sink_loop_drains_channel() {
        let writes = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::channel(8);
        let sink = CountingSink {
            writes: writes.clone(),
            fail: false,
        };

        for i in 0..3 {
            tx.send(sample(i)).await.unwrap();
        }
        drop(tx);
        sink_loop(rx, sink).await;

        assert_eq!(writes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_sink_loop_survives_failures() {
        let writes = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::channel(8);
        let sink = CountingSink {
            writes: writes.clone(),
            fail: true,
        };

        for i in 0..5 {
            tx.send(sample(i)).await.unwrap();
        }
        drop(tx);
        // Every write fails; the loop must still consume all of them.
        sink_loop(rx, sink).await;

        assert_eq!(writes.load(Ordering::SeqCst), 5);
    }
}
