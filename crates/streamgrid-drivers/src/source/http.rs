//! HTTP source — drains the channel fed by the sidecar's
//! `POST /sources/{name}` endpoint.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::warn;

use crate::error::DriverResult;
use crate::{MessageHandler, SourceDriver};

pub struct HttpSource {
    rx: Mutex<mpsc::Receiver<Vec<u8>>>,
}

impl HttpSource {
    pub fn new(rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { rx: Mutex::new(rx) }
    }
}

#[async_trait]
impl SourceDriver for HttpSource {
    async fn run(
        &self,
        handler: MessageHandler,
        mut shutdown: watch::Receiver<bool>,
    ) -> DriverResult<()> {
        let mut rx = self.rx.lock().await;
        loop {
            tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                next = rx.recv() => {
                    let Some(msg) = next else { return Ok(()) };
                    if let Err(e) = handler(msg).await {
                        warn!(error = %e, "handler failed, message dropped");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn pumps_messages_until_shutdown() {
        let (tx, rx) = mpsc::channel(8);
        let source = HttpSource::new(rx);
        let seen = Arc::new(AtomicUsize::new(0));

        let handler: MessageHandler = {
            let seen = seen.clone();
            Arc::new(move |_msg| {
                let seen = seen.clone();
                Box::pin(async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tx.send(b"one".to_vec()).await.unwrap();
        tx.send(b"two".to_vec()).await.unwrap();

        let run = tokio::spawn(async move { source.run(handler, shutdown_rx).await });
        while seen.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        shutdown_tx.send(true).unwrap();
        run.await.unwrap().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
