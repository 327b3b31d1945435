//! Database source — polls a claiming query for message payloads.
//!
//! The configured query must claim the rows it returns (for example
//! `DELETE FROM inbox ... RETURNING payload`), with the payload as the
//! first column (bytea). Rows that fail the handler are lost only if
//! the query already removed them; claim semantics are the operator's
//! choice.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tokio::sync::watch;
use tracing::warn;

use streamgrid_types::DbConfig;

use crate::error::{DriverError, DriverResult};
use crate::sink::db::make_pool;
use crate::{DriverContext, MessageHandler, SourceDriver};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct DbSource {
    pool: PgPool,
    query: String,
    poll_interval: Duration,
}

impl DbSource {
    pub async fn connect(ctx: &DriverContext, cfg: &DbConfig) -> DriverResult<Self> {
        let query = cfg
            .query
            .clone()
            .ok_or_else(|| DriverError::Config("db source requires a query".to_string()))?;
        Ok(Self {
            pool: make_pool(ctx, cfg).await?,
            query,
            poll_interval: cfg
                .poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
        })
    }
}

#[async_trait]
impl SourceDriver for DbSource {
    async fn run(
        &self,
        handler: MessageHandler,
        mut shutdown: watch::Receiver<bool>,
    ) -> DriverResult<()> {
        loop {
            let rows = sqlx::query(&self.query)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DriverError::Recv(e.to_string()))?;
            for row in rows {
                let payload: Vec<u8> = row
                    .try_get(0)
                    .map_err(|e| DriverError::Recv(e.to_string()))?;
                if let Err(e) = handler(payload).await {
                    warn!(error = %e, "handler failed");
                }
            }
            tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn release(&self) -> DriverResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
