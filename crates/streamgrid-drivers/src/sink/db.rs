//! Database sink — executes a parameterized statement per message.
//!
//! The configured statement receives the raw message as `$1` (bytea),
//! e.g. `INSERT INTO results (payload) VALUES ($1)`.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use streamgrid_types::DbConfig;

use crate::error::{DriverError, DriverResult};
use crate::{DriverContext, SinkDriver};

pub(crate) async fn make_pool(ctx: &DriverContext, cfg: &DbConfig) -> DriverResult<PgPool> {
    let url = match (&cfg.url, &cfg.url_secret) {
        (Some(url), _) => url.clone(),
        (None, Some(secret)) => ctx.secrets.resolve(secret)?,
        (None, None) => {
            return Err(DriverError::Config(
                "db driver requires url or url_secret".to_string(),
            ))
        }
    };
    PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .map_err(|e| DriverError::Connect(e.to_string()))
}

pub struct DbSink {
    pool: PgPool,
    statement: String,
}

impl DbSink {
    pub async fn connect(ctx: &DriverContext, cfg: &DbConfig) -> DriverResult<Self> {
        let statement = cfg
            .statement
            .clone()
            .ok_or_else(|| DriverError::Config("db sink requires a statement".to_string()))?;
        Ok(Self {
            pool: make_pool(ctx, cfg).await?,
            statement,
        })
    }
}

#[async_trait]
impl SinkDriver for DbSink {
    async fn send(&self, msg: &[u8]) -> DriverResult<()> {
        sqlx::query(&self.statement)
            .bind(msg.to_vec())
            .execute(&self.pool)
            .await
            .map_err(|e| DriverError::Send(e.to_string()))?;
        Ok(())
    }

    async fn release(&self) -> DriverResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
