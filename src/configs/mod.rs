use std::time::Duration;

use deadpool_redis::{redis::AsyncCommands, Connection, Runtime};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{api::error, ENV};

const REDIS_POOL_SIZE: usize = 16;

/// Opens the Postgres pool and brings the schema up to date.
pub async fn connect_database() -> Result<PgPool, error::SystemError> {
    let pool = PgPoolOptions::new()
        .max_connections(ENV.database_max_connections)
        .min_connections(1)
        .acquire_slow_threshold(Duration::from_secs(3))
        .connect(&ENV.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Database ready, migrations applied");

    Ok(pool)
}

/// JSON values in Redis: cached profiles and live refresh-token ids.
#[derive(Clone)]
pub struct RedisCache {
    pool: deadpool_redis::Pool,
}

impl RedisCache {
    pub async fn new() -> Result<Self, error::SystemError> {
        let mut cfg = deadpool_redis::Config::from_url(&ENV.redis_url);
        cfg.pool = Some(deadpool_redis::PoolConfig::new(REDIS_POOL_SIZE));
        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;

        // fail at startup instead of on the first request
        let mut conn = pool.get().await?;
        let _: String = deadpool_redis::redis::cmd("PING").query_async(&mut *conn).await?;
        log::info!("Redis ready");

        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<Connection, error::SystemError> {
        Ok(self.pool.get().await?)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, error::SystemError> {
        let raw: Option<Vec<u8>> = self.conn().await?.get(key).await?;
        raw.map(|bytes| serde_json::from_slice(&bytes)).transpose().map_err(Into::into)
    }

    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: usize,
    ) -> Result<(), error::SystemError> {
        let payload = serde_json::to_vec(value)?;
        self.conn().await?.set_ex::<_, _, ()>(key, payload, ttl_secs as u64).await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), error::SystemError> {
        self.conn().await?.del::<_, ()>(key).await?;
        Ok(())
    }
}
