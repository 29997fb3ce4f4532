//! Native Redis protocol backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::TaskStore;
use crate::error::QueueResult;

pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self { client })
    }

    async fn conn(&self) -> QueueResult<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl TaskStore for RedisStore {
    async fn rpop(&self, list: &str) -> QueueResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.rpop(list, None).await?;
        Ok(value)
    }

    async fn lpush(&self, list: &str, value: &str) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let _: i64 = conn.lpush(list, value).await?;
        Ok(())
    }

    async fn llen(&self, list: &str) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        let len: u64 = conn.llen(list).await?;
        Ok(len)
    }

    async fn hgetall(&self, key: &str) -> QueueResult<HashMap<String, String>> {
        let mut conn = self.conn().await?;
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.hset_multiple(key, fields).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let _: bool = conn.expire(key, ttl.as_secs() as i64).await?;
        Ok(())
    }

    async fn ping(&self) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
