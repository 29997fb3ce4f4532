//! Upstash-style REST backend.
//!
//! Every command is a `POST` of a JSON array of arguments to the endpoint,
//! authenticated with a bearer token. Replies are `{"result": ...}` on
//! success and `{"error": "..."}` otherwise.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::TaskStore;
use crate::error::{QueueError, QueueResult};

#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

pub struct RestStore {
    http: Client,
    url: String,
    token: String,
}

impl RestStore {
    pub fn new(url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> QueueResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
            token: token.into(),
        })
    }

    /// Send one command and return its `result`.
    async fn command(&self, args: &[&str]) -> QueueResult<Value> {
        debug!(command = args.first().copied().unwrap_or_default(), "store command");

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let reply: RestReply = serde_json::from_str(&body).map_err(|_| {
            QueueError::unexpected_reply(format!("{} {}", status, truncate(&body, 200)))
        })?;

        if let Some(error) = reply.error {
            return Err(QueueError::Store(error));
        }
        if !status.is_success() {
            return Err(QueueError::Store(format!("store returned {}", status)));
        }

        Ok(reply.result)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn expect_integer(command: &str, value: Value) -> QueueResult<u64> {
    value
        .as_u64()
        .ok_or_else(|| QueueError::unexpected_reply(format!("{} returned {}", command, value)))
}

/// HGETALL replies with a flat `[field, value, field, value, ...]` array.
fn decode_hash(value: Value) -> QueueResult<HashMap<String, String>> {
    let items = match value {
        Value::Null => return Ok(HashMap::new()),
        Value::Array(items) => items,
        other => {
            return Err(QueueError::unexpected_reply(format!("HGETALL returned {}", other)));
        }
    };

    if items.len() % 2 != 0 {
        return Err(QueueError::unexpected_reply("HGETALL returned an odd number of items"));
    }

    let mut fields = HashMap::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        match (field, value) {
            (Value::String(field), Value::String(value)) => {
                fields.insert(field, value);
            }
            (field, value) => {
                return Err(QueueError::unexpected_reply(format!(
                    "HGETALL returned non-string pair {} {}",
                    field, value
                )));
            }
        }
    }
    Ok(fields)
}

#[async_trait]
impl TaskStore for RestStore {
    async fn rpop(&self, list: &str) -> QueueResult<Option<String>> {
        match self.command(&["RPOP", list]).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(QueueError::unexpected_reply(format!("RPOP returned {}", other))),
        }
    }

    async fn lpush(&self, list: &str, value: &str) -> QueueResult<()> {
        let reply = self.command(&["LPUSH", list, value]).await?;
        expect_integer("LPUSH", reply)?;
        Ok(())
    }

    async fn llen(&self, list: &str) -> QueueResult<u64> {
        let reply = self.command(&["LLEN", list]).await?;
        expect_integer("LLEN", reply)
    }

    async fn hgetall(&self, key: &str) -> QueueResult<HashMap<String, String>> {
        decode_hash(self.command(&["HGETALL", key]).await?)
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> QueueResult<()> {
        let mut args: Vec<&str> = Vec::with_capacity(2 + fields.len() * 2);
        args.push("HSET");
        args.push(key);
        for (field, value) in fields {
            args.push(field);
            args.push(value);
        }
        let reply = self.command(&args).await?;
        expect_integer("HSET", reply)?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> QueueResult<()> {
        let secs = ttl.as_secs().to_string();
        let reply = self.command(&["EXPIRE", key, &secs]).await?;
        expect_integer("EXPIRE", reply)?;
        Ok(())
    }

    async fn ping(&self) -> QueueResult<()> {
        match self.command(&["PING"]).await? {
            Value::String(s) if s.eq_ignore_ascii_case("pong") => Ok(()),
            other => Err(QueueError::unexpected_reply(format!("PING returned {}", other))),
        }
    }

    fn backend(&self) -> &'static str {
        "rest"
    }
}
