//! Redis dispatch channel (LPUSH/BRPOP per logical queue).
//!
//! Envelopes are JSON snapshots of the job pushed to `queue:<name>`; workers
//! block on `BRPOP` for wake-up. Delivery is at-least-once and the metadata
//! store stays authoritative, so losing or duplicating an envelope is safe.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::debug;

use conveyor_core::JobId;
use conveyor_queue::{ChannelError, DispatchChannel, Job};

#[derive(Clone)]
pub struct RedisDispatchChannel {
    client: redis::Client,
    conn: ConnectionManager,
}

impl RedisDispatchChannel {
    /// Connect to the broker and verify it answers.
    pub async fn connect(url: &str) -> Result<Self, ChannelError> {
        let client = redis::Client::open(url)
            .map_err(|e| ChannelError::Unavailable(format!("invalid redis url: {e}")))?;
        let mut conn = client
            .get_connection_manager()
            .await
            .map_err(|e| ChannelError::Unavailable(e.to_string()))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| ChannelError::Unavailable(e.to_string()))?;

        Ok(Self { client, conn })
    }

    fn queue_key(queue: &str) -> String {
        format!("queue:{queue}")
    }
}

#[async_trait]
impl DispatchChannel for RedisDispatchChannel {
    async fn enqueue(&self, job: &Job) -> Result<(), ChannelError> {
        let data = job
            .to_envelope()
            .map_err(|e| ChannelError::Serialization(e.to_string()))?;

        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("LPUSH")
            .arg(Self::queue_key(&job.queue))
            .arg(data)
            .query_async(&mut conn)
            .await
            .map_err(|e| command_error("LPUSH", e))?;

        debug!(job_id = %job.id, queue = %job.queue, "envelope enqueued");
        Ok(())
    }

    async fn dequeue(&self, queue: &str) -> Result<Job, ChannelError> {
        // BRPOP parks the connection until a message arrives, so it gets a
        // dedicated one instead of the shared multiplexed manager.
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ChannelError::Unavailable(e.to_string()))?;

        let (_key, data): (String, Vec<u8>) = redis::cmd("BRPOP")
            .arg(Self::queue_key(queue))
            .arg(0)
            .query_async(&mut conn)
            .await
            .map_err(|e| command_error("BRPOP", e))?;

        Job::from_envelope(&data).map_err(|e| ChannelError::Serialization(e.to_string()))
    }

    async fn acknowledge(&self, id: JobId) -> Result<(), ChannelError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(format!("processing:{id}"))
            .query_async(&mut conn)
            .await
            .map_err(|e| command_error("DEL", e))?;

        Ok(())
    }
}

fn command_error(command: &str, err: redis::RedisError) -> ChannelError {
    if err.is_io_error() || err.is_timeout() || err.is_connection_refusal() {
        ChannelError::Unavailable(format!("{command}: {err}"))
    } else {
        ChannelError::Command(format!("{command} failed: {err}"))
    }
}
