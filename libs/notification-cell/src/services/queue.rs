use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::EmailJob;

const PENDING_QUEUE: &str = "email_queue:pending";
const DEQUEUE_TIMEOUT_SECONDS: f64 = 1.0;

/// Redis-backed email job queue. Producers push serialized jobs; the worker
/// drains them with a blocking pop.
pub struct EmailQueueService {
    pool: Pool,
}

impl EmailQueueService {
    pub async fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        let redis_url = config
            .redis_url
            .clone()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| NotificationError::Pool(format!("Pool creation error: {}", e)))?;

        // Test connection
        let mut conn = pool
            .get()
            .await
            .map_err(|e| NotificationError::Pool(format!("Connection error: {}", e)))?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        info!("Email queue service initialized successfully");
        Ok(Self { pool })
    }

    pub async fn enqueue(&self, job: &EmailJob) -> Result<(), NotificationError> {
        let mut conn = self.get_connection().await?;

        let job_data = serde_json::to_string(job)?;
        let _: () = conn.lpush(PENDING_QUEUE, job_data).await?;

        debug!("Email job {} enqueued for {}", job.job_id, job.to);
        Ok(())
    }

    /// Pop the next pending job, waiting up to the dequeue timeout.
    pub async fn dequeue(&self) -> Result<Option<EmailJob>, NotificationError> {
        let mut conn = self.get_connection().await?;

        let entry: Option<(String, String)> =
            conn.brpop(PENDING_QUEUE, DEQUEUE_TIMEOUT_SECONDS).await?;

        match entry {
            Some((_, job_data)) => {
                let job: EmailJob = serde_json::from_str(&job_data)?;
                debug!("Email job {} dequeued", job.job_id);
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn get_connection(&self) -> Result<Connection, NotificationError> {
        self.pool
            .get()
            .await
            .map_err(|e| NotificationError::Pool(e.to_string()))
    }
}
