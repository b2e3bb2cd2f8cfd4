use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::error::NotificationError;
use crate::models::EmailJob;
use crate::services::mailer::Mailer;
use crate::services::queue::EmailQueueService;

const RETRY_DELAY_SECONDS: u64 = 5;
const IDLE_BACKOFF_SECONDS: u64 = 1;

/// Drains the email queue and delivers jobs with bounded retry: a failed
/// delivery is re-enqueued after a fixed delay until the job's attempt
/// budget is spent.
pub struct EmailWorkerService {
    queue: Arc<EmailQueueService>,
    mailer: Arc<Mailer>,
    is_shutdown: RwLock<bool>,
}

impl EmailWorkerService {
    pub fn new(queue: Arc<EmailQueueService>, mailer: Arc<Mailer>) -> Self {
        Self {
            queue,
            mailer,
            is_shutdown: RwLock::new(false),
        }
    }

    pub async fn run(&self) {
        info!("Email worker starting");

        loop {
            if *self.is_shutdown.read().await {
                info!("Email worker shutting down");
                break;
            }

            match self.queue.dequeue().await {
                Ok(Some(job)) => self.process_job(job).await,
                Ok(None) => {}
                Err(e) => {
                    error!("Email worker failed to dequeue: {}", e);
                    sleep(Duration::from_secs(IDLE_BACKOFF_SECONDS)).await;
                }
            }
        }
    }

    pub async fn shutdown(&self) {
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }

    async fn process_job(&self, mut job: EmailJob) {
        job.attempts += 1;
        job.updated_at = Utc::now();

        match self.mailer.send(&job.message()).await {
            Ok(()) => {
                debug!(
                    "Email job {} completed on attempt {}/{}",
                    job.job_id, job.attempts, job.max_attempts
                );
            }
            Err(e) => self.handle_failure(job, e).await,
        }
    }

    async fn handle_failure(&self, job: EmailJob, cause: NotificationError) {
        if !job.can_retry() {
            error!(
                "Email job {} failed permanently after {} attempts: {}",
                job.job_id, job.attempts, cause
            );
            return;
        }

        warn!(
            "Email job {} failed (attempt {}/{}), retrying: {}",
            job.job_id, job.attempts, job.max_attempts, cause
        );

        sleep(Duration::from_secs(RETRY_DELAY_SECONDS)).await;

        if let Err(e) = self.queue.enqueue(&job).await {
            error!("Failed to re-enqueue email job {}: {}", job.job_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_budget_is_bounded() {
        let mut job = EmailJob::new("a@b.test", "subject", "body", 3);
        assert!(job.can_retry());

        job.attempts = 2;
        assert!(job.can_retry());

        job.attempts = 3;
        assert!(!job.can_retry());
    }
}
