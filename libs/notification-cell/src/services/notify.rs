use std::sync::Arc;

use tracing::{debug, error};

use crate::models::{AppointmentEvent, AppointmentNotice, EmailJob, EmailMessage};
use crate::services::mailer::Mailer;
use crate::services::queue::EmailQueueService;
use crate::services::registry::SocketRegistry;

const EMAIL_MAX_ATTEMPTS: u32 = 3;

/// Best-effort fan-out for appointment events: queued email to the affected
/// parties plus a push to their socket channels. Nothing here ever
/// propagates an error to the caller; the appointment write has already
/// committed by the time this runs.
pub struct NotificationService {
    registry: Arc<SocketRegistry>,
    queue: Option<Arc<EmailQueueService>>,
    mailer: Arc<Mailer>,
}

impl NotificationService {
    pub fn new(
        registry: Arc<SocketRegistry>,
        queue: Option<Arc<EmailQueueService>>,
        mailer: Arc<Mailer>,
    ) -> Self {
        Self {
            registry,
            queue,
            mailer,
        }
    }

    pub fn registry(&self) -> Arc<SocketRegistry> {
        Arc::clone(&self.registry)
    }

    pub async fn appointment_created(&self, notice: &AppointmentNotice) {
        self.send_emails(AppointmentEvent::Created, notice).await;
        self.push_sockets(AppointmentEvent::Created, notice).await;
    }

    pub async fn appointment_updated(&self, notice: &AppointmentNotice) {
        self.send_emails(AppointmentEvent::Updated, notice).await;
        self.push_sockets(AppointmentEvent::Updated, notice).await;
    }

    async fn send_emails(&self, event: AppointmentEvent, notice: &AppointmentNotice) {
        let date = notice.date.format("%Y-%m-%d");

        match event {
            AppointmentEvent::Created => {
                if let Some(doctor_email) = &notice.doctor_email {
                    self.deliver(EmailMessage {
                        to: doctor_email.clone(),
                        subject: format!("New appointment request from {}", notice.patient_name),
                        body: format!(
                            "You have a new appointment request on {} at {}. Please review and update the status.",
                            date, notice.time
                        ),
                    })
                    .await;
                }
                if let Some(patient_email) = &notice.patient_email {
                    self.deliver(EmailMessage {
                        to: patient_email.clone(),
                        subject: "Appointment request received".to_string(),
                        body: format!(
                            "Your appointment request with Dr. {} has been received and is pending approval.",
                            notice.doctor_name
                        ),
                    })
                    .await;
                }
            }
            AppointmentEvent::Updated => {
                if let Some(patient_email) = &notice.patient_email {
                    self.deliver(EmailMessage {
                        to: patient_email.clone(),
                        subject: format!("Your appointment status is now: {}", notice.status),
                        body: format!(
                            "Appointment with Dr. {} on {} at {} is now {}.",
                            notice.doctor_name, date, notice.time, notice.status
                        ),
                    })
                    .await;
                }
            }
        }
    }

    /// Queue the email; if enqueueing fails (or no queue is configured),
    /// fall back to an immediate inline send. Failures are logged only.
    async fn deliver(&self, message: EmailMessage) {
        if let Some(queue) = &self.queue {
            let job = EmailJob::new(&message.to, &message.subject, &message.body, EMAIL_MAX_ATTEMPTS);
            match queue.enqueue(&job).await {
                Ok(()) => {
                    debug!("Email to {} enqueued as job {}", message.to, job.job_id);
                    return;
                }
                Err(e) => {
                    error!("Failed to enqueue email, sending inline: {}", e);
                }
            }
        }

        if let Err(e) = self.mailer.send(&message).await {
            error!("Failed to send email to {}: {}", message.to, e);
        }
    }

    async fn push_sockets(&self, event: AppointmentEvent, notice: &AppointmentNotice) {
        self.registry
            .emit_to_user(notice.doctor_user_id, event.event_name(), &notice.payload)
            .await;
        self.registry
            .emit_to_user(notice.patient_user_id, event.event_name(), &notice.payload)
            .await;
    }
}
