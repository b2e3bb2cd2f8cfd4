pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::NotificationError;
pub use models::{AppointmentEvent, AppointmentNotice, EmailJob, EmailMessage};
pub use router::notification_routes;
pub use services::mailer::Mailer;
pub use services::notify::NotificationService;
pub use services::queue::EmailQueueService;
pub use services::registry::SocketRegistry;
pub use services::worker::EmailWorkerService;
