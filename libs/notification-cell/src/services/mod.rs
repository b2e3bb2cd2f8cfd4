pub mod mailer;
pub mod notify;
pub mod queue;
pub mod registry;
pub mod worker;
