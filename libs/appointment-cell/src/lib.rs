pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use services::booking::AppointmentBookingService;
pub use services::locks::SlotLocks;
