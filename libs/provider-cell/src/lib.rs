pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod timeslot;

pub use models::*;
pub use services::*;
