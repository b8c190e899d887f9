//! API endpoint handlers, one module per resource.

pub mod alerts;
pub mod health;
pub mod notifications;
pub mod records;
pub mod sessions;
