//! Local HTTP API for the notification subsystem.
//!
//! Record screens push a patient's sources and created records here; the
//! feed UI lists, searches and deletes notifications. Routes are nested
//! under `/api/`.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, NotifyApiServer};
pub use types::ApiContext;
