//! Patient notification feed.
//!
//! Generated notifications are a pure projection of the patient's records
//! (`generator`). They are merged with the remote feed (`feed`), filtered
//! against per-user dismissals (`dismissal`) and published by the
//! `center`.

pub mod center;
pub mod dismissal;
pub mod feed;
pub mod generator;

pub use center::{DeleteOutcome, NotificationCenter};
pub use dismissal::{DismissalStore, SqliteDismissalStore};
pub use feed::{RemoteFeed, SqliteFeed, Subscription};
pub use generator::{format_time_ago, generate};

use thiserror::Error;

use crate::db::DatabaseError;

/// Failures of the remote notification feed.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Feed unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Dismissal store error: {0}")]
    Dismissal(#[from] DatabaseError),

    #[error("Dismissal set encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("Notification session for user {0} has been stopped")]
    Stopped(String),

    #[error("Only patients have a notification session (role: {0})")]
    NotAPatient(&'static str),
}
