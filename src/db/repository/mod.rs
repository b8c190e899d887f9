//! Repository layer: table-scoped database operations.
//!
//! All public functions are re-exported here.

mod notification;
mod preference;

pub use notification::*;
pub use preference::*;
