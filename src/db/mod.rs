//! Durable history store: append-only status observations in SQLite.

mod models;
mod store;

pub use models::*;
pub use store::*;
