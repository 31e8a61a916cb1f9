//! REST client for the FinTrackr backend.

mod client;
pub mod endpoints;
mod resources;

pub use client::ApiService;
pub use endpoints::TransactionKind;
pub use resources::DEFAULT_RECENT_LIMIT;
