//! Read-through data access with a local fallback when the backend is down.

mod mirror;
mod service;
mod source;

pub use mirror::StoreMirror;
pub use service::{DataService, Saved};
pub use source::{FallbackPolicy, LocalMirror, PreferRemote, RemoteSource};
