//! Store a user and a post in MongoDB, then sync both to a REST API.
//!
//! The two flows share only the in-memory records. A document stored
//! locally is never linked to its remote copy.

pub mod api;
pub mod cli;
pub mod error;
pub mod models;
pub mod retry;
pub mod services;
pub mod settings;
pub mod store;

pub use api::PostOutcome;
pub use api::reqres::{RemoteApi, ReqresClient};
pub use error::SyncError;
pub use models::{PostRecord, UserRecord};
pub use store::{ConnectionState, RecordStore, StoreConnection};
