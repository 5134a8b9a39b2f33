// ecotrash-api: Async Rust client for the Ecotrash administrative REST API

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod resources;
pub mod transport;

pub use client::ApiClient;
pub use error::Error;
pub use models::{FieldErrors, LoginData, LoginManagement, LoginUser};
pub use resources::{Resource, UpdateMethod, paths};
pub use transport::{TlsMode, TransportConfig};
