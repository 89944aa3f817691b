pub mod client;
pub mod models;

pub use client::{ApiClient, ApiError, Fetch};
pub use models::ClientConfig;
