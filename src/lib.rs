pub mod admin;
pub mod api;
pub mod chat;
pub mod config;
pub mod render;
pub mod resolver;
pub mod store;

#[cfg(test)]
mod test_utils;

pub use admin::{DeleteOutcome, Operator, SourceListing, UploadRequest};
pub use api::{ApiClient, ApiError, SourceDoc};
pub use chat::{Ask, ChatController, NETWORK_ERROR_MESSAGE, Role, Transcript};
pub use config::Config;
pub use resolver::{HealthProbe, HttpProbe, Resolver};
pub use store::{ADMIN_SECRET_KEY, API_BASE_KEY, FileStore, LocalStore, MemoryStore};
