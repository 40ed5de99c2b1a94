pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod openapi;
pub mod policy;
pub mod rate_limit;
pub mod repo;
pub mod routes;
pub mod store;
pub mod tree;
pub mod view;

// Re-export commonly used items for tests / external users
pub use policy::DisplayNode;
pub use routes::{config, AppState};
pub use store::NodeStore;
