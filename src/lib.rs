// This file is needed to make the project structure work correctly
// It exports all the modules for use in the application

pub mod models;
pub mod schema;
pub mod services;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod logger;
pub mod seed;

// Re-export common types
pub use crate::config::AppConfig;
pub use crate::config::DbPool;
pub use crate::errors::ApiError;
pub use crate::models::User;
