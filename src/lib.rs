//! HTTP service that stores uploaded files in a local directory and serves
//! them back as static assets.

pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod openapi;
pub mod storage;
pub mod upload;

pub use app::build_router;
pub use config::AppConfig;
pub use storage::{LocalFileStorage, Storage};
