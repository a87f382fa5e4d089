//! Samuday Shakti equipment rental server
//!
//! FPO members list farm equipment and fill in a three-step rental request
//! (rental details, contact information, identity verification) that is
//! validated step by step, priced and submitted for the owner's approval.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod rental;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
