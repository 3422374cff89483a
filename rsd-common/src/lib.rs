//! # RSD Common Library
//!
//! Shared code for the review sentiment dashboard:
//! - Domain types (models, scores, sentiments, batch statistics)
//! - Error types shared by the prediction, identity and history layers
//! - Configuration loading

pub mod config;
pub mod error;
pub mod types;

pub use config::DashboardConfig;
pub use error::{AuthError, Error, Result};
pub use types::{ModelId, Score, Sentiment};
