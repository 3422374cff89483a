//! HTTP handlers
//!
//! - **auth**: session cookie middleware, login/signup/logout
//! - **pages**: dashboard page and stylesheet
//! - **analysis**: dashboard form submissions (post/redirect/get)
//! - **rest**: JSON API
//! - **export**: CSV download
//! - **health**: liveness

pub mod analysis;
pub mod auth;
pub mod export;
pub mod health;
pub mod pages;
pub mod rest;

pub use analysis::{submit_batch, submit_comparison, submit_prediction};
pub use auth::{
    login, login_page, logout, require_api_session, require_page_session, signup,
    CurrentSession,
};
pub use export::export_batch_csv;
pub use health::health_routes;
pub use pages::{dashboard_page, serve_css};
pub use rest::{api_batch, api_compare, api_history, api_predict, api_predictor_health};
