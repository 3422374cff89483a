//! Analysis and account services
//!
//! # Components
//! 1. **prediction_client** - reqwest transport to the sentiment predictor
//! 2. **model_comparator** - one prediction per enabled model, concurrently
//! 3. **batch_analyzer** - multi-line submissions with local statistics
//! 4. **csv_export** - CSV rendering of a batch result
//! 5. **identity** - email/password accounts against the identity provider
//! 6. **history_store** - per-user prediction history
//!
//! Remote calls are isolated behind traits (`PredictionBackend`,
//! `IdentityProvider`, `HistoryStore`) so handlers and tests can swap them.

pub mod batch_analyzer;
pub mod csv_export;
pub mod history_store;
pub mod identity;
pub mod model_comparator;
pub mod prediction_client;

pub use batch_analyzer::{split_reviews, BatchAnalyzer};
pub use csv_export::{content_disposition, export_filename, to_csv};
pub use history_store::{HistoryStore, RemoteHistoryStore};
pub use identity::{IdentityProvider, SignUpOutcome, SupabaseIdentity};
pub use model_comparator::ModelComparator;
pub use prediction_client::{
    BatchPredictionResponse, BatchResponseItem, HttpPredictionBackend, PredictionBackend,
    PredictionClient, PredictorHealth,
};
