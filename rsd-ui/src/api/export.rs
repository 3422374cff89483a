//! CSV download of the session's last batch

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension,
};
use chrono::Utc;
use tracing::info;

use super::auth::CurrentSession;
use crate::error::{ApiError, ApiResult};
use crate::services::{content_disposition, export_filename, to_csv};
use crate::AppState;

/// GET /batch/export.csv
pub async fn export_batch_csv(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Response> {
    let batch = state
        .sessions
        .dashboard(current.id)
        .await
        .batch
        .ok_or_else(|| ApiError::NotFound("No hay resultados de lote para exportar".to_string()))?;

    let filename = export_filename(&batch.product_name, Utc::now().timestamp_millis());
    info!(
        user_id = %current.session.user.id,
        rows = batch.total_reviews,
        filename = %filename,
        "Exporting batch CSV"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        to_csv(&batch),
    )
        .into_response())
}
