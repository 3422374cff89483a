//! Dashboard page and static assets

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Extension,
};
use serde::Deserialize;
use tracing::warn;

use super::auth::CurrentSession;
use crate::render::{render_dashboard, DashboardView, ViewMode};
use crate::AppState;

const RSD_CSS: &str = include_str!("../../static/rsd.css");

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub view: Option<String>,
}

/// GET /
///
/// History is loaded only for the simple view, where it is displayed.
pub async fn dashboard_page(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Query(query): Query<DashboardQuery>,
) -> Html<String> {
    let view = ViewMode::from_query(query.view.as_deref());
    let dashboard = state.sessions.dashboard(current.id).await;

    let (history, history_unavailable) = if view == ViewMode::Simple {
        match state
            .history
            .recent(&current.session, state.config.history.limit)
            .await
        {
            Ok(rows) => (rows, false),
            Err(e) => {
                warn!(user_id = %current.session.user.id, error = %e, "Failed to load history");
                (Vec::new(), true)
            }
        }
    } else {
        (Vec::new(), false)
    };

    Html(render_dashboard(&DashboardView {
        config: &state.config,
        view,
        user_email: current.email(),
        state: &dashboard,
        history: &history,
        history_unavailable,
    }))
}

/// GET /static/rsd.css
pub async fn serve_css() -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "text/css"),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        RSD_CSS,
    )
        .into_response()
}
