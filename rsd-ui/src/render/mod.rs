//! Server-side HTML rendering
//!
//! Pages are plain `String`s assembled with `format!`; every piece of user
//! or service text passes through [`escape_html`].

mod dashboard;
pub mod format;
mod login;

pub use dashboard::{render_dashboard, DashboardView};
pub use format::escape_html;
pub use login::{render_login, AuthMode, LoginView};

/// Which dashboard section is shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Simple,
    Compare,
    Batch,
}

impl ViewMode {
    /// Parse `?view=`; anything unrecognized shows the simple view
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("compare") => ViewMode::Compare,
            Some("batch") => ViewMode::Batch,
            _ => ViewMode::Simple,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Simple => "simple",
            ViewMode::Compare => "compare",
            ViewMode::Batch => "batch",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ViewMode::Simple => "Análisis simple",
            ViewMode::Compare => "Comparar modelos",
            ViewMode::Batch => "Análisis por lotes",
        }
    }

    const ALL: [ViewMode; 3] = [ViewMode::Simple, ViewMode::Compare, ViewMode::Batch];
}

/// Shared `<head>` for every page
fn page_head(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    <link rel="stylesheet" href="/static/rsd.css">
</head>"#,
        escape_html(title)
    )
}

fn build_footer() -> String {
    format!(
        r#"<footer class="build-info">rsd-ui v{} · {} · {} ({})</footer>"#,
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    )
}
