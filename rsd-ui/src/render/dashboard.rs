//! Dashboard page (simple, compare and batch views)

use super::format::{
    escape_html, format_timestamp, percentage, score_description, sentiment_class, stars,
    truncate_product,
};
use super::{build_footer, page_head, ViewMode};
use crate::session::DashboardState;
use rsd_common::types::{BatchResult, ComparisonOutcome, HistoryRecord, PredictionResult};
use rsd_common::{DashboardConfig, ModelId, Score, Sentiment};
use std::fmt::Write;

/// Everything the dashboard page needs
pub struct DashboardView<'a> {
    pub config: &'a DashboardConfig,
    pub view: ViewMode,
    pub user_email: &'a str,
    pub state: &'a DashboardState,
    pub history: &'a [HistoryRecord],
    pub history_unavailable: bool,
}

impl DashboardView<'_> {
    fn selected_product(&self) -> &str {
        self.state
            .product_name
            .as_deref()
            .or_else(|| self.config.products.first().map(String::as_str))
            .unwrap_or_default()
    }

    fn selected_model(&self) -> Option<ModelId> {
        self.state
            .prediction
            .as_ref()
            .map(|p| p.model)
            .or_else(|| self.state.batch.as_ref().map(|b| b.model))
            .filter(|m| self.config.is_enabled(*m))
            .or_else(|| self.config.default_model())
    }
}

/// Render the full page for `view.view`
pub fn render_dashboard(view: &DashboardView<'_>) -> String {
    let section = match view.view {
        ViewMode::Simple => render_simple(view),
        ViewMode::Compare => render_compare(view),
        ViewMode::Batch => render_batch(view),
    };

    format!(
        r#"{head}
<body>
<header>
    <h1>Análisis de Sentimiento de Reseñas</h1>
    <div class="user">
        <span>{email}</span>
        <form method="post" action="/logout"><button type="submit" class="link">Cerrar sesión</button></form>
    </div>
</header>
<nav class="tabs">{tabs}</nav>
<main class="container">
{section}
</main>
{footer}
</body>
</html>"#,
        head = page_head("Análisis de Sentimiento"),
        email = escape_html(view.user_email),
        tabs = render_tabs(view.view),
        section = section,
        footer = build_footer(),
    )
}

fn render_tabs(active: ViewMode) -> String {
    ViewMode::ALL
        .iter()
        .map(|mode| {
            format!(
                r#"<a href="/?view={}" class="tab{}">{}</a>"#,
                mode.as_str(),
                if *mode == active { " active" } else { "" },
                mode.label()
            )
        })
        .collect()
}

fn product_select(view: &DashboardView<'_>) -> String {
    let selected = view.selected_product();
    let mut html = String::from(r#"<label for="product">Producto</label><select id="product" name="product">"#);
    for product in &view.config.products {
        let _ = write!(
            html,
            r#"<option value="{0}"{1}>{0}</option>"#,
            escape_html(product),
            if product == selected { " selected" } else { "" }
        );
    }
    html.push_str("</select>");
    html
}

fn model_select(view: &DashboardView<'_>) -> String {
    let selected = view.selected_model();
    let mut html = String::from(r#"<label for="model">Modelo</label><select id="model" name="model">"#);
    for model in view.config.models.iter().filter(|m| m.available) {
        let _ = write!(
            html,
            r#"<option value="{}"{} title="{}">{}</option>"#,
            model.id,
            if Some(model.id) == selected { " selected" } else { "" },
            escape_html(&model.description),
            escape_html(&model.name)
        );
    }
    html.push_str("</select>");
    html
}

fn error_box(message: Option<&String>) -> String {
    message
        .map(|m| format!(r#"<div class="alert error">{}</div>"#, escape_html(m)))
        .unwrap_or_default()
}

// ============================================================================
// Simple view
// ============================================================================

fn render_simple(view: &DashboardView<'_>) -> String {
    let result = view
        .state
        .prediction
        .as_ref()
        .map(|p| prediction_card(view.config, p))
        .unwrap_or_default();

    format!(
        r#"<section class="card">
    <h2>Analizar una reseña</h2>
    <form method="post" action="/predict">
        {products}
        {models}
        <label for="review">Reseña</label>
        <textarea id="review" name="review" rows="5" placeholder="Escribe la reseña del producto...">{review}</textarea>
        <button type="submit">Analizar</button>
    </form>
    {error}
</section>
{result}
{history}"#,
        products = product_select(view),
        models = model_select(view),
        review = escape_html(&view.state.review_text),
        error = error_box(view.state.prediction_error.as_ref()),
        result = result,
        history = history_table(view),
    )
}

fn prediction_card(config: &DashboardConfig, prediction: &PredictionResult) -> String {
    format!(
        r#"<section class="card result">
    <h2>Resultado</h2>
    <div class="score">{score}<span class="of">/5</span></div>
    <div class="stars">{stars}</div>
    <span class="badge {class}">{sentiment}</span>
    <p class="description">{description}</p>
    <p class="meta">Modelo: {model} · Producto: {product}</p>
</section>"#,
        score = prediction.score,
        stars = stars(i64::from(prediction.score.value())),
        class = sentiment_class(prediction.sentiment.as_str()),
        sentiment = prediction.sentiment,
        description = score_description(prediction.score),
        model = escape_html(config.model_name(prediction.model)),
        product = escape_html(&prediction.product_name),
    )
}

fn history_table(view: &DashboardView<'_>) -> String {
    if view.history_unavailable {
        return r#"<section class="card history"><h2>Historial</h2><p class="muted">No se pudo cargar el historial.</p></section>"#
            .to_string();
    }
    if view.history.is_empty() {
        return r#"<section class="card history"><h2>Historial</h2><p class="muted">Aún no hay análisis guardados.</p></section>"#
            .to_string();
    }

    let mut rows = String::new();
    for record in view.history {
        let _ = write!(
            rows,
            r#"<tr><td>{}</td><td title="{}">{}</td><td>{}</td><td>{}</td><td><span class="badge {}">{}</span></td></tr>"#,
            format_timestamp(&record.created_at),
            escape_html(&record.product_name),
            escape_html(&truncate_product(&record.product_name)),
            escape_html(&record.model_used.to_uppercase()),
            stars(record.predicted_score),
            sentiment_class(&record.predicted_sentiment),
            escape_html(&record.predicted_sentiment),
        );
    }

    format!(
        r#"<section class="card history">
    <h2>Historial</h2>
    <table>
        <thead><tr><th>Fecha</th><th>Producto</th><th>Modelo</th><th>Puntuación</th><th>Sentimiento</th></tr></thead>
        <tbody>{}</tbody>
    </table>
</section>"#,
        rows
    )
}

// ============================================================================
// Compare view
// ============================================================================

fn render_compare(view: &DashboardView<'_>) -> String {
    format!(
        r#"<section class="card">
    <h2>Comparar modelos</h2>
    <form method="post" action="/compare">
        {products}
        <label for="review">Reseña</label>
        <textarea id="review" name="review" rows="5" placeholder="Escribe la reseña del producto...">{review}</textarea>
        <button type="submit">Comparar</button>
    </form>
    {error}
</section>
{results}"#,
        products = product_select(view),
        review = escape_html(&view.state.review_text),
        error = error_box(view.state.comparison_error.as_ref()),
        results = comparison_table(view.config, &view.state.comparison),
    )
}

/// First row is marked as the best result (by position, not by score)
fn comparison_table(config: &DashboardConfig, outcomes: &[ComparisonOutcome]) -> String {
    if outcomes.is_empty() {
        return String::new();
    }

    let mut rows = String::new();
    for (i, outcome) in outcomes.iter().enumerate() {
        let _ = write!(
            rows,
            r#"<tr{}><td>{}{}</td><td>{}</td><td>{}</td><td><span class="badge {}">{}</span></td><td>{} ms</td></tr>"#,
            if i == 0 { r#" class="best""# } else { "" },
            escape_html(config.model_name(outcome.model)),
            if i == 0 { r#" <span class="tag">Mejor</span>"# } else { "" },
            outcome.score,
            stars(i64::from(outcome.score.value())),
            sentiment_class(outcome.sentiment.as_str()),
            outcome.sentiment,
            outcome.elapsed_millis,
        );
    }

    format!(
        r#"<section class="card result">
    <h2>Resultados por modelo</h2>
    <table>
        <thead><tr><th>Modelo</th><th>Puntuación</th><th>Estrellas</th><th>Sentimiento</th><th>Tiempo</th></tr></thead>
        <tbody>{}</tbody>
    </table>
</section>"#,
        rows
    )
}

// ============================================================================
// Batch view
// ============================================================================

fn render_batch(view: &DashboardView<'_>) -> String {
    let results = view
        .state
        .batch
        .as_ref()
        .map(|batch| batch_results(view.config, batch))
        .unwrap_or_default();

    format!(
        r#"<section class="card">
    <h2>Análisis por lotes</h2>
    <form method="post" action="/batch">
        {products}
        {models}
        <label for="reviews">Reseñas (una por línea)</label>
        <textarea id="reviews" name="reviews" rows="10" placeholder="Una reseña por línea...">{text}</textarea>
        <button type="submit">Analizar lote</button>
    </form>
    {error}
</section>
{results}"#,
        products = product_select(view),
        models = model_select(view),
        text = escape_html(&view.state.batch_text),
        error = error_box(view.state.batch_error.as_ref()),
        results = results,
    )
}

fn bar(label: &str, class: &str, count: usize, total: usize) -> String {
    let pct = percentage(count, total);
    format!(
        r#"<div class="bar-row"><span class="bar-label">{label}</span><div class="bar"><div class="bar-fill {class}" style="width: {pct}%"></div></div><span class="bar-value">{count} ({pct}%)</span></div>"#
    )
}

fn batch_results(config: &DashboardConfig, batch: &BatchResult) -> String {
    let stats = &batch.statistics;
    let total = batch.total_reviews;

    let sentiment_bars: String = [Sentiment::Positivo, Sentiment::Neutro, Sentiment::Negativo]
        .iter()
        .map(|s| {
            bar(
                s.as_str(),
                sentiment_class(s.as_str()),
                stats.sentiment_distribution.get(*s),
                total,
            )
        })
        .collect();

    let score_bars: String = Score::all()
        .rev()
        .map(|score| {
            bar(
                &stars(i64::from(score.value())),
                "score",
                stats.score_distribution.get(score),
                total,
            )
        })
        .collect();

    let mut rows = String::new();
    for item in &batch.items {
        let _ = write!(
            rows,
            r#"<tr><td>{}</td><td class="review">{}</td><td>{}</td><td><span class="badge {}">{}</span></td></tr>"#,
            item.index,
            escape_html(&item.text),
            stars(i64::from(item.score.value())),
            sentiment_class(item.sentiment.as_str()),
            item.sentiment,
        );
    }

    format!(
        r#"<section class="card result">
    <h2>Resumen</h2>
    <div class="summary">
        <div><span class="big">{total}</span> reseñas</div>
        <div><span class="big">{average}</span> puntuación media</div>
        <div>Modelo: {model} · Producto: {product}</div>
    </div>
    <h3>Sentimiento</h3>
    {sentiment_bars}
    <h3>Puntuación</h3>
    {score_bars}
    <a class="button" href="/batch/export.csv">Descargar CSV</a>
</section>
<section class="card">
    <h2>Detalle</h2>
    <table>
        <thead><tr><th>#</th><th>Reseña</th><th>Puntuación</th><th>Sentimiento</th></tr></thead>
        <tbody>{rows}</tbody>
    </table>
</section>"#,
        total = total,
        average = stats.average_display(),
        model = escape_html(config.model_name(batch.model)),
        product = escape_html(&batch.product_name),
        sentiment_bars = sentiment_bars,
        score_bars = score_bars,
        rows = rows,
    )
}
