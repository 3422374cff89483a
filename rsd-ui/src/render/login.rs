//! Sign-in / sign-up page

use super::format::escape_html;
use super::{build_footer, page_head};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

impl AuthMode {
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("signup") => AuthMode::SignUp,
            _ => AuthMode::SignIn,
        }
    }
}

pub struct LoginView<'a> {
    pub mode: AuthMode,
    pub email: &'a str,
    pub error: Option<&'a str>,
    pub notice: Option<&'a str>,
}

pub fn render_login(view: &LoginView<'_>) -> String {
    let (title, action, button, switch) = match view.mode {
        AuthMode::SignIn => (
            "Iniciar sesión",
            "/login",
            "Entrar",
            r#"¿No tienes cuenta? <a href="/login?mode=signup">Regístrate</a>"#,
        ),
        AuthMode::SignUp => (
            "Crear cuenta",
            "/signup",
            "Registrarse",
            r#"¿Ya tienes cuenta? <a href="/login">Inicia sesión</a>"#,
        ),
    };

    let error = view
        .error
        .map(|e| format!(r#"<div class="alert error">{}</div>"#, escape_html(e)))
        .unwrap_or_default();
    let notice = view
        .notice
        .map(|n| format!(r#"<div class="alert positive">{}</div>"#, escape_html(n)))
        .unwrap_or_default();

    format!(
        r#"{head}
<body class="auth">
<main class="card auth-card">
    <h1>Análisis de Sentimiento</h1>
    <h2>{title}</h2>
    {error}{notice}
    <form method="post" action="{action}">
        <label for="email">Correo electrónico</label>
        <input id="email" name="email" type="email" required value="{email}">
        <label for="password">Contraseña</label>
        <input id="password" name="password" type="password" required minlength="6">
        <button type="submit">{button}</button>
    </form>
    <p class="switch">{switch}</p>
</main>
{footer}
</body>
</html>"#,
        head = page_head(title),
        email = escape_html(view.email),
        footer = build_footer(),
    )
}
