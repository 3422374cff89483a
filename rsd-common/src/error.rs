//! Common error types for RSD

use thiserror::Error;

/// Common result type for RSD operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the dashboard
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure reaching the prediction service
    #[error("Network error: {0}")]
    Network(String),

    /// Prediction service answered with a non-success status
    #[error("Prediction service error {status}: {message}")]
    Service { status: u16, message: String },

    /// Prediction service answered 2xx with a body we cannot interpret
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// No usable review lines were submitted
    #[error("No reviews to analyze")]
    EmptyInput,

    /// Batch response cannot be matched position-by-position to the request
    #[error("Batch response mismatch at position {position}: expected {expected}, received {received}")]
    OrderMismatch {
        position: usize,
        expected: String,
        received: String,
    },

    /// Whole-batch failure wrapping the transport or service cause
    #[error("Batch analysis failed: {0}")]
    BatchAnalysis(#[source] Box<Error>),

    /// Identity provider failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// History store failure
    #[error("History store error: {0}")]
    History(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Error {
    /// Wrap a transport/service failure as a whole-batch failure.
    ///
    /// Input and correlation errors pass through unchanged so callers can
    /// still tell an empty submission from a broken service.
    pub fn into_batch_error(self) -> Error {
        match self {
            Error::EmptyInput
            | Error::OrderMismatch { .. }
            | Error::InvalidInput(_)
            | Error::BatchAnalysis(_) => self,
            other => Error::BatchAnalysis(Box::new(other)),
        }
    }

    /// Single message shown to the dashboard user
    pub fn user_message(&self) -> String {
        match self {
            Error::Network(_) => "No se pudo conectar con el servicio de predicción".to_string(),
            Error::Service { .. } | Error::MalformedResponse(_) => {
                "Error en la predicción del servidor".to_string()
            }
            Error::EmptyInput => "Debe proporcionar al menos una reseña".to_string(),
            Error::OrderMismatch { .. } => {
                "La respuesta del servicio no corresponde con las reseñas enviadas".to_string()
            }
            Error::BatchAnalysis(_) => "Error al analizar las reseñas".to_string(),
            Error::Auth(e) => e.user_message(),
            Error::InvalidInput(msg) => msg.clone(),
            _ => "Error al procesar la solicitud".to_string(),
        }
    }
}

/// Identity provider errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Session expired")]
    SessionExpired,

    #[error("Identity provider error {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Identity provider unreachable: {0}")]
    Network(String),
}

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Correo o contraseña incorrectos".to_string(),
            AuthError::AlreadyRegistered => {
                "Este correo ya está registrado. Intenta iniciar sesión.".to_string()
            }
            AuthError::PasswordTooShort { min } => {
                format!("La contraseña debe tener al menos {} caracteres", min)
            }
            AuthError::SessionExpired => {
                "Tu sesión ha expirado. Inicia sesión de nuevo.".to_string()
            }
            AuthError::Provider { message, .. } => message.clone(),
            AuthError::Network(_) => "Error de autenticación".to_string(),
        }
    }
}
