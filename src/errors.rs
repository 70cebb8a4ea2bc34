pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("inactive account: {0}")]
    InactiveAccount(String),
    #[error("inactive organization: {0}")]
    InactiveOrganization(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials(message.into())
    }

    pub fn inactive_account(message: impl Into<String>) -> Self {
        Self::InactiveAccount(message.into())
    }

    pub fn inactive_organization(message: impl Into<String>) -> Self {
        Self::InactiveOrganization(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn token(err: impl Into<String>) -> Self {
        Self::Token(err.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Faults worth retrying: the backend could not be reached or failed on its side.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Server { .. })
    }

    /// Short machine-readable code, stable across message changes.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials(_) => "invalid_credentials",
            AppError::InactiveAccount(_) => "inactive_account",
            AppError::InactiveOrganization(_) => "inactive_organization",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Configuration(_) => "configuration",
            AppError::Token(_) => "token",
            AppError::Network(_) => "network",
            AppError::Server { .. } => "server",
            AppError::Storage(_) => "storage",
            AppError::Internal(_) => "internal",
        }
    }

    /// Message suitable for a form banner or toast.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidCredentials(_) => "Incorrect email or password".to_string(),
            AppError::InactiveAccount(_) => {
                "Your account is inactive, contact your administrator".to_string()
            }
            AppError::InactiveOrganization(_) => {
                "Your company account is awaiting validation".to_string()
            }
            AppError::Unauthorized(_) => "Please sign in again".to_string(),
            AppError::Network(_) => "Unable to reach the server".to_string(),
            AppError::Server { .. } => "Server error, please try again later".to_string(),
            AppError::Forbidden(message)
            | AppError::NotFound(message)
            | AppError::BadRequest(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(format!("malformed payload: {value}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_connect() || value.is_timeout() || value.is_request() {
            return Self::Network(value.to_string());
        }
        if value.is_decode() {
            return Self::Internal(format!("malformed response: {value}"));
        }
        match value.status() {
            Some(status) if status.is_server_error() => Self::server(status.as_u16(), value.to_string()),
            _ => Self::Network(value.to_string()),
        }
    }
}
