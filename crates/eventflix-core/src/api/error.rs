use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - session expired")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Whether the caller should send the user back to the login prompt
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::NotLoggedIn)
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            ApiError::InvalidCredentials => "Invalid email or password.".to_string(),
            ApiError::NotLoggedIn => "You need to log in first.".to_string(),
            ApiError::AccessDenied(_) => "You don't have permission to do that.".to_string(),
            ApiError::NotFound(_) => "The requested item was not found.".to_string(),
            ApiError::RateLimited => "Too many requests. Please wait and try again.".to_string(),
            ApiError::ServerError(_) => "The server had a problem. Please try again later.".to_string(),
            ApiError::NetworkError(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::NetworkError(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            ApiError::InvalidResponse(_) => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// User message for any error coming out of the client
    pub fn describe(error: &anyhow::Error) -> String {
        match error.downcast_ref::<ApiError>() {
            Some(api) => api.user_message(),
            None => format!("Something went wrong: {}", error),
        }
    }
}
