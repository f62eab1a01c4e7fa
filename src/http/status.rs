//! Mapping of HTTP failures onto readable install errors.
//!
//! Nothing here is retried: every failure becomes a fatal
//! [`InstallError::Download`].

use reqwest::{Response, StatusCode};

use crate::error::InstallError;

/// Human readable reason for a non-success status.
pub fn describe_status(status: StatusCode) -> String {
    match status {
        StatusCode::UNAUTHORIZED => {
            "Authentication failed (HTTP 401). Check your GITHUB_TOKEN.".to_string()
        }
        StatusCode::FORBIDDEN => {
            "Access forbidden (HTTP 403). You may be rate limited; set GITHUB_TOKEN.".to_string()
        }
        StatusCode::NOT_FOUND => {
            "Not found (HTTP 404). No release asset is published under this name.".to_string()
        }
        StatusCode::TOO_MANY_REQUESTS => {
            "Rate limit exceeded (HTTP 429). Try again later.".to_string()
        }
        s if s.is_client_error() => format!("Request error (HTTP {})", s.as_u16()),
        s if s.is_server_error() => format!("Server error (HTTP {})", s.as_u16()),
        s => format!("Unexpected HTTP status {}", s.as_u16()),
    }
}

/// Turns a non-success response into an [`InstallError::Download`].
pub fn check_status(url: &str, response: Response) -> Result<Response, InstallError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(InstallError::Download {
            url: url.to_string(),
            reason: describe_status(status),
        })
    }
}

/// Wraps a transport-level failure (DNS, connect, TLS, body read).
pub fn transport_error(url: &str, error: reqwest::Error) -> InstallError {
    InstallError::Download {
        url: url.to_string(),
        reason: error.to_string(),
    }
}
