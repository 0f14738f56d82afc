//! Uniform result envelope for resource calls.

use serde::de::DeserializeOwned;

use crate::error::{ErrorBody, ResourceError};
use crate::transport::RawResponse;

/// Category of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Not authorized, after at most one renewal attempt.
    Unauthorized,
    /// No response reached the client.
    Connectivity,
    /// The server answered with an error status.
    Resource,
    /// A success status whose body did not parse.
    Decode,
}

/// Outcome of one resource call, whatever happened.
///
/// `status` is `0` when no response arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome<T> {
    pub ok: bool,
    pub status: u16,
    pub data: Option<T>,
    pub error: Option<String>,
    pub failure: Option<Failure>,
}

impl<T> RequestOutcome<T> {
    pub fn success(status: u16, data: Option<T>) -> Self {
        Self {
            ok: true,
            status,
            data,
            error: None,
            failure: None,
        }
    }

    fn failed(status: u16, failure: Failure, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status,
            data: None,
            error: Some(error.into()),
            failure: Some(failure),
        }
    }

    /// Unauthorized outcome carrying `message`.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::failed(401, Failure::Unauthorized, message)
    }

    /// No response reached the client.
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::failed(0, Failure::Connectivity, message)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.failure == Some(Failure::Unauthorized)
    }

    pub fn is_connectivity(&self) -> bool {
        self.failure == Some(Failure::Connectivity)
    }

    /// Convert to a `Result`, requiring a body on success.
    pub fn into_result(self) -> Result<T, ResourceError> {
        if self.ok {
            return self
                .data
                .ok_or_else(|| ResourceError::Decode("empty response body".to_string()));
        }
        Err(self.into_error())
    }

    /// Convert to a `Result`, discarding any body.
    pub fn into_unit(self) -> Result<(), ResourceError> {
        if self.ok {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }

    fn into_error(self) -> ResourceError {
        let message = self
            .error
            .unwrap_or_else(|| format!("HTTP {}", self.status));
        match self.failure {
            Some(Failure::Unauthorized) => ResourceError::Unauthorized(message),
            Some(Failure::Connectivity) => ResourceError::Connectivity(message),
            Some(Failure::Decode) => ResourceError::Decode(message),
            Some(Failure::Resource) | None => ResourceError::Rejected {
                status: self.status,
                message,
            },
        }
    }
}

impl<T: DeserializeOwned> RequestOutcome<T> {
    /// Build an outcome from a response that reached the client.
    ///
    /// A success with an empty body is `ok` without data. Error messages
    /// are taken verbatim from `detail`, then `error`, then the raw body.
    pub fn from_response(response: RawResponse) -> Self {
        let status = response.status;

        if response.is_success() {
            if response.body.trim().is_empty() {
                return Self::success(status, None);
            }
            return match serde_json::from_str(&response.body) {
                Ok(data) => Self::success(status, Some(data)),
                Err(e) => Self::failed(status, Failure::Decode, e.to_string()),
            };
        }

        let message = error_message(&response);
        if response.is_unauthorized() {
            Self::unauthorized(message)
        } else {
            Self::failed(status, Failure::Resource, message)
        }
    }
}

fn error_message(response: &RawResponse) -> String {
    let body = response.body.trim();
    if body.is_empty() {
        return format!("HTTP {}", response.status);
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Some(detail),
            ..
        }) => detail,
        Ok(ErrorBody {
            error: Some(error), ..
        }) => error,
        Ok(ErrorBody { code: Some(code), .. }) => code,
        _ => body.to_string(),
    }
}
