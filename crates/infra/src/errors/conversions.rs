//! Conversions from external infrastructure errors into the client error.

use backoffice_domain::ApiError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;
use std::io::Error as IoError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ApiError);

impl From<InfraError> for ApiError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ApiError> for InfraError {
    fn from(value: ApiError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoApiError {
    fn into_api(self) -> ApiError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ApiError */
/* -------------------------------------------------------------------------- */

impl IntoApiError for HttpError {
    fn into_api(self) -> ApiError {
        if self.is_timeout() {
            return ApiError::Network("HTTP request timed out".into());
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return ApiError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return ApiError::Serialization(format!("failed to read response body: {self}"));
        }

        if self.is_builder() {
            return ApiError::Config(format!("invalid request: {self}"));
        }

        ApiError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_api())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → ApiError */
/* -------------------------------------------------------------------------- */

impl IntoApiError for JsonError {
    fn into_api(self) -> ApiError {
        ApiError::Serialization(format!("invalid JSON at line {}: {self}", self.line()))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_api())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → ApiError */
/* -------------------------------------------------------------------------- */

impl IntoApiError for IoError {
    fn into_api(self) -> ApiError {
        ApiError::Storage(format!("{} ({:?})", self, self.kind()))
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_api())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
