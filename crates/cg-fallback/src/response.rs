//! The envelope every policy request resolves to.

use campusgate_client::ClassifiedError;
use serde::{Deserialize, Serialize};

/// Where a response's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// A real backend answered.
    Live,
    /// Synthetic data from the demo catalogue.
    Demo,
    /// No data: the request failed.
    None,
}

/// Result of a request made through the fallback policy.
///
/// Always returned, never raised: failures are carried in `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ClassifiedError>,
    pub source: DataSource,
}

impl<T> ApiResponse<T> {
    pub fn live(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            source: DataSource::Live,
        }
    }

    /// Demo data, optionally annotated with the failure that caused it.
    pub fn demo(data: T, error: Option<ClassifiedError>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error,
            source: DataSource::Demo,
        }
    }

    pub fn failure(error: ClassifiedError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            source: DataSource::None,
        }
    }

    pub fn is_demo(&self) -> bool {
        self.source == DataSource::Demo
    }

    /// Convert into a `Result`, dropping the source label.
    pub fn into_result(self) -> Result<T, ClassifiedError> {
        match (self.data, self.error) {
            (Some(data), _) if self.success => Ok(data),
            (_, Some(error)) => Err(error),
            (_, None) => Err(ClassifiedError::malformed("response carried no data")),
        }
    }

    /// Transform the payload, keeping source and error.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            source: self.source,
        }
    }
}
