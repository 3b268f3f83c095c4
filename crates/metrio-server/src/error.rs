use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metrio_common::MetrioError;

pub struct ApiError(pub MetrioError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            MetrioError::UnknownKind(_)
            | MetrioError::MissingValue { .. }
            | MetrioError::InvalidValue(_)
            | MetrioError::SignatureMismatch => StatusCode::BAD_REQUEST,
            MetrioError::NotFound { .. } => StatusCode::NOT_FOUND,
            MetrioError::Decode(_)
            | MetrioError::DatabaseUnavailable(_)
            | MetrioError::Storage(_)
            | MetrioError::Transport(_)
            | MetrioError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Unknown ids answer 404 with an empty body; everything else
        // carries the error text.
        let body = match &self.0 {
            MetrioError::NotFound { .. } => String::new(),
            err => err.to_string(),
        };
        (status, body).into_response()
    }
}

impl From<MetrioError> for ApiError {
    fn from(err: MetrioError) -> Self {
        ApiError(err)
    }
}
