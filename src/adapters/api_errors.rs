use crate::domain::error::HistoryError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype so the domain error can be turned into an HTTP response here,
/// keeping axum out of the domain layer.
pub struct ApiError(pub HistoryError);

impl From<HistoryError> for ApiError {
    fn from(err: HistoryError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            HistoryError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            HistoryError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            HistoryError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            HistoryError::Unsupported(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unsupported_operation",
                msg.clone(),
            ),
            HistoryError::Database(err) => {
                tracing::error!("database error: {err}");
                internal()
            }
            HistoryError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                internal()
            }
            HistoryError::Export(err) => {
                tracing::error!("export error: {err}");
                internal()
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal error".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_distinguish_error_kinds() {
        let cases = [
            (HistoryError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (HistoryError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (HistoryError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (HistoryError::Unsupported("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                HistoryError::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }
}
