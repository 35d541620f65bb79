use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Business-rule failures surfaced by the attendance/billing core. Each maps
/// to a stable status and message at the HTTP boundary; none is retryable.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Already checked in today")]
    DuplicateCheckIn,

    #[error("Already checked out")]
    AlreadyCheckedOut,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Not authorized")]
    Forbidden,

    #[error("Invalid month or year")]
    InvalidPeriod,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DuplicateCheckIn | AppError::AlreadyCheckedOut | AppError::InvalidPeriod => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Database(e) = self {
            tracing::error!(error = %e, "Database error");
            return HttpResponse::InternalServerError().json(json!({
                "error": "Internal Server Error"
            }));
        }

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_stable() {
        assert_eq!(AppError::DuplicateCheckIn.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::AlreadyCheckedOut.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("attendance record").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::InvalidPeriod.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_names_the_resource() {
        assert_eq!(
            AppError::NotFound("attendance record").to_string(),
            "attendance record not found"
        );
    }
}
