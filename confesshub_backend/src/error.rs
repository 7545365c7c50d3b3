use crate::helper::account_helpers::AccountError;
use crate::helper::admin_helpers::AdminHelperError;
use crate::helper::post_helpers::PostError;
use crate::helper::report_helpers::ReportError;
use crate::models::db_operations::DbError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

/// Error type returned by every JSON handler. Bodies are `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Administrator access required")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Storage(e) => {
                log::error!("Storage error: {}", e);
                "Internal server error".to_string()
            }
            ApiError::Internal(msg) => {
                log::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::PostNotFound => ApiError::NotFound(e.to_string()),
            ReportError::ReportNotFound => ApiError::BadRequest(e.to_string()),
            ReportError::Storage(db) => ApiError::Storage(db),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<PostError> for ApiError {
    fn from(e: PostError) -> Self {
        match e {
            PostError::PostNotFound | PostError::CommentNotFound => ApiError::NotFound(e.to_string()),
            PostError::Storage(db) => ApiError::Storage(db),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Storage(db) => ApiError::Storage(db),
            AccountError::Hashing(err) => ApiError::Internal(err.to_string()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<AdminHelperError> for ApiError {
    fn from(e: AdminHelperError) -> Self {
        match e {
            AdminHelperError::UserNotFound => ApiError::NotFound(e.to_string()),
            AdminHelperError::CannotDeactivateSelf => ApiError::BadRequest(e.to_string()),
            AdminHelperError::Storage(db) => ApiError::Storage(db),
        }
    }
}

impl From<actix_session::SessionInsertError> for ApiError {
    fn from(e: actix_session::SessionInsertError) -> Self {
        ApiError::Internal(format!("session insert failed: {}", e))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    fn status_of(err: ApiError) -> StatusCode {
        err.error_response().status()
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(status_of(ApiError::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ApiError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(ApiError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_of(ApiError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ApiError::Internal("boom".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn domain_errors_map_to_client_errors() {
        assert_eq!(status_of(ReportError::AlreadyReported.into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ReportError::AlreadyReviewed.into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ReportError::PostNotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AccountError::ExpiredToken.into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(PostError::PostNotFound.into()), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn internal_details_are_not_leaked() {
        let response = ApiError::Internal("secret path /var/db".into()).error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
