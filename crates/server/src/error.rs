use axum::{http::StatusCode, Json};
use shared::error::{ApiError, ErrorCode};

pub(crate) type HttpError = (StatusCode, Json<ApiError>);
pub(crate) type ApiResult<T> = Result<Json<T>, HttpError>;

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn reject(error: ApiError) -> HttpError {
    (status_for(error.code), Json(error))
}
