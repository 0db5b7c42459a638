use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Every failure the API reports. The SPA branches on `errorCode`, so the
/// HTTP status stays 200 and the code travels in the envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not logged in or session expired")]
    Unauthorized,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account is disabled")]
    PermissionDenied,

    #[error("article not found")]
    ArticleNotFound,

    #[error("category still has {0} published articles and cannot be deleted")]
    CategoryHasArticles(u32),

    #[error("tag still has {0} published articles and cannot be deleted")]
    TagHasArticles(u32),

    #[error("category name already exists")]
    DuplicateCategoryName,

    #[error("tag name already exists")]
    DuplicateTagName,

    #[error("file exceeds the 5 MiB limit")]
    FileTooLarge,

    #[error("unsupported file type: {0}")]
    InvalidFileType(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Internal(_) => "1000",
            ApiError::Validation(_) => "1001",
            ApiError::NotFound(_) => "1004",
            ApiError::Unauthorized => "2001",
            ApiError::InvalidCredentials => "2003",
            ApiError::PermissionDenied => "2004",
            ApiError::ArticleNotFound => "3001",
            ApiError::CategoryHasArticles(_) => "3002",
            ApiError::TagHasArticles(_) => "3003",
            ApiError::DuplicateCategoryName => "3004",
            ApiError::DuplicateTagName => "3005",
            ApiError::FileTooLarge => "4001",
            ApiError::InvalidFileType(_) => "4002",
            ApiError::UploadFailed(_) => "4003",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(_) | ApiError::UploadFailed(_) => {
                tracing::error!("request failed: {}", &self)
            }
            _ => tracing::info!("request rejected [{}]: {}", self.code(), &self),
        }
        (
            StatusCode::OK,
            Json(json!({
                "success": false,
                "errorCode": self.code(),
                "errorMessage": self.to_string(),
            })),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::FileTooLarge
        } else {
            ApiError::UploadFailed(err.body_text())
        }
    }
}

/// `Json` whose rejection is reported through the API envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Success half of the envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        message: None,
    })
}

pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        message: Some(message.into()),
    })
}

pub async fn route_not_found() -> impl IntoResponse {
    tracing::debug!("route_not_found");
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "errorCode": "1004",
            "errorMessage": "Endpoint not found"
        })),
    )
}
