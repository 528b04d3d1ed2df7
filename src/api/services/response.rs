//! Owner API JSON envelope and error codes

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::LinkgateError;

/// API 错误码枚举
///
/// 按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 3000-3099: 链接错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    BadRequest = 1000,
    Unauthorized = 1001,
    NotFound = 1004,
    InternalServerError = 1005,
    InvalidDateFormat = 1012,
    ServiceUnavailable = 1030,

    MissingOwner = 2005,

    LinkNotFound = 3000,
    LinkAlreadyExists = 3001,
    LinkInvalidUrl = 3002,
    LinkInvalidTime = 3003,
    LinkPasswordHashError = 3004,
    LinkDatabaseError = 3005,
    LinkQuotaNotAllowed = 3008,
    LinkTokenExhausted = 3009,
}

impl From<&LinkgateError> for ErrorCode {
    fn from(err: &LinkgateError) -> Self {
        match err {
            LinkgateError::Validation { field, .. } => match *field {
                "target_url" => ErrorCode::LinkInvalidUrl,
                "expires_at" | "reveal_at" => ErrorCode::LinkInvalidTime,
                "max_clicks" => ErrorCode::LinkQuotaNotAllowed,
                _ => ErrorCode::BadRequest,
            },
            LinkgateError::DateParse(_) => ErrorCode::InvalidDateFormat,
            LinkgateError::NotFound(_) => ErrorCode::LinkNotFound,
            LinkgateError::Conflict(_) => ErrorCode::LinkAlreadyExists,
            LinkgateError::TokenExhausted(_) => ErrorCode::LinkTokenExhausted,
            LinkgateError::PasswordHash(_) => ErrorCode::LinkPasswordHashError,
            LinkgateError::DatabaseOperation(_) => ErrorCode::LinkDatabaseError,
            LinkgateError::TransientStore(_) | LinkgateError::Unavailable(_) => {
                ErrorCode::ServiceUnavailable
            }
            _ => ErrorCode::InternalServerError,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Field-level detail attached to validation failures
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
}

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .append_header(("Cache-Control", "no-store"))
        .json(ApiResponse {
            code,
            message: message.into(),
            data,
        })
}

pub fn success_response<T: Serialize>(status: StatusCode, data: T) -> HttpResponse {
    json_response(status, ErrorCode::Success, "OK", Some(data))
}

pub fn error_response(status: StatusCode, code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, code, message, None)
}

/// 从 LinkgateError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
pub fn error_from_linkgate(err: &LinkgateError) -> HttpResponse {
    let status = err.http_status();
    let code = ErrorCode::from(err);
    // 内部存储错误细节不外泄
    let message = match status {
        StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
        StatusCode::SERVICE_UNAVAILABLE => "Service Unavailable",
        _ => err.message(),
    };
    let detail = err.field().map(|field| FieldError {
        field: field.to_string(),
    });
    json_response(status, code, message, detail)
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T: Serialize>(status: StatusCode, result: Result<T, LinkgateError>) -> HttpResponse {
    match result {
        Ok(data) => success_response(status, data),
        Err(e) => error_from_linkgate(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serializes_as_number() {
        let json = serde_json::to_string(&ErrorCode::LinkNotFound).unwrap();
        assert_eq!(json, "3000");
    }

    #[test]
    fn test_validation_field_drives_code() {
        let err = LinkgateError::validation("target_url", "bad");
        assert_eq!(ErrorCode::from(&err), ErrorCode::LinkInvalidUrl);
        let err = LinkgateError::validation("max_clicks", "too many");
        assert_eq!(ErrorCode::from(&err), ErrorCode::LinkQuotaNotAllowed);
        let err = LinkgateError::validation("label", "too long");
        assert_eq!(ErrorCode::from(&err), ErrorCode::BadRequest);
    }

    #[test]
    fn test_internal_errors_hide_message() {
        let resp = error_from_linkgate(&LinkgateError::database_operation("secret sql"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
