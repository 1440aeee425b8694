//! API 응답 봉투와 에러 타입.
//!
//! 모든 응답은 `{ "data": ..., "message": "..." }` 형식이며,
//! 에러 응답은 `data` 없이 `message`만 담습니다.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidationErrors;

/// API 에러 응답.
///
/// ```json
/// { "message": "Book not found" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
}

impl ApiErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// 성공 응답 봉투.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// 응답 데이터 (없으면 생략)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// 결과 메시지
    pub message: String,
}

impl<T> ApiResponse<T> {
    /// 데이터와 메시지를 담은 응답.
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            message: message.into(),
        }
    }
}

impl ApiResponse<()> {
    /// 메시지만 담은 응답.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            data: None,
            message: message.into(),
        }
    }
}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

/// 상태 코드와 메시지로 에러 응답을 만듭니다.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiErrorResponse>) {
    (status, Json(ApiErrorResponse::new(message)))
}

/// 내부 에러를 로그로 남기고 500 응답을 만듭니다.
///
/// 원인은 응답에 노출하지 않습니다.
pub fn internal_error(
    message: &'static str,
    err: impl std::fmt::Display,
) -> (StatusCode, Json<ApiErrorResponse>) {
    tracing::error!(error = %err, "{}", message);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

/// 요청 본문 검증 실패를 400 응답으로 변환합니다.
///
/// 필드 이름 순으로 정렬된 `field: message` 목록을 만듭니다.
pub fn validation_error(errors: ValidationErrors) -> (StatusCode, Json<ApiErrorResponse>) {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let reason = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "is invalid".to_string());
            format!("{}: {}", field, reason)
        })
        .collect();
    parts.sort();

    api_error(StatusCode::BAD_REQUEST, parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(email(message = "must be a valid email"))]
        email: String,
        #[validate(length(min = 8))]
        password: String,
    }

    #[test]
    fn test_error_response_json() {
        let json = serde_json::to_string(&ApiErrorResponse::new("Book not found")).unwrap();
        assert_eq!(json, r#"{"message":"Book not found"}"#);
    }

    #[test]
    fn test_response_omits_missing_data() {
        let json = serde_json::to_value(ApiResponse::message("User deleted successfully")).unwrap();
        assert_eq!(json, serde_json::json!({"message": "User deleted successfully"}));

        let json = serde_json::to_value(ApiResponse::new(vec![1, 2], "ok")).unwrap();
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_validation_error_message() {
        let sample = Sample {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        };
        let errors = sample.validate().unwrap_err();
        let (status, Json(body)) = validation_error(errors);

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "email: must be a valid email, password: is invalid");
    }
}
