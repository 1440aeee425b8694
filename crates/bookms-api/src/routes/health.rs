//! 헬스 체크 endpoint.
//!
//! 로드밸런서나 오케스트레이션 시스템에서 사용하는 DB 연결 확인.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{api_error, ApiErrorResponse, ApiResponse, ApiResult};
use crate::state::AppState;

/// 헬스 체크 응답 데이터.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    /// API 버전
    pub version: String,
    /// 서버 업타임(초)
    pub uptime_secs: i64,
}

/// 헬스 체크.
///
/// DB에 ping을 보내 성공하면 200 "healthy", 실패하면 500과 원인 메시지를 반환합니다.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "정상", body = ApiResponse<HealthStatus>),
        (status = 500, description = "DB 연결 실패", body = ApiErrorResponse)
    ),
    tag = "health"
)]
pub async fn healthz(State(state): State<Arc<AppState>>) -> ApiResult<Json<ApiResponse<HealthStatus>>> {
    if let Err(message) = state.ping_db().await {
        tracing::warn!(error = %message, "health check failed");
        return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, message));
    }

    Ok(Json(ApiResponse::new(
        HealthStatus {
            version: state.version.clone(),
            uptime_secs: state.uptime_secs(),
        },
        "healthy",
    )))
}

/// 헬스 체크 라우터 생성.
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new().route("/healthz", get(healthz))
}
