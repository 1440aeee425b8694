//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/healthz` - 헬스 체크 (DB ping)
//! - `/api/v1/auth` - 가입, 로그인, 토큰 갱신, 프로필
//! - `/api/v1/users` - 사용자 관리 (관리자 전용)
//! - `/api/v1/books` - 도서 조회 (공개) 및 관리 (관리자 전용)

pub mod auth;
pub mod books;
pub mod health;
pub mod users;

pub use auth::{auth_router, AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, UserProfile};
pub use books::{books_router, BookListResponse, BookSearchResponse, QuantityRequest};
pub use health::{health_router, HealthStatus};
pub use users::{users_router, CreateUserRequest, UpdateUserRequest, UserDetail, UserListResponse};

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json, Router};
use bookms_core::UserStore;
use sqlx::PgPool;

use crate::error::{api_error, ApiResult};
use crate::state::AppState;

/// 전체 API 라우터 생성.
///
/// 인증 미들웨어는 핸들러와 같은 `state.jwt`로 토큰을 검증합니다.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    let jwt = state.jwt.clone();
    Router::new()
        .merge(health_router())
        .nest("/api/v1/auth", auth_router(jwt.clone()))
        .nest("/api/v1/users", users_router(jwt.clone()))
        .nest("/api/v1/books", books_router(jwt))
        .with_state(state)
}

/// DB 풀이 없으면 500.
pub(crate) fn require_pool(state: &AppState) -> ApiResult<&PgPool> {
    state
        .db_pool
        .as_ref()
        .ok_or_else(|| api_error(StatusCode::INTERNAL_SERVER_ERROR, "Database not available"))
}

/// 사용자 저장소가 없으면 500.
pub(crate) fn require_user_store(state: &AppState) -> ApiResult<&Arc<dyn UserStore>> {
    state
        .user_store
        .as_ref()
        .ok_or_else(|| api_error(StatusCode::INTERNAL_SERVER_ERROR, "User store not available"))
}

/// JSON 본문 파싱 실패를 지정한 메시지의 400으로 변환.
pub(crate) fn json_body<T>(
    body: Result<Json<T>, JsonRejection>,
    message: &'static str,
) -> ApiResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!(error = %rejection, "request body rejected");
        api_error(StatusCode::BAD_REQUEST, message)
    })
}
