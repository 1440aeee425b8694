//! 도서 관리 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API (도서 카탈로그, 사용자 관리)
//! - JWT 인증 및 역할 기반 접근 제어
//! - 헬스 체크 엔드포인트
//! - OpenAPI 문서 및 Swagger UI
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`auth`]: 토큰 발급/검증, 인증 미들웨어, 비밀번호 해싱
//! - [`repository`]: PostgreSQL 접근
//! - [`openapi`]: OpenAPI 문서 및 Swagger UI

pub mod auth;
pub mod error;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod state;
pub mod utils;

pub use auth::{
    extract_token, hash_password, require_admin, require_auth, require_role, verify_password,
    AuthError, AuthUser, Claims, JwtError, JwtService, RefreshClaims, TokenPair,
};
pub use error::{ApiErrorResponse, ApiResponse, ApiResult};
pub use openapi::{swagger_ui_router, ApiDoc};
pub use routes::*;
pub use state::AppState;

#[cfg(any(test, feature = "test-utils"))]
pub use state::create_test_state;
