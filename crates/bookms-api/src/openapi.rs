//! OpenAPI 문서화 설정.
//!
//! utoipa를 사용하여 REST API의 OpenAPI 3.0 스펙을 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! 새로운 엔드포인트를 추가할 때:
//!
//! 1. 응답/요청 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use bookms_core::{Role, UserStatus};

use crate::error::ApiErrorResponse;
use crate::repository::{BookRecord, NewBook, UpdateBook};
use crate::routes::{
    AuthResponse, BookListResponse, BookSearchResponse, CreateUserRequest, HealthStatus,
    LoginRequest, QuantityRequest, RefreshRequest, RegisterRequest, UpdateUserRequest, UserDetail,
    UserListResponse, UserProfile,
};

/// 보호된 경로가 참조하는 보안 스키마 이름.
pub const BEARER_AUTH: &str = "bearer_auth";

// ==================== OpenAPI 문서 정의 ====================

/// Book Management API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Book Management API",
        description = r#"
# 도서 관리 REST API

도서 카탈로그 조회와 관리, 사용자 계정 관리를 위한 REST API입니다.

## 인증

`/api/v1/auth/login`에서 발급받은 access token을
`Authorization: Bearer <token>` 헤더로 전달합니다.
access token이 만료되면 `/api/v1/auth/refresh`로 새 토큰 쌍을 받습니다.
"#
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "헬스 체크"),
        (name = "auth", description = "가입, 로그인, 토큰 갱신"),
        (name = "users", description = "사용자 관리 (관리자 전용)"),
        (name = "books", description = "도서 카탈로그")
    ),
    // ==================== 스키마 등록 ====================
    components(
        schemas(
            // ===== Common =====
            ApiErrorResponse,
            Role,
            UserStatus,

            // ===== Health =====
            HealthStatus,

            // ===== Auth =====
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            AuthResponse,
            UserProfile,

            // ===== Users =====
            CreateUserRequest,
            UpdateUserRequest,
            UserDetail,
            UserListResponse,

            // ===== Books =====
            BookRecord,
            NewBook,
            UpdateBook,
            QuantityRequest,
            BookListResponse,
            BookSearchResponse,
        )
    ),
    // ==================== 경로 등록 ====================
    paths(
        // ===== Health =====
        crate::routes::health::healthz,

        // ===== Auth =====
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::refresh,
        crate::routes::auth::profile,

        // ===== Users =====
        crate::routes::users::create_user,
        crate::routes::users::list_users,
        crate::routes::users::get_user,
        crate::routes::users::update_user,
        crate::routes::users::delete_user,

        // ===== Books =====
        crate::routes::books::list_books,
        crate::routes::books::get_book,
        crate::routes::books::search_books,
        crate::routes::books::available_books,
        crate::routes::books::create_book,
        crate::routes::books::update_book,
        crate::routes::books::delete_book,
        crate::routes::books::update_quantity,
    )
)]
pub struct ApiDoc;

/// Bearer JWT 보안 스키마 등록.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                BEARER_AUTH,
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

// ==================== Swagger UI 라우터 ====================

/// Swagger UI 라우터 생성.
///
/// 다음 경로에 문서 UI를 마운트합니다:
/// - `/swagger-ui` - Swagger UI 대화형 문서
/// - `/api-docs/openapi.json` - OpenAPI JSON 스펙
pub fn swagger_ui_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
