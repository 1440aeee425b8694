//! 인증 endpoint.
//!
//! # 엔드포인트
//!
//! - `POST /api/v1/auth/register` - 회원 가입 (member, active)
//! - `POST /api/v1/auth/login` - 로그인
//! - `POST /api/v1/auth/refresh` - 토큰 갱신 (사용자 정보를 저장소에서 다시 읽음)
//! - `GET /api/v1/auth/profile` - 내 프로필 (인증 필요)

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use bookms_core::{NewUser, Role, StoreError, User, UserStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{json_body, require_user_store};
use crate::auth::{hash_password, require_auth, verify_password, AuthUser, JwtService};
use crate::error::{
    api_error, internal_error, validation_error, ApiErrorResponse, ApiResponse, ApiResult,
};
use crate::state::AppState;

const INVALID_FORMAT: &str = "Invalid request format";
const INVALID_CREDENTIALS: &str = "Invalid email or password";
const ACCOUNT_INACTIVE: &str = "Account is not active";
const TOKEN_ERROR: &str = "Error generating authentication tokens";

// ==================== Request/Response 타입 ====================

/// 회원 가입 요청
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub last_name: String,
}

/// 로그인 요청
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// 토큰 갱신 요청
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub refresh_token: String,
}

/// 사용자 프로필
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub status: UserStatus,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            status: user.status,
        }
    }
}

/// 가입/로그인/갱신 응답
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
    /// Access Token 만료 시각
    pub expires_at: DateTime<Utc>,
}

/// 사용자에게 새 토큰 쌍을 발급합니다.
fn issue_tokens(jwt: &JwtService, user: &User) -> ApiResult<AuthResponse> {
    let pair = jwt
        .issue_pair(&user.principal())
        .map_err(|e| internal_error(TOKEN_ERROR, e))?;
    let expires_at = jwt
        .access_expires_at(Utc::now())
        .map_err(|e| internal_error(TOKEN_ERROR, e))?;

    Ok(AuthResponse {
        user: UserProfile::from(user),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        expires_at,
    })
}

// ==================== API 핸들러 ====================

/// 회원 가입
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "가입 성공", body = ApiResponse<AuthResponse>),
        (status = 400, description = "잘못된 요청", body = ApiErrorResponse),
        (status = 409, description = "이메일 중복", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    let req = json_body(body, INVALID_FORMAT)?;
    req.validate().map_err(validation_error)?;
    let store = require_user_store(&state)?;

    let exists = store
        .email_exists(&req.email)
        .await
        .map_err(|e| internal_error("Error checking email availability", e))?;
    if exists {
        return Err(api_error(StatusCode::CONFLICT, "Email already registered"));
    }

    let password_hash =
        hash_password(&req.password).map_err(|e| internal_error("Error processing password", e))?;

    let user = store
        .create(NewUser {
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            role: Role::Member,
            status: UserStatus::Active,
        })
        .await
        .map_err(|e| match e {
            StoreError::DuplicateEmail(_) => {
                api_error(StatusCode::CONFLICT, "Email already registered")
            }
            other => internal_error("Error creating user account", other),
        })?;

    let response = issue_tokens(&state.jwt, &user)?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(response, "Account created successfully")),
    ))
}

/// 로그인
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "로그인 성공", body = ApiResponse<AuthResponse>),
        (status = 400, description = "잘못된 요청", body = ApiErrorResponse),
        (status = 401, description = "인증 실패 또는 비활성 계정", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    let req = json_body(body, INVALID_FORMAT)?;
    req.validate().map_err(validation_error)?;
    let store = require_user_store(&state)?;

    let user = store
        .find_by_email(&req.email)
        .await
        .map_err(|e| internal_error("Error during authentication", e))?
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS))?;

    // 비밀번호가 맞은 경우에만 계정 상태를 알려줍니다
    if verify_password(&req.password, &user.password_hash).is_err() {
        tracing::debug!(user_id = %user.id, "password mismatch");
        return Err(api_error(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS));
    }
    if !user.is_active() {
        return Err(api_error(StatusCode::UNAUTHORIZED, ACCOUNT_INACTIVE));
    }

    let response = issue_tokens(&state.jwt, &user)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(ApiResponse::new(response, "Login successful")))
}

/// 토큰 갱신
///
/// Refresh Token에는 사용자 ID만 있으므로 역할과 상태는 저장소에서 다시 읽습니다.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "갱신 성공", body = ApiResponse<AuthResponse>),
        (status = 400, description = "잘못된 요청", body = ApiErrorResponse),
        (status = 401, description = "유효하지 않은 토큰, 사용자 없음 또는 비활성 계정", body = ApiErrorResponse),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    let req = json_body(body, INVALID_FORMAT)?;
    req.validate().map_err(validation_error)?;
    let store = require_user_store(&state)?;

    let user_id = state
        .jwt
        .validate_refresh_token(&req.refresh_token)
        .map_err(|_| api_error(StatusCode::UNAUTHORIZED, "Invalid refresh token"))?;

    let user = store
        .find_by_id(&user_id)
        .await
        .map_err(|e| internal_error("Error retrieving user", e))?
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "User not found"))?;

    if !user.is_active() {
        return Err(api_error(StatusCode::UNAUTHORIZED, ACCOUNT_INACTIVE));
    }

    let response = issue_tokens(&state.jwt, &user)?;
    tracing::info!(user_id = %user.id, "tokens refreshed");

    Ok(Json(ApiResponse::new(response, "Tokens refreshed successfully")))
}

/// 내 프로필 조회
#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    responses(
        (status = 200, description = "조회 성공", body = ApiResponse<UserProfile>),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 404, description = "사용자 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn profile(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<ApiResponse<UserProfile>>> {
    let store = require_user_store(&state)?;

    let user = store
        .find_by_id(&claims.user_id)
        .await
        .map_err(|e| internal_error("Error retrieving user", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "User not found"))?;

    Ok(Json(ApiResponse::new(
        UserProfile::from(&user),
        "User profile retrieved successfully",
    )))
}

/// 인증 라우터 생성.
pub fn auth_router(jwt: Arc<JwtService>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(profile))
        .route_layer(middleware::from_fn_with_state(jwt, require_auth))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}
