//! 사용자 관리 endpoint (관리자 전용).
//!
//! 모든 라우트에 인증과 관리자 역할 검사가 적용됩니다.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use bookms_core::{NewUser, Role, StoreError, User, UserStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{json_body, require_pool, require_user_store};
use crate::auth::{hash_password, require_admin, require_auth, JwtService};
use crate::error::{
    api_error, internal_error, validation_error, ApiErrorResponse, ApiResponse, ApiResult,
};
use crate::repository::{UserChanges, UserFilter, UserRepository};
use crate::state::AppState;
use crate::utils::Page;

const INVALID_FORMAT: &str = "Invalid request format";
const NOT_FOUND: &str = "User not found";

// ==================== Request/Response 타입 ====================

/// 사용자 생성 요청
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub last_name: String,
    pub role: Role,
}

/// 사용자 수정 요청. 지정한 필드만 변경됩니다.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub status: Option<UserStatus>,
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role,
            status: req.status,
        }
    }
}

/// 사용자 목록 쿼리
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct UserListQuery {
    /// 페이지 크기 (기본 20)
    pub limit: Option<String>,
    /// 시작 위치 (기본 0)
    pub offset: Option<String>,
    /// 역할 필터 (admin | member)
    pub role: Option<String>,
    /// 상태 필터 (active | inactive), 역할 필터가 없을 때만 적용
    pub status: Option<String>,
}

impl UserListQuery {
    fn filter(&self) -> ApiResult<UserFilter> {
        let present = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);

        if let Some(role) = present(&self.role) {
            let role = Role::parse(&role)
                .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid role filter"))?;
            return Ok(UserFilter::Role(role));
        }
        if let Some(status) = present(&self.status) {
            let status = UserStatus::parse(&status)
                .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid status filter"))?;
            return Ok(UserFilter::Status(status));
        }
        Ok(UserFilter::All)
    }
}

/// 사용자 상세
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDetail {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

impl From<User> for UserDetail {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            status: user.status,
            created_date: user.created_date,
            updated_date: user.updated_date,
        }
    }
}

/// 사용자 목록 응답
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserDetail>,
    /// 필터에 맞는 전체 사용자 수
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

// ==================== API 핸들러 ====================

/// 사용자 생성
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "생성 성공", body = ApiResponse<UserDetail>),
        (status = 400, description = "잘못된 요청", body = ApiErrorResponse),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 403, description = "권한 없음", body = ApiErrorResponse),
        (status = 409, description = "이메일 중복", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserDetail>>)> {
    let req = json_body(body, INVALID_FORMAT)?;
    req.validate().map_err(validation_error)?;
    let store = require_user_store(&state)?;

    let exists = store
        .email_exists(&req.email)
        .await
        .map_err(|e| internal_error("Error checking email availability", e))?;
    if exists {
        return Err(api_error(StatusCode::CONFLICT, "Email already exists"));
    }

    let password_hash =
        hash_password(&req.password).map_err(|e| internal_error("Error processing password", e))?;

    let user = store
        .create(NewUser {
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role,
            status: UserStatus::Active,
        })
        .await
        .map_err(|e| match e {
            StoreError::DuplicateEmail(_) => api_error(StatusCode::CONFLICT, "Email already exists"),
            other => internal_error("Error creating user", other),
        })?;

    tracing::info!(user_id = %user.id, role = %user.role, "user created by admin");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UserDetail::from(user), "User created successfully")),
    ))
}

/// 사용자 목록 조회
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "조회 성공", body = ApiResponse<UserListResponse>),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 403, description = "권한 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Json<ApiResponse<UserListResponse>>> {
    let page = Page::parse(query.limit.as_deref(), query.offset.as_deref());
    let filter = query.filter()?;
    let pool = require_pool(&state)?;

    let users = UserRepository::list(pool, filter, page.limit, page.offset)
        .await
        .map_err(|e| internal_error("Error retrieving users", e))?;
    let total = UserRepository::count(pool, filter)
        .await
        .map_err(|e| internal_error("Error counting users", e))?;

    Ok(Json(ApiResponse::new(
        UserListResponse {
            users: users.into_iter().map(UserDetail::from).collect(),
            total,
            limit: page.limit,
            offset: page.offset,
        },
        "Users retrieved successfully",
    )))
}

/// 사용자 조회
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "사용자 ID")),
    responses(
        (status = 200, description = "조회 성공", body = ApiResponse<UserDetail>),
        (status = 404, description = "사용자 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<UserDetail>>> {
    let pool = require_pool(&state)?;

    let user = UserRepository::get_by_id(pool, &id)
        .await
        .map_err(|e| internal_error("Error retrieving user", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, NOT_FOUND))?;

    Ok(Json(ApiResponse::new(
        UserDetail::from(user),
        "User retrieved successfully",
    )))
}

/// 사용자 수정
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "사용자 ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "수정 성공", body = ApiResponse<UserDetail>),
        (status = 400, description = "잘못된 요청", body = ApiErrorResponse),
        (status = 404, description = "사용자 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<UserDetail>>> {
    let req = json_body(body, INVALID_FORMAT)?;
    let pool = require_pool(&state)?;

    let mut user = UserRepository::get_by_id(pool, &id)
        .await
        .map_err(|e| internal_error("Error retrieving user", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, NOT_FOUND))?;

    UserChanges::from(req).apply(&mut user);

    let user = UserRepository::update(pool, &user)
        .await
        .map_err(|e| internal_error("Error updating user", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, NOT_FOUND))?;

    Ok(Json(ApiResponse::new(
        UserDetail::from(user),
        "User updated successfully",
    )))
}

/// 사용자 삭제 (소프트 삭제)
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "사용자 ID")),
    responses(
        (status = 200, description = "User deleted successfully"),
        (status = 404, description = "사용자 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let pool = require_pool(&state)?;

    let deleted = UserRepository::soft_delete(pool, &id)
        .await
        .map_err(|e| internal_error("Error deleting user", e))?;
    if !deleted {
        return Err(api_error(StatusCode::NOT_FOUND, NOT_FOUND));
    }

    tracing::info!(user_id = %id, "user deleted");
    Ok(Json(ApiResponse::message("User deleted successfully")))
}

/// 사용자 관리 라우터 생성.
pub fn users_router(jwt: Arc<JwtService>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(jwt, require_auth))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filter_precedence() {
        let query = UserListQuery {
            role: Some("admin".to_string()),
            status: Some("inactive".to_string()),
            ..Default::default()
        };
        assert_eq!(query.filter().unwrap(), UserFilter::Role(Role::Admin));

        let query = UserListQuery {
            role: Some(String::new()),
            status: Some("inactive".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query.filter().unwrap(),
            UserFilter::Status(UserStatus::Inactive)
        );

        assert_eq!(UserListQuery::default().filter().unwrap(), UserFilter::All);
    }

    #[test]
    fn test_list_filter_rejects_unknown_role() {
        let query = UserListQuery {
            role: Some("Admin".to_string()),
            ..Default::default()
        };
        let (status, Json(body)) = query.filter().unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "Invalid role filter");
    }
}
