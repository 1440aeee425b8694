//! Axum용 JWT 인증 미들웨어.
//!
//! 요청 처리 순서:
//!
//! 1. [`require_auth`]: `Authorization: Bearer <token>` 헤더에서 토큰을 꺼내 검증하고,
//!    검증된 [`Claims`]를 요청 extension에 저장합니다.
//! 2. [`require_role`] / [`require_admin`]: extension의 Claims 역할을 정확히 비교합니다.
//! 3. 핸들러는 [`AuthUser`] 추출기로 Claims를 읽습니다.
//!
//! 두 미들웨어를 함께 쓸 때는 `require_auth`가 바깥쪽에 오도록
//! 역할 검사 layer를 먼저 추가합니다.
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/", get(handler))
//!     .route_layer(middleware::from_fn(require_admin))
//!     .route_layer(middleware::from_fn_with_state(jwt, require_auth));
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use bookms_core::Role;

use super::{Claims, JwtService};
use crate::error::ApiErrorResponse;

/// 인증/인가 실패.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Bearer 토큰이 없거나 형식이 다름
    #[error("Authorization header is required")]
    MissingToken,
    /// 서명 불일치, 형식 오류, 만료
    #[error("Invalid or expired token")]
    InvalidToken,
    /// 인증 미들웨어를 거치지 않은 요청
    #[error("Authentication required")]
    Unauthenticated,
    /// 역할 불일치
    #[error("Insufficient permissions")]
    InsufficientRole,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), Json(ApiErrorResponse::new(self.to_string()))).into_response()
    }
}

/// `Authorization` 헤더에서 Bearer 토큰을 추출합니다.
///
/// 접두사는 정확히 `"Bearer "`여야 하며 토큰은 비어 있으면 안 됩니다.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// 토큰을 검증하고 Claims를 요청에 첨부하는 미들웨어.
pub async fn require_auth(
    State(jwt): State<Arc<JwtService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_token(request.headers()).ok_or_else(|| {
        tracing::debug!(path = %request.uri().path(), "missing bearer token");
        AuthError::MissingToken
    })?;

    let claims = jwt
        .validate_access_token(token)
        .map_err(|_| AuthError::InvalidToken)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// 지정한 역할을 요구하는 미들웨어.
///
/// `from_fn_with_state(Role::Member, require_role)` 형태로 사용합니다.
pub async fn require_role(
    State(role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    check_role(request.extensions().get::<Claims>(), role)?;
    Ok(next.run(request).await)
}

/// 관리자 역할을 요구하는 미들웨어.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AuthError> {
    check_role(request.extensions().get::<Claims>(), Role::Admin)?;
    Ok(next.run(request).await)
}

fn check_role(claims: Option<&Claims>, required: Role) -> Result<(), AuthError> {
    let claims = claims.ok_or(AuthError::Unauthenticated)?;
    if claims.role != required {
        tracing::debug!(
            user_id = %claims.user_id,
            role = %claims.role,
            required = %required,
            "insufficient role"
        );
        return Err(AuthError::InsufficientRole);
    }
    Ok(())
}

/// 인증된 사용자 추출기.
///
/// [`require_auth`]가 첨부한 Claims를 꺼냅니다.
///
/// ```rust,ignore
/// async fn profile(AuthUser(claims): AuthUser) -> impl IntoResponse {
///     format!("Hello, {}!", claims.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn claims(role: Role) -> Claims {
        Claims {
            user_id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            role,
            sub: "u1".to_string(),
            iat: 0,
            nbf: 0,
            exp: i64::MAX,
        }
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_token(&HeaderMap::new()), None);
        assert_eq!(extract_token(&headers("Bearer ")), None);
        assert_eq!(extract_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_token(&headers("bearer abc")), None);
        assert_eq!(extract_token(&headers("Bearerabc")), None);
    }

    #[test]
    fn test_check_role_exact_match() {
        assert!(check_role(Some(&claims(Role::Admin)), Role::Admin).is_ok());
        assert!(check_role(Some(&claims(Role::Member)), Role::Member).is_ok());
        assert_eq!(
            check_role(Some(&claims(Role::Member)), Role::Admin),
            Err(AuthError::InsufficientRole)
        );
        // 역할 간 계층 없음
        assert_eq!(
            check_role(Some(&claims(Role::Admin)), Role::Member),
            Err(AuthError::InsufficientRole)
        );
        assert_eq!(check_role(None, Role::Admin), Err(AuthError::Unauthenticated));
    }

    #[test]
    fn test_error_status_and_message() {
        assert_eq!(AuthError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InsufficientRole.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::MissingToken.to_string(),
            "Authorization header is required"
        );
    }
}
