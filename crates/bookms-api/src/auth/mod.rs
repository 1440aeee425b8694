//! 인증 및 권한 부여.
//!
//! JWT 기반 상태 없는(stateless) Bearer 토큰 인증과 역할 기반 접근 제어를 제공합니다.
//!
//! # 구성 요소
//!
//! - [`JwtService`]: 토큰 발급/검증 (HS256)
//! - [`require_auth`], [`require_role`], [`require_admin`]: Axum 미들웨어
//! - [`AuthUser`]: 인증된 사용자 추출기
//! - 비밀번호 해싱/검증 함수

mod jwt;
mod middleware;
mod password;

pub use jwt::{Claims, JwtError, JwtService, RefreshClaims, TokenPair};
pub use middleware::{
    extract_token, require_admin, require_auth, require_role, AuthError, AuthUser,
};
pub use password::{hash_password, verify_password, PasswordError};
